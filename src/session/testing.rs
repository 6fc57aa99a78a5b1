//! Fake audio handles for controller and session tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use super::controller::{AudioBackend, CaptureHandle, Controller, PlaybackHandle};
use super::timer::TickTimer;
use crate::recording::visualizations::{BarStyle, WaveformView};

/// Shared record of what the fake handles saw.
#[derive(Default)]
pub(crate) struct Log {
    pub events: Vec<&'static str>,
    pub amplitudes: VecDeque<f32>,
    pub fail_capture_prepare: bool,
    pub fail_capture_start: bool,
    pub fail_playback_prepare: bool,
    pub playback_finished: bool,
    /// How long each prepare call blocks, like opening a real device
    pub prepare_delay: Duration,
}

pub(crate) type SharedLog = Rc<RefCell<Log>>;

pub(crate) struct FakeCapture(SharedLog);

impl CaptureHandle for FakeCapture {
    fn start(&mut self) -> anyhow::Result<()> {
        let mut log = self.0.borrow_mut();
        log.events.push("capture.start");
        if log.fail_capture_start {
            anyhow::bail!("device busy");
        }
        Ok(())
    }

    fn max_amplitude(&mut self) -> f32 {
        self.0.borrow_mut().amplitudes.pop_front().unwrap_or(0.0)
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        self.0.borrow_mut().events.push("capture.stop");
        Ok(())
    }
}

pub(crate) struct FakePlayback(SharedLog);

impl PlaybackHandle for FakePlayback {
    fn start(&mut self) -> anyhow::Result<()> {
        self.0.borrow_mut().events.push("playback.start");
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.0.borrow().playback_finished
    }

    fn stop(&mut self) {
        self.0.borrow_mut().events.push("playback.stop");
    }
}

pub(crate) struct FakeBackend(SharedLog);

impl FakeBackend {
    fn delay(&self) {
        let delay = self.0.borrow().prepare_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

impl AudioBackend for FakeBackend {
    type Capture = FakeCapture;
    type Playback = FakePlayback;

    fn prepare_capture(&mut self, _artifact: &Path) -> anyhow::Result<FakeCapture> {
        self.delay();
        self.0.borrow_mut().events.push("capture.prepare");
        if self.0.borrow().fail_capture_prepare {
            anyhow::bail!("no microphone");
        }
        Ok(FakeCapture(self.0.clone()))
    }

    fn prepare_playback(&mut self, _artifact: &Path) -> anyhow::Result<FakePlayback> {
        self.delay();
        self.0.borrow_mut().events.push("playback.prepare");
        if self.0.borrow().fail_playback_prepare {
            anyhow::bail!("missing file");
        }
        Ok(FakePlayback(self.0.clone()))
    }
}

/// Controller over a 300x200 view with default timing and the fake backend.
pub(crate) fn fake_controller() -> (Controller<FakeBackend>, SharedLog) {
    fake_controller_with_artifact(PathBuf::from("/tmp/recwave-test/recording.wav"))
}

pub(crate) fn fake_controller_with_artifact(
    artifact: PathBuf,
) -> (Controller<FakeBackend>, SharedLog) {
    let log = SharedLog::default();
    let controller = Controller::new(
        FakeBackend(log.clone()),
        artifact,
        TickTimer::default(),
        WaveformView::new(300.0, 200.0, BarStyle::default()),
    );
    (controller, log)
}
