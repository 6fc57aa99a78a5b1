//! Record/play state machine.
//!
//! The controller owns the tick timer, the waveform view and whichever audio
//! handle the current state needs. Handles live inside the state value, so a
//! capture handle exists only while recording and a playback handle only while
//! playing; leaving a state always releases its handle.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;

use super::timer::{format_elapsed, TickListener, TickTimer};
use crate::recording::visualizations::WaveformView;

/// Platform audio capture, active for one recording session.
pub trait CaptureHandle {
    /// Begins writing captured audio.
    fn start(&mut self) -> anyhow::Result<()>;
    /// Largest absolute sample value seen since the previous call, 0 if none.
    fn max_amplitude(&mut self) -> f32;
    /// Stops capturing and finalizes the recorded artifact.
    fn stop(&mut self) -> anyhow::Result<()>;
}

/// Platform audio playback, active for one playback session.
pub trait PlaybackHandle {
    fn start(&mut self) -> anyhow::Result<()>;
    /// Whether playback reached the end of the artifact on its own.
    fn is_finished(&self) -> bool;
    fn stop(&mut self);
}

/// Creates capture and playback handles bound to an artifact path.
pub trait AudioBackend {
    type Capture: CaptureHandle;
    type Playback: PlaybackHandle;

    fn prepare_capture(&mut self, artifact: &Path) -> anyhow::Result<Self::Capture>;
    fn prepare_playback(&mut self, artifact: &Path) -> anyhow::Result<Self::Playback>;
}

/// Observable controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Playing,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Recording => write!(f, "recording"),
            Self::Playing => write!(f, "playing"),
        }
    }
}

/// Inputs that can move the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Record button: start recording, or stop it when already recording
    Record,
    /// Play button: start playback, or stop it when already playing
    Play,
    /// Stop button
    Stop,
    /// Playback reached the end of the artifact
    PlaybackFinished,
}

/// Effect of a command in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    StartRecording,
    StopRecording,
    StartPlaying,
    StopPlaying,
    Ignore,
}

impl SessionState {
    /// Transition table. Idle is the only state with entry transitions.
    pub fn transition(self, command: SessionCommand) -> Transition {
        use SessionCommand as C;
        use SessionState as S;

        match (self, command) {
            (S::Idle, C::Record) => Transition::StartRecording,
            (S::Idle, C::Play) => Transition::StartPlaying,
            (S::Idle, C::Stop | C::PlaybackFinished) => Transition::Ignore,

            (S::Recording, C::Record | C::Stop) => Transition::StopRecording,
            (S::Recording, C::Play | C::PlaybackFinished) => Transition::Ignore,

            (S::Playing, C::Play | C::Stop | C::PlaybackFinished) => Transition::StopPlaying,
            (S::Playing, C::Record) => Transition::Ignore,
        }
    }

    /// Which buttons accept input in this state.
    pub fn controls(self, has_recording: bool) -> Controls {
        match self {
            Self::Idle => Controls {
                record: true,
                play: has_recording,
                stop: false,
            },
            Self::Recording => Controls {
                record: true,
                play: false,
                stop: true,
            },
            Self::Playing => Controls {
                record: false,
                play: true,
                stop: true,
            },
        }
    }
}

/// Enabled flags for the button row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub record: bool,
    pub play: bool,
    pub stop: bool,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to prepare audio capture: {0}")]
    CapturePrepare(anyhow::Error),
    #[error("failed to start audio capture: {0}")]
    CaptureStart(anyhow::Error),
    #[error("failed to finalize recording: {0}")]
    CaptureStop(anyhow::Error),
    #[error("failed to prepare playback: {0}")]
    PlaybackPrepare(anyhow::Error),
    #[error("failed to start playback: {0}")]
    PlaybackStart(anyhow::Error),
}

enum Active<C, P> {
    Idle,
    Recording(C),
    Playing(P),
}

/// Drives recording and playback from button commands and timer ticks.
pub struct Controller<B: AudioBackend> {
    backend: B,
    artifact: PathBuf,
    active: Active<B::Capture, B::Playback>,
    timer: TickTimer,
    waveform: WaveformView,
    elapsed_label: String,
}

impl<B: AudioBackend> Controller<B> {
    pub fn new(backend: B, artifact: PathBuf, timer: TickTimer, waveform: WaveformView) -> Self {
        Self {
            backend,
            artifact,
            active: Active::Idle,
            timer,
            waveform,
            elapsed_label: format_elapsed(Duration::ZERO),
        }
    }

    pub fn state(&self) -> SessionState {
        match self.active {
            Active::Idle => SessionState::Idle,
            Active::Recording(_) => SessionState::Recording,
            Active::Playing(_) => SessionState::Playing,
        }
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    pub fn waveform(&self) -> &WaveformView {
        &self.waveform
    }

    /// Size changes go through the controller so the view stays owned here.
    pub fn resize_waveform(&mut self, width: f32, height: f32) {
        self.waveform.resize(width, height);
    }

    /// Feeds a prerecorded envelope into the waveform history so the next
    /// playback can replay it.
    pub fn load_envelope(&mut self, peaks: &[f32]) {
        self.waveform.clear_data();
        for &peak in peaks {
            self.waveform.add_amplitude(peak);
        }
        self.waveform.clear_wave();
    }

    /// Time label shown next to the buttons (`MM:SS.cc`).
    pub fn elapsed_label(&self) -> &str {
        &self.elapsed_label
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.next_deadline()
    }

    /// Applies a command. On error the controller is left in `Idle`.
    ///
    /// The timer of a new recording or playback starts once its handle is
    /// running, so device setup time never produces catch-up ticks.
    pub fn handle(&mut self, command: SessionCommand) -> Result<SessionState, SessionError> {
        let from = self.state();
        let transition = from.transition(command);
        tracing::debug!("{:?} in state {} -> {:?}", command, from, transition);

        match transition {
            Transition::StartRecording => self.start_recording()?,
            Transition::StopRecording => self.stop_recording()?,
            Transition::StartPlaying => self.start_playing()?,
            Transition::StopPlaying => self.stop_playing(),
            Transition::Ignore => {}
        }

        Ok(self.state())
    }

    /// Delivers due ticks and notices natural end of playback.
    pub fn poll(&mut self, now: Instant) -> Result<SessionState, SessionError> {
        // The timer is moved out so the controller can be its own listener
        let mut timer = std::mem::take(&mut self.timer);
        timer.poll(now, self);
        self.timer = timer;

        let finished = matches!(&self.active, Active::Playing(player) if player.is_finished());
        if finished {
            tracing::info!("Playback finished");
            return self.handle(SessionCommand::PlaybackFinished);
        }

        Ok(self.state())
    }

    /// Stops whatever is active. Used when the session exits.
    pub fn shutdown(&mut self) -> Result<(), SessionError> {
        match self.state() {
            SessionState::Recording => self.stop_recording(),
            SessionState::Playing => {
                self.stop_playing();
                Ok(())
            }
            SessionState::Idle => Ok(()),
        }
    }

    fn start_recording(&mut self) -> Result<(), SessionError> {
        let mut capture = self
            .backend
            .prepare_capture(&self.artifact)
            .map_err(|e| {
                tracing::error!("Capture prepare failed: {e:#}");
                SessionError::CapturePrepare(e)
            })?;

        if let Err(e) = capture.start() {
            tracing::error!("Capture start failed: {e:#}");
            // release whatever was acquired before failing
            let _ = capture.stop();
            return Err(SessionError::CaptureStart(e));
        }

        self.waveform.clear_data();
        self.timer.start(Instant::now());
        self.elapsed_label = format_elapsed(Duration::ZERO);
        self.active = Active::Recording(capture);
        tracing::info!("Recording started: {}", self.artifact.display());
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<(), SessionError> {
        let recorded = self.timer.elapsed();
        self.timer.stop();
        let previous = std::mem::replace(&mut self.active, Active::Idle);
        if let Active::Recording(mut capture) = previous {
            capture.stop().map_err(|e| {
                tracing::error!("Capture stop failed: {e:#}");
                SessionError::CaptureStop(e)
            })?;
            tracing::info!(
                "Recording stopped at {} after {} ticks",
                format_elapsed(recorded),
                self.waveform.history().len()
            );
        }
        Ok(())
    }

    fn start_playing(&mut self) -> Result<(), SessionError> {
        let mut player = self
            .backend
            .prepare_playback(&self.artifact)
            .map_err(|e| {
                tracing::error!("Playback prepare failed: {e:#}");
                SessionError::PlaybackPrepare(e)
            })?;

        if let Err(e) = player.start() {
            tracing::error!("Playback start failed: {e:#}");
            player.stop();
            return Err(SessionError::PlaybackStart(e));
        }

        self.waveform.clear_wave();
        self.timer.start(Instant::now());
        self.elapsed_label = format_elapsed(Duration::ZERO);
        self.active = Active::Playing(player);
        tracing::info!("Playback started: {}", self.artifact.display());
        Ok(())
    }

    fn stop_playing(&mut self) {
        self.timer.stop();
        let previous = std::mem::replace(&mut self.active, Active::Idle);
        if let Active::Playing(mut player) = previous {
            player.stop();
            tracing::debug!("Playback stopped at bar {}", self.waveform.cursor());
        }
    }
}

impl<B: AudioBackend> TickListener for Controller<B> {
    fn on_tick(&mut self, elapsed: Duration) {
        self.elapsed_label = format_elapsed(elapsed);

        match &mut self.active {
            Active::Recording(capture) => {
                let amplitude = capture.max_amplitude();
                self.waveform.add_amplitude(amplitude);
            }
            Active::Playing(_) => {
                self.waveform.replay_amplitude(elapsed);
            }
            Active::Idle => {}
        }
    }
}
