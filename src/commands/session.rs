//! Interactive record/play session.
//!
//! Runs the session screen: the record, play and stop keys drive the
//! controller, timer ticks sample or replay the waveform, and SIGUSR1 toggles
//! recording from outside the terminal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{self, RecwaveConfig};
use crate::recording::ui::SessionFrame;
use crate::recording::visualizations::WaveformView;
use crate::recording::{
    check_microphone_access, CpalBackend, MicrophoneAccess, MonoClip, SessionInput, SessionTui,
};
use crate::session::{AudioBackend, Controller, Controls, SessionCommand, SessionState, TickTimer};
use crate::ui::ErrorScreen;

/// Longest wait for input when no tick is due.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// How the session loop ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionMode {
    /// Run until the user quits
    Interactive,
    /// Replay only; quit as soon as playback returns to idle
    ReplayOnce,
}

/// What a key press asks the session loop to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionAction {
    Quit,
    Command(SessionCommand),
    Ignore,
}

/// Runs the interactive record/play session.
pub async fn handle_session() -> Result<(), anyhow::Error> {
    tracing::info!("=== recwave Session Started ===");

    let config_data = load_config_or_show_error()?;
    let mut controller = build_controller(&config_data)?;

    let mut tui = SessionTui::new()?;
    let result = (|| -> anyhow::Result<()> {
        let (width, height) = tui.waveform_units()?;
        controller.resize_waveform(width, height);
        // A recording left by an earlier run gets its bars back for replay
        if let Err(e) = load_saved_envelope(&mut controller, config_data.timer.period()) {
            tracing::warn!("Could not read saved recording: {e}");
        }
        run_session(
            &mut controller,
            &mut tui,
            &config_data.audio.device,
            SessionMode::Interactive,
        )
    })();
    tui.cleanup()?;
    result?;

    tracing::info!("=== recwave Session Exited Successfully ===");
    Ok(())
}

/// Loads the configuration, showing an error screen when it is invalid.
pub(crate) fn load_config_or_show_error() -> anyhow::Result<RecwaveConfig> {
    match RecwaveConfig::load() {
        Ok(config) => {
            tracing::info!(
                "Configuration loaded: device={}, sample_rate={}Hz, tick={}ms",
                config.audio.device,
                config.audio.sample_rate,
                config.timer.period_ms
            );
            Ok(config)
        }
        Err(err) => {
            tracing::error!("Failed to load configuration: {err}");
            let error_message = format!(
                "Configuration Error:\n\n{err}\n\nPlease check your ~/.config/recwave/recwave.toml file and try again."
            );
            let mut error_screen = ErrorScreen::new()?;
            error_screen.show_error(&error_message)?;
            error_screen.cleanup()?;
            Err(anyhow::anyhow!("Configuration error: {err}"))
        }
    }
}

pub(crate) fn build_controller(config_data: &RecwaveConfig) -> anyhow::Result<Controller<CpalBackend>> {
    let backend = CpalBackend::new(
        config_data.audio.device.clone(),
        config_data.audio.sample_rate,
    );
    let timer = TickTimer::new(
        config_data.timer.period(),
        config_data.timer.initial_delay(),
    );
    let waveform = WaveformView::new(0.0, 0.0, config_data.waveform.bar_style());
    Ok(Controller::new(
        backend,
        config::recording_path()?,
        timer,
        waveform,
    ))
}

/// Rebuilds the waveform history from the saved artifact, one peak per tick.
///
/// Does nothing and returns `false` when there is no artifact or the history
/// already holds a recording. The waveform must already have its final size.
///
/// # Errors
/// - If the artifact exists but cannot be read
pub(crate) fn load_saved_envelope<B: AudioBackend>(
    controller: &mut Controller<B>,
    period: Duration,
) -> anyhow::Result<bool> {
    let artifact = controller.artifact().to_path_buf();
    if !artifact.exists() || !controller.waveform().history().is_empty() {
        return Ok(false);
    }

    let clip = MonoClip::open(&artifact)?;
    let envelope = clip.peak_envelope(period);
    tracing::info!(
        "Loaded {} ({:.2}s, {} bars)",
        artifact.display(),
        clip.duration().as_secs_f32(),
        envelope.len()
    );
    controller.load_envelope(&envelope);
    Ok(true)
}

/// Drives the controller from input, ticks and SIGUSR1 until the session ends.
pub(crate) fn run_session<B: AudioBackend>(
    controller: &mut Controller<B>,
    tui: &mut SessionTui,
    device: &str,
    mode: SessionMode,
) -> anyhow::Result<()> {
    let external_trigger = Arc::new(AtomicBool::new(false));
    if mode == SessionMode::Interactive {
        signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&external_trigger))
            .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;
    }

    tracing::debug!("Entering {:?} session loop", mode);
    let mut status: Option<String> = None;
    let mut waveform_units = (0.0, 0.0);
    let mut last_frame: Option<FrameKey> = None;
    let check_access = || check_microphone_access(device);

    loop {
        let units = tui.waveform_units()?;
        if units != waveform_units {
            controller.resize_waveform(units.0, units.1);
            waveform_units = units;
            last_frame = None;
        }

        if external_trigger.swap(false, Ordering::Relaxed) {
            let command = trigger_command(controller.state());
            tracing::info!("Received SIGUSR1: sending {:?}", command);
            dispatch(controller, command, check_access, &mut status);
        }

        let now = Instant::now();
        let timeout = controller
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or(IDLE_POLL)
            .min(IDLE_POLL);

        let has_recording = controller.artifact().exists();
        let controls = controller.state().controls(has_recording);
        let input = tui.handle_input(timeout)?;
        match action_for_input(input, controls, mode) {
            SessionAction::Quit => break,
            SessionAction::Command(command) => {
                dispatch(controller, command, check_access, &mut status)
            }
            SessionAction::Ignore if input != SessionInput::None => {
                tracing::debug!("{:?} ignored in state {}", input, controller.state())
            }
            SessionAction::Ignore => {}
        }

        let state = match controller.poll(Instant::now()) {
            Ok(state) => state,
            Err(e) => {
                status = Some(e.to_string());
                controller.state()
            }
        };
        if session_over(mode, state) {
            break;
        }

        let frame_key = FrameKey {
            generation: controller.waveform().generation(),
            state,
            elapsed: controller.elapsed_label().to_string(),
            status: status.clone(),
            has_recording: controller.artifact().exists(),
        };
        if last_frame.as_ref() == Some(&frame_key) {
            continue;
        }

        let bars = controller.waveform().bars();
        tui.render(&SessionFrame {
            state: frame_key.state,
            controls: frame_key.state.controls(frame_key.has_recording),
            elapsed: controller.elapsed_label(),
            bars: &bars,
            status: status.as_deref(),
        })?;
        last_frame = Some(frame_key);
    }

    controller.shutdown()?;
    Ok(())
}

/// What the last drawn frame showed; nothing is redrawn while it is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FrameKey {
    generation: u64,
    state: SessionState,
    elapsed: String,
    status: Option<String>,
    has_recording: bool,
}

/// Maps a key press to an action. Disabled buttons do nothing, and a replay
/// session never records.
pub(crate) fn action_for_input(
    input: SessionInput,
    controls: Controls,
    mode: SessionMode,
) -> SessionAction {
    match input {
        SessionInput::Quit => SessionAction::Quit,
        SessionInput::Record if controls.record && mode == SessionMode::Interactive => {
            SessionAction::Command(SessionCommand::Record)
        }
        SessionInput::Play if controls.play => SessionAction::Command(SessionCommand::Play),
        SessionInput::Stop if controls.stop => SessionAction::Command(SessionCommand::Stop),
        _ => SessionAction::Ignore,
    }
}

/// SIGUSR1 stops a running recording and otherwise asks to start one.
pub(crate) fn trigger_command(state: SessionState) -> SessionCommand {
    match state {
        SessionState::Recording => SessionCommand::Stop,
        SessionState::Idle | SessionState::Playing => SessionCommand::Record,
    }
}

/// Whether the loop should end after this iteration.
pub(crate) fn session_over(mode: SessionMode, state: SessionState) -> bool {
    mode == SessionMode::ReplayOnce && state == SessionState::Idle
}

/// Sends one command to the controller, gating a new recording on
/// microphone access. Errors and denials end up in `status`.
pub(crate) fn dispatch<B: AudioBackend>(
    controller: &mut Controller<B>,
    command: SessionCommand,
    check_access: impl FnOnce() -> MicrophoneAccess,
    status: &mut Option<String>,
) {
    if command == SessionCommand::Record && controller.state() == SessionState::Idle {
        let access = check_access();
        if !access.is_granted() {
            let message = access.message().unwrap_or("Microphone unavailable");
            tracing::warn!("Recording blocked: {}", message);
            *status = Some(message.to_string());
            return;
        }
    }

    match controller.handle(command) {
        Ok(state) => {
            *status = None;
            tracing::debug!("Session state: {}", state);
        }
        Err(e) => {
            tracing::error!("{:?} failed: {}", command, e);
            *status = Some(e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::{fake_controller, fake_controller_with_artifact};

    fn all_enabled() -> Controls {
        Controls {
            record: true,
            play: true,
            stop: true,
        }
    }

    #[test]
    fn test_disabled_buttons_are_ignored() {
        let idle = SessionState::Idle.controls(false);
        let mode = SessionMode::Interactive;
        assert_eq!(
            action_for_input(SessionInput::Record, idle, mode),
            SessionAction::Command(SessionCommand::Record)
        );
        assert_eq!(action_for_input(SessionInput::Play, idle, mode), SessionAction::Ignore);
        assert_eq!(action_for_input(SessionInput::Stop, idle, mode), SessionAction::Ignore);
        assert_eq!(action_for_input(SessionInput::None, idle, mode), SessionAction::Ignore);
        assert_eq!(action_for_input(SessionInput::Quit, idle, mode), SessionAction::Quit);

        let playing = SessionState::Playing.controls(true);
        assert_eq!(action_for_input(SessionInput::Record, playing, mode), SessionAction::Ignore);
        assert_eq!(
            action_for_input(SessionInput::Stop, playing, mode),
            SessionAction::Command(SessionCommand::Stop)
        );
    }

    #[test]
    fn test_replay_session_never_records() {
        let mode = SessionMode::ReplayOnce;
        assert_eq!(
            action_for_input(SessionInput::Record, all_enabled(), mode),
            SessionAction::Ignore
        );
        assert_eq!(
            action_for_input(SessionInput::Play, all_enabled(), mode),
            SessionAction::Command(SessionCommand::Play)
        );
    }

    #[test]
    fn test_trigger_toggles_recording() {
        assert_eq!(trigger_command(SessionState::Idle), SessionCommand::Record);
        assert_eq!(trigger_command(SessionState::Recording), SessionCommand::Stop);
        // Record is ignored while playing
        assert_eq!(trigger_command(SessionState::Playing), SessionCommand::Record);
    }

    #[test]
    fn test_replay_session_ends_when_stopped_by_key() {
        let (mut ctl, _log) = fake_controller();
        let mut status = None;
        dispatch(&mut ctl, SessionCommand::Play, || MicrophoneAccess::Granted, &mut status);
        assert!(!session_over(SessionMode::ReplayOnce, ctl.state()));

        let action = action_for_input(
            SessionInput::Stop,
            ctl.state().controls(true),
            SessionMode::ReplayOnce,
        );
        let SessionAction::Command(command) = action else {
            panic!("stop should be enabled while playing, got {action:?}");
        };
        dispatch(&mut ctl, command, || MicrophoneAccess::Granted, &mut status);

        let state = ctl.poll(Instant::now()).unwrap();
        assert!(session_over(SessionMode::ReplayOnce, state));
        assert!(!session_over(SessionMode::Interactive, state));
    }

    #[test]
    fn test_denied_microphone_keeps_idle() {
        let (mut ctl, log) = fake_controller();
        let mut status = None;
        let denied = || MicrophoneAccess::Rationale("Recording needs a microphone.".to_string());

        dispatch(&mut ctl, SessionCommand::Record, denied, &mut status);

        assert_eq!(ctl.state(), SessionState::Idle);
        assert_eq!(status.as_deref(), Some("Recording needs a microphone."));
        assert!(log.borrow().events.is_empty());
    }

    #[test]
    fn test_granted_microphone_starts_recording() {
        let (mut ctl, _log) = fake_controller();
        let mut status = Some("old message".to_string());

        dispatch(&mut ctl, SessionCommand::Record, || MicrophoneAccess::Granted, &mut status);

        assert_eq!(ctl.state(), SessionState::Recording);
        assert_eq!(status, None);
    }

    #[test]
    fn test_stopping_a_recording_skips_the_access_check() {
        let (mut ctl, _log) = fake_controller();
        let mut status = None;
        dispatch(&mut ctl, SessionCommand::Record, || MicrophoneAccess::Granted, &mut status);

        let checked = std::cell::Cell::new(false);
        let check = || {
            checked.set(true);
            MicrophoneAccess::Settings("unplugged".to_string())
        };
        dispatch(&mut ctl, SessionCommand::Record, check, &mut status);

        assert!(!checked.get());
        assert_eq!(ctl.state(), SessionState::Idle);
    }

    #[test]
    fn test_failed_start_is_reported() {
        let (mut ctl, log) = fake_controller();
        log.borrow_mut().fail_capture_prepare = true;
        let mut status = None;

        dispatch(&mut ctl, SessionCommand::Record, || MicrophoneAccess::Granted, &mut status);

        assert_eq!(ctl.state(), SessionState::Idle);
        assert!(status.unwrap().contains("no microphone"));
    }

    fn write_wav(path: &std::path::Path, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 1000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_saved_recording_is_loaded_for_replay() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("recording.wav");
        // 180 samples at 1kHz is three 60ms ticks
        write_wav(&artifact, &[1000; 180]);
        let (mut ctl, _log) = fake_controller_with_artifact(artifact);

        assert!(load_saved_envelope(&mut ctl, Duration::from_millis(60)).unwrap());
        assert_eq!(ctl.waveform().history().len(), 3);
        assert!(ctl.waveform().bars().is_empty());

        // an existing history is left alone
        assert!(!load_saved_envelope(&mut ctl, Duration::from_millis(60)).unwrap());
        assert_eq!(ctl.waveform().history().len(), 3);
    }

    #[test]
    fn test_missing_recording_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ctl, _log) = fake_controller_with_artifact(dir.path().join("recording.wav"));

        assert!(!load_saved_envelope(&mut ctl, Duration::from_millis(60)).unwrap());
        assert!(ctl.waveform().history().is_empty());
    }
}
