//! Replay the saved recording with its waveform.
//!
//! A fresh process has no amplitude history, so the envelope is rebuilt from
//! the artifact (peak per tick window) before playback starts.

use crate::commands::session::{
    build_controller, load_config_or_show_error, load_saved_envelope, run_session, SessionMode,
};
use crate::recording::SessionTui;
use crate::session::SessionCommand;

/// Plays the recording once and exits when playback ends or is stopped.
///
/// # Errors
/// - If no recording exists yet
/// - If the recording cannot be read or played
pub async fn handle_play() -> Result<(), anyhow::Error> {
    tracing::info!("=== recwave Play Command ===");

    let config_data = load_config_or_show_error()?;
    let mut controller = build_controller(&config_data)?;

    let artifact = controller.artifact().to_path_buf();
    if !artifact.exists() {
        return Err(anyhow::anyhow!(
            "No recording found at {}. Run 'recwave' and press r to record.",
            artifact.display()
        ));
    }

    let mut tui = SessionTui::new()?;
    let result = (|| -> anyhow::Result<()> {
        let (width, height) = tui.waveform_units()?;
        controller.resize_waveform(width, height);
        load_saved_envelope(&mut controller, config_data.timer.period())?;
        controller.handle(SessionCommand::Play)?;
        run_session(
            &mut controller,
            &mut tui,
            &config_data.audio.device,
            SessionMode::ReplayOnce,
        )
    })();
    tui.cleanup()?;
    result?;

    tracing::info!("Playback finished for {}", artifact.display());
    Ok(())
}
