//! Application command handlers for recwave.
//!
//! # Commands
//! - `session`: Interactive record/play screen with live waveform (default)
//! - `play`: Replay the saved recording with its waveform
//! - `config`: Open configuration file in user's preferred editor
//! - `list_devices`: List available audio input devices
//! - `logs`: Display recent log entries

pub mod config;
pub mod list_devices;
pub mod logs;
pub mod play;
pub mod session;

pub use config::handle_config;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use play::handle_play;
pub use session::handle_session;
