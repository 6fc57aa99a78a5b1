//! Audio recording feature for recwave.
//!
//! Provides microphone capture, artifact playback, the microphone access check
//! and the waveform visualization used by the session screen.

pub mod audio;
pub mod backend;
pub mod permission;
pub mod playback;
pub mod ui;
pub mod visualizations;

pub use backend::CpalBackend;
pub use permission::{check_microphone_access, MicrophoneAccess};
pub use playback::MonoClip;
pub use ui::{SessionInput, SessionTui};
