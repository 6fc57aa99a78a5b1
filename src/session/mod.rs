//! Record/play session core: tick timer and state machine.

pub mod controller;
pub mod timer;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{
    AudioBackend, CaptureHandle, Controller, Controls, PlaybackHandle, SessionCommand,
    SessionState,
};
pub use timer::TickTimer;
