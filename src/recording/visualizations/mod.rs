//! Waveform visualization for recording and replay.
//!
//! `waveform` owns the amplitude history and bar layout; `widget` draws the
//! resulting bars into a terminal buffer.

pub mod waveform;
pub mod widget;

pub use waveform::{Bar, BarStyle, WaveformView};
pub use widget::{units_for_area, WaveformWidget};
