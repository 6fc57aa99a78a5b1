//! cpal-backed audio handles for the session controller.

use std::path::Path;

use super::audio::CpalCapture;
use super::playback::CpalPlayback;
use crate::session::AudioBackend;

/// Opens capture on the configured input device and playback on the default
/// output device.
pub struct CpalBackend {
    device: String,
    sample_rate: u32,
}

impl CpalBackend {
    pub fn new(device: String, sample_rate: u32) -> Self {
        Self {
            device,
            sample_rate,
        }
    }
}

impl AudioBackend for CpalBackend {
    type Capture = CpalCapture;
    type Playback = CpalPlayback;

    fn prepare_capture(&mut self, artifact: &Path) -> anyhow::Result<CpalCapture> {
        CpalCapture::prepare(&self.device, self.sample_rate, artifact)
    }

    fn prepare_playback(&mut self, artifact: &Path) -> anyhow::Result<CpalPlayback> {
        CpalPlayback::prepare(artifact)
    }
}
