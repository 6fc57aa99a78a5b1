//! Playback of the recording artifact on the default output device.

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use hound::{SampleFormat, WavReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::audio::suppress_alsa_warnings;
use crate::session::PlaybackHandle;

/// Mono audio loaded from a WAV file.
#[derive(Debug, Clone, PartialEq)]
pub struct MonoClip {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl MonoClip {
    /// Reads a WAV file, mixing all channels down to mono i16.
    ///
    /// # Errors
    /// - If the file cannot be opened or is not a WAV file
    /// - If the sample format is not 16-bit integer or 32-bit float
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = WavReader::open(path)
            .map_err(|e| anyhow!("Failed to open {}: {e}", path.display()))?;
        let spec = reader.spec();

        let interleaved: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 16) => reader.samples::<i16>().collect::<Result<_, _>>()?,
            (SampleFormat::Float, 32) => reader
                .samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect::<Result<_, _>>()?,
            (format, bits) => {
                return Err(anyhow!(
                    "Unsupported WAV format: {bits}-bit {format:?} in {}",
                    path.display()
                ))
            }
        };

        let channels = spec.channels.max(1) as usize;
        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks_exact(channels)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                    (sum / channels as i32) as i16
                })
                .collect()
        };

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Peak magnitude of each `period`-long window, in the same units the
    /// capture reports as max amplitude. One value per tick.
    pub fn peak_envelope(&self, period: Duration) -> Vec<f32> {
        let window = (self.sample_rate as u128 * period.as_millis() / 1000).max(1) as usize;
        self.samples
            .chunks(window)
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|s| s.unsigned_abs())
                    .max()
                    .unwrap_or(0) as f32
            })
            .collect()
    }
}

/// Plays one clip to the default output device.
pub struct CpalPlayback {
    stream: Option<cpal::Stream>,
    finished: Arc<AtomicBool>,
}

impl CpalPlayback {
    /// Loads the artifact and builds a paused output stream for it.
    ///
    /// # Errors
    /// - If the artifact cannot be read
    /// - If no output device is available
    /// - If the output stream cannot be built
    pub fn prepare(artifact: &Path) -> Result<Self> {
        let clip = MonoClip::open(artifact)?;
        tracing::debug!(
            "Loaded {} ({:.2}s at {}Hz)",
            artifact.display(),
            clip.duration().as_secs_f32(),
            clip.sample_rate
        );

        let device = suppress_alsa_warnings(|| {
            cpal::default_host()
                .default_output_device()
                .ok_or_else(|| anyhow!("No audio output device available"))
        })?;
        tracing::info!(
            "Playback device: {}",
            device.name().unwrap_or_else(|_| "Unknown device".to_string())
        );

        let device_config = device.default_output_config()?;
        let stream_config: cpal::StreamConfig = device_config.config();
        let finished = Arc::new(AtomicBool::new(clip.samples.is_empty()));

        let stream = match device_config.sample_format() {
            cpal::SampleFormat::F32 => build_output::<f32>(&device, &stream_config, clip, &finished)?,
            cpal::SampleFormat::I16 => build_output::<i16>(&device, &stream_config, clip, &finished)?,
            cpal::SampleFormat::U16 => build_output::<u16>(&device, &stream_config, clip, &finished)?,
            other => return Err(anyhow!("Unsupported output sample format: {other:?}")),
        };

        Ok(Self {
            stream: Some(stream),
            finished,
        })
    }
}

impl PlaybackHandle for CpalPlayback {
    fn start(&mut self) -> Result<()> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| anyhow!("Playback already stopped"))?;
        stream.play()?;
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }

    fn stop(&mut self) {
        self.stream = None;
    }
}

/// Builds an output stream that plays `clip` once, resampling by nearest
/// sample to the device rate and copying it to every channel.
fn build_output<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    clip: MonoClip,
    finished: &Arc<AtomicBool>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;
    let step = clip.sample_rate as f64 / config.sample_rate.0 as f64;
    let finished = Arc::clone(finished);
    let mut position = 0.0f64;

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(channels) {
                let value = match clip.samples.get(position as usize) {
                    Some(&s) => {
                        position += step;
                        s as f32 / i16::MAX as f32
                    }
                    None => {
                        finished.store(true, Ordering::Relaxed);
                        0.0
                    }
                };
                frame.fill(T::from_sample(value));
            }
        },
        |err| {
            tracing::error!("Audio output stream error: {}", err);
        },
        None,
    )?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
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
    fn test_open_mixes_stereo_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 2, 8000, &[100, 300, -400, -600]);

        let clip = MonoClip::open(&path).unwrap();
        assert_eq!(clip.samples, vec![200, -500]);
        assert_eq!(clip.sample_rate, 8000);
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(MonoClip::open(&dir.path().join("nope.wav")).is_err());
    }

    #[test]
    fn test_peak_envelope_one_value_per_tick() {
        // 60ms at 1kHz is 60 samples per window
        let mut samples = vec![0i16; 150];
        samples[10] = -16000;
        samples[70] = 200;
        samples[149] = 5;
        let clip = MonoClip {
            samples,
            sample_rate: 1000,
        };

        let envelope = clip.peak_envelope(Duration::from_millis(60));
        assert_eq!(envelope, vec![16000.0, 200.0, 5.0]);
    }

    #[test]
    fn test_duration() {
        let clip = MonoClip {
            samples: vec![0; 24000],
            sample_rate: 16000,
        };
        assert_eq!(clip.duration(), Duration::from_millis(1500));

        let empty = MonoClip {
            samples: vec![],
            sample_rate: 0,
        };
        assert_eq!(empty.duration(), Duration::ZERO);
        assert!(empty.peak_envelope(Duration::from_millis(60)).is_empty());
    }
}
