//! Microphone capture into the recording artifact.
//!
//! Audio is captured from the configured input device at its native rate,
//! mixed down to mono and kept in memory. The capture tracks the peak sample
//! since the last amplitude reading; on stop the samples are written to the
//! artifact as 16-bit PCM WAV.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use hound::WavWriter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::session::CaptureHandle;

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Samples shared between the audio callback and the UI thread.
#[derive(Debug, Default)]
struct CaptureBuffer {
    /// Recorded audio samples (i16 PCM mono)
    samples: Vec<i16>,
    /// Largest magnitude since the last `max_amplitude` call
    peak: u16,
}

impl CaptureBuffer {
    /// Mixes interleaved frames down to mono and appends them.
    fn push_frames(&mut self, data: &[i16], num_channels: usize) {
        let start = self.samples.len();
        match num_channels {
            0 | 1 => self.samples.extend_from_slice(data),
            n => {
                for chunk in data.chunks_exact(n) {
                    let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                    self.samples.push((sum / n as i32) as i16);
                }
            }
        }

        let peak = self.samples[start..]
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0);
        self.peak = self.peak.max(peak);
    }

    fn take_peak(&mut self) -> u16 {
        std::mem::take(&mut self.peak)
    }
}

fn lock(buffer: &Mutex<CaptureBuffer>) -> MutexGuard<'_, CaptureBuffer> {
    buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Records one session from an input device into a WAV file.
pub struct CpalCapture {
    /// Actual recording sample rate from device
    sample_rate: u32,
    buffer: Arc<Mutex<CaptureBuffer>>,
    /// Active audio input stream (kept alive during recording)
    stream: Option<cpal::Stream>,
    /// Set once the stream is running; an unstarted capture writes nothing
    started: bool,
    artifact: PathBuf,
}

impl CpalCapture {
    /// Opens the input device and builds a paused input stream.
    ///
    /// # Arguments
    /// * `device_spec` - "default", a device name or an index from `recwave list-devices`
    /// * `requested_sample_rate` - Desired rate; the device rate wins when they differ
    /// * `artifact` - Output WAV path, created or overwritten on stop
    ///
    /// # Errors
    /// - If the device is not available
    /// - If the artifact directory cannot be created
    /// - If the input stream cannot be built
    pub fn prepare(device_spec: &str, requested_sample_rate: u32, artifact: &Path) -> Result<Self> {
        if let Some(parent) = artifact.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            find_input_device(&host, device_spec)
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Recording device: {}", device_name);

        let device_config = device.default_input_config()?;
        let device_sample_rate = device_config.sample_rate().0;
        let num_channels = device_config.channels() as usize;

        if device_sample_rate != requested_sample_rate {
            tracing::warn!(
                "Requested sample rate {}Hz but device uses {}Hz. Recording at device rate.",
                requested_sample_rate,
                device_sample_rate
            );
        }

        tracing::debug!(
            "Device configuration: {}Hz, {} channels, {:?}",
            device_sample_rate,
            num_channels,
            device_config.sample_format()
        );

        let buffer = Arc::new(Mutex::new(CaptureBuffer::default()));
        let stream_config: cpal::StreamConfig = device_config.config();

        let stream = match device_config.sample_format() {
            cpal::SampleFormat::I16 => {
                build_input::<i16>(&device, &stream_config, &buffer, num_channels)?
            }
            cpal::SampleFormat::U16 => {
                build_input::<u16>(&device, &stream_config, &buffer, num_channels)?
            }
            cpal::SampleFormat::F32 => {
                build_input::<f32>(&device, &stream_config, &buffer, num_channels)?
            }
            other => return Err(anyhow!("Unsupported input sample format: {other:?}")),
        };

        Ok(Self {
            sample_rate: device_sample_rate,
            buffer,
            stream: Some(stream),
            started: false,
            artifact: artifact.to_path_buf(),
        })
    }

    /// Saves audio samples as a mono 16-bit WAV file.
    fn save_wav(&self, samples: &[i16], path: &Path) -> Result<()> {
        let wav_spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = WavWriter::create(path, wav_spec)?;

        for &sample in samples {
            writer.write_sample(sample)?;
        }

        writer.finalize()?;
        Ok(())
    }
}

impl CaptureHandle for CpalCapture {
    fn start(&mut self) -> Result<()> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| anyhow!("Capture already stopped"))?;
        stream.play()?;
        self.started = true;
        tracing::debug!("Audio input stream started");
        Ok(())
    }

    fn max_amplitude(&mut self) -> f32 {
        lock(&self.buffer).take_peak() as f32
    }

    fn stop(&mut self) -> Result<()> {
        // Dropping the stream closes the device
        if self.stream.take().is_none() || !self.started {
            return Ok(());
        }

        let samples = std::mem::take(&mut lock(&self.buffer).samples);
        if samples.is_empty() {
            tracing::warn!("Recording stopped with no samples captured");
        }

        let duration_secs = samples.len() as f32 / self.sample_rate as f32;
        tracing::info!(
            "Recording stopped: {:.2}s ({} samples at {}Hz)",
            duration_secs,
            samples.len(),
            self.sample_rate
        );

        self.save_wav(&samples, &self.artifact)?;

        let file_size = std::fs::metadata(&self.artifact)?.len();
        tracing::info!(
            "Audio saved: {} ({} bytes)",
            self.artifact.display(),
            file_size
        );
        Ok(())
    }
}

/// Builds an input stream that feeds `buffer`, converting samples to i16.
fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    buffer: &Arc<Mutex<CaptureBuffer>>,
    num_channels: usize,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let buffer = Arc::clone(buffer);
    let mut converted: Vec<i16> = Vec::new();

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            converted.clear();
            converted.extend(data.iter().map(|&s| s.to_sample::<i16>()));
            lock(&buffer).push_frames(&converted, num_channels);
        },
        |err| {
            tracing::error!("Audio input stream error: {}", err);
        },
        None,
    )?;

    Ok(stream)
}

/// Finds an audio input device by name or numeric index.
///
/// # Arguments
/// * `host` - The cpal audio host
/// * `device_spec` - Either "default" for system default, a device name, or a numeric index (0, 1, 2, etc.)
///
/// # Errors
/// - If no device with the specified name/index is found
pub(crate) fn find_input_device(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device> {
    if device_spec == "default" {
        return host
            .default_input_device()
            .ok_or_else(|| anyhow!("No audio input device available"));
    }

    let devices: Vec<_> = host
        .input_devices()
        .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?
        .collect();

    // Try to parse as a numeric index first
    if let Ok(index) = device_spec.parse::<usize>() {
        let count = devices.len();
        return devices.into_iter().nth(index).ok_or_else(|| {
            anyhow!(
                "Device index {} is out of range (0-{})",
                index,
                count.saturating_sub(1)
            )
        });
    }

    devices
        .into_iter()
        .find(|device| device.name().map(|name| name == device_spec).unwrap_or(false))
        .ok_or_else(|| {
            anyhow!(
                "Audio input device '{device_spec}' not found. Use 'recwave list-devices' to see available devices."
            )
        })
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library warnings on Linux.
/// On non-Linux platforms, this is a no-op since ALSA doesn't exist.
#[cfg(target_os = "linux")]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| anyhow!("Failed to open /dev/null: {e}"))?;

    let dev_null_fd = dev_null.as_raw_fd();

    // Save the current stderr file descriptor
    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return Err(anyhow!("Failed to duplicate stderr"));
    }

    let redirect_result = unsafe { libc::dup2(dev_null_fd, libc::STDERR_FILENO) };
    if redirect_result == -1 {
        unsafe { libc::close(old_stderr) };
        return Err(anyhow!("Failed to redirect stderr"));
    }

    let result = f();

    // Restore the original stderr
    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}
