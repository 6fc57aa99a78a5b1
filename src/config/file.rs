//! Configuration file management for recwave.
//!
//! This module handles loading application configuration from TOML files.
//! Configuration is stored in the user's config directory; the recording itself
//! lives in the user's cache directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::recording::visualizations::BarStyle;

/// Audio capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `recwave list-devices`
    /// - device name from `recwave list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Requested recording sample rate in Hz (the device rate wins if different)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
        }
    }
}

/// Tick timer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimerConfig {
    /// Milliseconds between ticks. Each tick samples one waveform bar.
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
    /// Milliseconds before the first tick after recording or playback starts
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

fn default_period_ms() -> u64 {
    60
}

fn default_initial_delay_ms() -> u64 {
    100
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

impl TimerConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

/// Waveform bar layout. A terminal cell is 5 units wide and 10 units tall.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaveformConfig {
    #[serde(default = "default_bar_pitch")]
    pub bar_pitch: f32,
    #[serde(default = "default_bar_gap")]
    pub bar_gap: f32,
    #[serde(default = "default_bar_padding")]
    pub bar_padding: f32,
    /// Fraction of the waveform height a full-scale sample fills
    #[serde(default = "default_height_ratio")]
    pub height_ratio: f32,
}

fn default_bar_pitch() -> f32 {
    15.0
}

fn default_bar_gap() -> f32 {
    5.0
}

fn default_bar_padding() -> f32 {
    3.0
}

fn default_height_ratio() -> f32 {
    0.8
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            bar_pitch: default_bar_pitch(),
            bar_gap: default_bar_gap(),
            bar_padding: default_bar_padding(),
            height_ratio: default_height_ratio(),
        }
    }
}

impl WaveformConfig {
    pub fn bar_style(&self) -> BarStyle {
        BarStyle {
            pitch: self.bar_pitch,
            gap: self.bar_gap,
            padding: self.bar_padding,
            height_ratio: self.height_ratio,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecwaveConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub waveform: WaveformConfig,
}

impl RecwaveConfig {
    /// Loads configuration from the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If the config file cannot be read
    /// - If the TOML is malformed or a value is out of range
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    /// Loads and validates configuration from a specific file.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config_content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        let config: RecwaveConfig = toml::from_str(&config_content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.timer.period_ms == 0 {
            anyhow::bail!("timer.period_ms must be greater than 0");
        }
        if self.waveform.bar_pitch <= 0.0 {
            anyhow::bail!("waveform.bar_pitch must be greater than 0");
        }
        if !(0.0..self.waveform.bar_pitch).contains(&self.waveform.bar_gap) {
            anyhow::bail!("waveform.bar_gap must be at least 0 and smaller than bar_pitch");
        }
        if !(0.0..=1.0).contains(&self.waveform.height_ratio) {
            anyhow::bail!("waveform.height_ratio must be between 0 and 1");
        }
        Ok(())
    }
}

/// Retrieves the path to the config file, creating its directory.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn get_config_path() -> anyhow::Result<PathBuf> {
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
        .join(".config")
        .join("recwave");

    fs::create_dir_all(&config_dir)?;

    Ok(config_dir.join("recwave.toml"))
}

/// Fixed location of the recording, overwritten by every new recording.
///
/// # Errors
/// - If neither a cache directory nor a home directory can be determined
pub fn recording_path() -> anyhow::Result<PathBuf> {
    let cache_dir = match dirs::cache_dir() {
        Some(dir) => dir,
        None => dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
            .join(".cache"),
    };
    Ok(cache_dir.join("recwave").join("recording.wav"))
}
