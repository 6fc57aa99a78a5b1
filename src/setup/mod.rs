//! First-run setup.
//!
//! Writes the default configuration file when none exists yet.

use std::path::Path;

/// Embedded default configuration template.
const DEFAULT_CONFIG: &str = include_str!("../../environments/recwave.toml");

/// Writes the default config to `config_path` if the file is missing.
///
/// Returns whether a new file was written.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn ensure_config(config_path: &Path) -> anyhow::Result<bool> {
    if config_path.exists() {
        tracing::debug!("Config present at {}", config_path.display());
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, DEFAULT_CONFIG)?;
    tracing::info!("Wrote default config to {}", config_path.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecwaveConfig;

    #[test]
    fn test_default_template_matches_defaults() {
        let config: RecwaveConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, RecwaveConfig::default());
    }

    #[test]
    fn test_ensure_config_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("recwave.toml");

        assert!(ensure_config(&path).unwrap());
        std::fs::write(&path, "[audio]\ndevice = \"1\"\n").unwrap();
        assert!(!ensure_config(&path).unwrap());

        let kept = RecwaveConfig::load_from(&path).unwrap();
        assert_eq!(kept.audio.device, "1");
    }
}
