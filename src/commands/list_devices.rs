//! List available audio input devices.

use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait};

use crate::recording::audio::suppress_alsa_warnings;

/// One input device as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DeviceEntry {
    index: usize,
    name: String,
    is_default: bool,
    /// "(48000Hz, 2 channels)" or why it is unavailable
    config_info: String,
}

/// Lists all available audio input devices on the system.
///
/// The printed IDs and names are what `audio.device` accepts in the config.
///
/// # Errors
/// - If the audio host cannot be initialized
pub fn handle_list_devices() -> Result<(), anyhow::Error> {
    let entries = suppress_alsa_warnings(|| {
        let host = cpal::default_host();
        let default_name = host.default_input_device().and_then(|d| d.name().ok());
        let devices = host
            .input_devices()
            .map_err(|e| anyhow!("Failed to enumerate audio devices: {e}"))?;

        // Skip devices that fail to report a name
        let entries = devices
            .filter_map(|device| device.name().ok().map(|name| (device, name)))
            .enumerate()
            .map(|(index, (device, name))| {
                let config_info = match device.default_input_config() {
                    Ok(config) => format!(
                        "({}Hz, {} channels)",
                        config.sample_rate().0,
                        config.channels()
                    ),
                    Err(_) => "(configuration unavailable)".to_string(),
                };
                DeviceEntry {
                    index,
                    is_default: default_name.as_deref() == Some(name.as_str()),
                    name,
                    config_info,
                }
            })
            .collect::<Vec<_>>();
        Ok(entries)
    })?;

    if entries.is_empty() {
        println!("No audio input devices found on this system.");
        return Ok(());
    }

    println!();
    println!("Available audio input devices:");
    println!();
    for entry in &entries {
        print!("{}", format_entry(entry));
    }

    Ok(())
}

fn format_entry(entry: &DeviceEntry) -> String {
    let default_indicator = if entry.is_default { " [DEFAULT]" } else { "" };
    format!(
        "  ID: {}\n    Name: {}{}\n    Config: {}\n\n",
        entry.index, entry.name, default_indicator, entry.config_info
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_entry_marks_default() {
        let entry = DeviceEntry {
            index: 1,
            name: "USB Mic".to_string(),
            is_default: true,
            config_info: "(48000Hz, 1 channels)".to_string(),
        };
        assert_eq!(
            format_entry(&entry),
            "  ID: 1\n    Name: USB Mic [DEFAULT]\n    Config: (48000Hz, 1 channels)\n\n"
        );
    }
}
