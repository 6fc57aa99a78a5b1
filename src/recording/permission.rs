//! Microphone access check run before a recording starts.
//!
//! A terminal program has no runtime permission prompt, so access means an
//! input device can be found and queried. A denial never ends the session; it
//! only keeps the controller from entering the recording state.

use cpal::traits::{DeviceTrait, HostTrait};

use super::audio::{find_input_device, suppress_alsa_warnings};

/// Outcome of probing the configured input device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceLookup {
    Found,
    /// The device exists but the OS refused to report its configuration
    Unusable(String),
    /// The host reports no input devices at all
    NoInputDevices,
    /// A specific device was configured and is not present
    NotFound,
}

/// Whether recording may start, and what to tell the user if not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MicrophoneAccess {
    Granted,
    /// Explain why the microphone is needed and how to allow it
    Rationale(String),
    /// Point the user at device settings
    Settings(String),
}

impl MicrophoneAccess {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    /// Message for the status line, if access was denied.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Granted => None,
            Self::Rationale(message) | Self::Settings(message) => Some(message),
        }
    }
}

/// Maps a probe result to the prompt the user should see.
pub fn classify(device_spec: &str, lookup: DeviceLookup) -> MicrophoneAccess {
    match lookup {
        DeviceLookup::Found => MicrophoneAccess::Granted,
        DeviceLookup::Unusable(reason) => MicrophoneAccess::Rationale(format!(
            "Recording needs microphone access ({reason}). Allow this terminal to use the microphone and press r again."
        )),
        DeviceLookup::NoInputDevices => MicrophoneAccess::Rationale(
            "Recording needs a microphone. Connect an input device and press r again.".to_string(),
        ),
        DeviceLookup::NotFound => MicrophoneAccess::Settings(format!(
            "Input device '{device_spec}' not found. Run 'recwave list-devices' and set audio.device with 'recwave config'."
        )),
    }
}

/// Probes the configured input device.
pub fn check_microphone_access(device_spec: &str) -> MicrophoneAccess {
    let lookup = suppress_alsa_warnings(|| Ok(probe(device_spec))).unwrap_or_else(|e| {
        tracing::warn!("Microphone probe failed: {e}");
        DeviceLookup::Unusable(e.to_string())
    });
    tracing::debug!("Microphone probe for '{}': {:?}", device_spec, lookup);
    classify(device_spec, lookup)
}

fn probe(device_spec: &str) -> DeviceLookup {
    let host = cpal::default_host();
    let device = match find_input_device(&host, device_spec) {
        Ok(device) => device,
        Err(_) => {
            let any_input = host
                .input_devices()
                .map(|mut devices| devices.next().is_some())
                .unwrap_or(false);
            return if device_spec == "default" || !any_input {
                DeviceLookup::NoInputDevices
            } else {
                DeviceLookup::NotFound
            };
        }
    };

    match device.default_input_config() {
        Ok(_) => DeviceLookup::Found,
        Err(e) => DeviceLookup::Unusable(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_device_grants_access() {
        let access = classify("default", DeviceLookup::Found);
        assert!(access.is_granted());
        assert_eq!(access.message(), None);
    }

    #[test]
    fn test_missing_named_device_points_to_settings() {
        let access = classify("USB Mic", DeviceLookup::NotFound);
        match &access {
            MicrophoneAccess::Settings(message) => {
                assert!(message.contains("USB Mic"));
                assert!(message.contains("list-devices"));
            }
            other => panic!("expected settings prompt, got {other:?}"),
        }
        assert!(!access.is_granted());
    }

    #[test]
    fn test_unusable_device_shows_rationale() {
        let access = classify("default", DeviceLookup::Unusable("permission denied".into()));
        assert!(matches!(access, MicrophoneAccess::Rationale(_)));
        assert!(access.message().unwrap().contains("permission denied"));
    }

    #[test]
    fn test_no_devices_shows_rationale() {
        let access = classify("2", DeviceLookup::NoInputDevices);
        assert!(matches!(access, MicrophoneAccess::Rationale(_)));
    }
}
