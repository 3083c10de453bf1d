use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};
use readycheck_foundation::AudioError;

pub struct DeviceManager {
    host: Host,
    current_device: Option<Device>,
}

impl DeviceManager {
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        Ok(Self {
            host,
            current_device: None,
        })
    }

    pub fn host_id(&self) -> cpal::HostId {
        self.host.id()
    }

    pub fn enumerate_devices(&self) -> Vec<DeviceInfo> {
        let mut devices = Vec::new();

        if let Ok(inputs) = self.host.input_devices() {
            for device in inputs {
                if let Ok(name) = device.name() {
                    // Skip devices that expose no usable input configs
                    let usable = device
                        .supported_input_configs()
                        .map(|mut c| c.next().is_some())
                        .unwrap_or(false);
                    if usable {
                        devices.push(DeviceInfo {
                            name,
                            is_default: false,
                        });
                    }
                }
            }
        }

        if let Some(default_name) = self.default_input_device_name() {
            for device in &mut devices {
                if device.name == default_name {
                    device.is_default = true;
                }
            }
        }

        devices
    }

    pub fn default_input_device_name(&self) -> Option<String> {
        self.host.default_input_device().and_then(|d| d.name().ok())
    }

    /// Candidate names in try-order: the OS default first, then the rest.
    pub fn candidate_device_names(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();

        if let Some(def) = self.default_input_device_name() {
            out.push(def);
        }

        for d in self.enumerate_devices() {
            if !out.iter().any(|n| n == &d.name) {
                out.push(d.name);
            }
        }

        out
    }

    pub fn open_device(&mut self, name: Option<&str>) -> Result<Device, AudioError> {
        // A specific name is honored exactly, then by case-insensitive
        // substring; a miss surfaces an error rather than silently falling
        // back to a different microphone.
        if let Some(preferred) = name {
            if let Some(device) = self.find_device_by_name(preferred) {
                self.current_device = Some(device.clone());
                return Ok(device);
            }
            if let Some(device) = self
                .find_device_by_predicate(|n| n.to_lowercase().contains(&preferred.to_lowercase()))
            {
                tracing::warn!(
                    "Preferred device '{}' not found exactly; using closest match '{}'",
                    preferred,
                    device.name().unwrap_or_default()
                );
                self.current_device = Some(device.clone());
                return Ok(device);
            }
            return Err(AudioError::DeviceNotFound {
                name: Some(preferred.to_string()),
            });
        }

        if let Some(device) = self.host.default_input_device() {
            self.current_device = Some(device.clone());
            return Ok(device);
        }

        // No OS default: fall back through the candidate order
        for candidate in self.candidate_device_names() {
            if let Some(device) = self.find_device_by_name(&candidate) {
                self.current_device = Some(device.clone());
                return Ok(device);
            }
        }

        Err(AudioError::DeviceNotFound { name: None })
    }

    fn find_device_by_name(&self, name: &str) -> Option<Device> {
        if let Ok(devices) = self.host.input_devices() {
            for device in devices {
                if let Ok(device_name) = device.name() {
                    if device_name == name {
                        return Some(device);
                    }
                }
            }
        }
        None
    }

    fn find_device_by_predicate<F>(&self, pred: F) -> Option<Device>
    where
        F: Fn(&str) -> bool,
    {
        if let Ok(devices) = self.host.input_devices() {
            for device in devices {
                if let Ok(name) = device.name() {
                    if pred(&name) {
                        return Some(device);
                    }
                }
            }
        }
        None
    }
}

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub is_default: bool,
}
