//! Audio device enumeration on a cpal host.
//!
//! Lists input and output endpoints with their default configuration and
//! resolves a [`DeviceSelector`] to a concrete device.

use cpal::traits::{DeviceTrait, HostTrait};
use serde::Serialize;

use pcm_engine_core::{DeviceRole, DeviceSelector};

use crate::error::CpalError;

/// One endpoint as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    pub role: &'static str,
    pub is_default: bool,
    pub default_sample_rate_hz: Option<u32>,
    pub default_channels: Option<u16>,
}

/// Device lookup on one cpal host.
///
/// Holds only the host id; the host itself is re-acquired per call, so the
/// enumerator can be shared freely across threads.
#[derive(Debug, Clone, Copy)]
pub struct DeviceEnumerator {
    host_id: cpal::HostId,
}

impl DeviceEnumerator {
    /// Enumerator for the platform's default host.
    pub fn new() -> Self {
        Self {
            host_id: cpal::default_host().id(),
        }
    }

    pub fn with_host(host_id: cpal::HostId) -> Self {
        Self { host_id }
    }

    pub fn host_id(&self) -> cpal::HostId {
        self.host_id
    }

    pub fn list_input_devices(&self) -> Result<Vec<DeviceInfo>, CpalError> {
        self.list(DeviceRole::Input)
    }

    pub fn list_output_devices(&self) -> Result<Vec<DeviceInfo>, CpalError> {
        self.list(DeviceRole::Output)
    }

    /// Resolve `selector` to a device for `role`.
    pub fn find(&self, role: DeviceRole, selector: &DeviceSelector) -> Result<cpal::Device, CpalError> {
        let host = cpal::host_from_id(self.host_id)?;
        match selector {
            DeviceSelector::Default => default_device(&host, role).ok_or(CpalError::NoDefaultDevice(role_name(role))),
            DeviceSelector::Named(name) => {
                let found = devices(&host, role)?.find(|d| d.name().map(|n| &n == name).unwrap_or(false));
                found.ok_or_else(|| CpalError::DeviceNotFound(role_name(role), name.clone()))
            }
        }
    }

    fn list(&self, role: DeviceRole) -> Result<Vec<DeviceInfo>, CpalError> {
        let host = cpal::host_from_id(self.host_id)?;
        let default_name = default_device(&host, role).and_then(|d| d.name().ok());

        let mut infos = Vec::new();
        for (index, device) in devices(&host, role)?.enumerate() {
            let name = device.name().unwrap_or_else(|_| format!("Unknown Device {}", index));
            let default_config = match role {
                DeviceRole::Input => device.default_input_config().ok(),
                DeviceRole::Output => device.default_output_config().ok(),
            };
            infos.push(DeviceInfo {
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
                role: role_name(role),
                default_sample_rate_hz: default_config.as_ref().map(|c| c.sample_rate().0),
                default_channels: default_config.as_ref().map(|c| c.channels()),
            });
        }
        Ok(infos)
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

fn devices(host: &cpal::Host, role: DeviceRole) -> Result<Box<dyn Iterator<Item = cpal::Device>>, CpalError> {
    Ok(match role {
        DeviceRole::Input => Box::new(host.input_devices()?),
        DeviceRole::Output => Box::new(host.output_devices()?),
    })
}

fn default_device(host: &cpal::Host, role: DeviceRole) -> Option<cpal::Device> {
    match role {
        DeviceRole::Input => host.default_input_device(),
        DeviceRole::Output => host.default_output_device(),
    }
}

pub(crate) fn role_name(role: DeviceRole) -> &'static str {
    match role {
        DeviceRole::Input => "input",
        DeviceRole::Output => "output",
    }
}
