//! Device Types and Selection
//!
//! Represents connected devices and which of them a deployment targets.

use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::adb::AdbError;

/// Device state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceState {
    /// Device is online and ready
    Online,
    /// Device is offline
    Offline,
    /// Device is not authorized (need to accept on device)
    Unauthorized,
    /// Unknown state
    Unknown,
}

impl DeviceState {
    /// Parse the state column of `adb devices`
    pub fn from_adb(state: &str) -> Self {
        match state {
            "device" => DeviceState::Online,
            "offline" => DeviceState::Offline,
            "unauthorized" => DeviceState::Unauthorized,
            _ => DeviceState::Unknown,
        }
    }

    pub fn is_usable(&self) -> bool {
        matches!(self, DeviceState::Online)
    }
}

/// Device information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Device serial number
    pub serial: String,
    /// Device state
    pub state: DeviceState,
    /// Device model (e.g., "Pixel 4")
    pub model: Option<String>,
}

impl Device {
    /// Check if device is online and usable
    pub fn is_usable(&self) -> bool {
        self.state.is_usable()
    }

    /// Get display name
    pub fn display_name(&self) -> String {
        if let Some(ref model) = self.model {
            format!("{} ({})", model.replace('_', " "), self.serial)
        } else {
            self.serial.clone()
        }
    }
}

/// Parse the output of `adb devices -l`
pub fn parse_devices(output: &str) -> Vec<Device> {
    let mut devices = Vec::new();

    for line in output.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let model = parts
            .iter()
            .skip(2)
            .find_map(|part| part.strip_prefix("model:"))
            .map(str::to_string);

        devices.push(Device {
            serial: parts[0].to_string(),
            state: DeviceState::from_adb(parts[1]),
            model,
        });
    }

    devices
}

/// Which connected devices a command targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelection {
    /// The only connected device
    Single,
    /// Every connected device
    All,
    /// These serials, each of which must be connected
    Serials(Vec<String>),
}

impl DeviceSelection {
    /// Selection from an optional `device_serial` setting
    pub fn from_config(serial: Option<&str>) -> Result<Self, AdbError> {
        match serial {
            None => Ok(DeviceSelection::Single),
            Some(s) => s.parse(),
        }
    }

    /// Serials to target among `devices`
    pub fn resolve(&self, devices: &[Device]) -> Result<Vec<String>, AdbError> {
        let online: Vec<&str> = devices
            .iter()
            .filter(|d| d.is_usable())
            .map(|d| d.serial.as_str())
            .collect();

        match self {
            DeviceSelection::Single => {
                if online.len() != 1 {
                    return Err(AdbError::DeviceCount(online.len()));
                }
                Ok(vec![online[0].to_string()])
            }
            DeviceSelection::All => Ok(online.iter().map(|s| s.to_string()).collect()),
            DeviceSelection::Serials(serials) => {
                for serial in serials {
                    if !online.contains(&serial.as_str()) {
                        return Err(AdbError::DeviceNotFound(serial.clone()));
                    }
                }
                Ok(serials.clone())
            }
        }
    }
}

impl FromStr for DeviceSelection {
    type Err = AdbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "all" {
            return Ok(DeviceSelection::All);
        }

        let serials: Vec<String> = s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if serials.is_empty() {
            return Err(AdbError::NoSerials);
        }
        Ok(DeviceSelection::Serials(serials))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICES: &str = "List of devices attached\n\
        emulator-5554          device product:sdk_gphone64_x86_64 model:sdk_gphone64_x86_64 transport_id:1\n\
        R58M123ABC             device usb:1-1 product:beyond1 model:SM_G973F transport_id:2\n\
        0123456789             unauthorized usb:1-2 transport_id:3\n\n";

    #[test]
    fn test_parse_devices() {
        let devices = parse_devices(DEVICES);
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].serial, "emulator-5554");
        assert_eq!(devices[1].model.as_deref(), Some("SM_G973F"));
        assert_eq!(devices[1].display_name(), "SM G973F (R58M123ABC)");
        assert_eq!(devices[2].state, DeviceState::Unauthorized);
    }

    #[test]
    fn test_single_requires_exactly_one() {
        let devices = parse_devices(DEVICES);
        let err = DeviceSelection::Single.resolve(&devices).unwrap_err();
        assert!(matches!(err, AdbError::DeviceCount(2)));

        let one = &devices[..1];
        assert_eq!(DeviceSelection::Single.resolve(one).unwrap(), vec!["emulator-5554"]);
    }

    #[test]
    fn test_all_takes_online_devices() {
        let devices = parse_devices(DEVICES);
        let selection = DeviceSelection::from_config(Some("all")).unwrap();
        assert_eq!(selection.resolve(&devices).unwrap(), vec!["emulator-5554", "R58M123ABC"]);
    }

    #[test]
    fn test_serial_list_must_be_connected() {
        let devices = parse_devices(DEVICES);

        let selection: DeviceSelection = "R58M123ABC, emulator-5554".parse().unwrap();
        assert_eq!(selection.resolve(&devices).unwrap(), vec!["R58M123ABC", "emulator-5554"]);

        let selection: DeviceSelection = "emulator-5554,0123456789".parse().unwrap();
        assert!(matches!(selection.resolve(&devices), Err(AdbError::DeviceNotFound(s)) if s == "0123456789"));

        assert!(matches!(",".parse::<DeviceSelection>(), Err(AdbError::NoSerials)));
    }
}
