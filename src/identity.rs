//! Static identity of the simulated device.

use serde::{Deserialize, Serialize};

use crate::protocol::DeviceInfo;

/// Slave address of the simulated light sensor.
pub const LIGHT_SENSOR_ADDRESS: u8 = 0x21;

/// Slave group for light sensors (protocol table 7).
pub const LIGHT_SENSOR_GROUP: u8 = 0xFE;

/// Device type code for a TSA0002-class light sensor (0x00001000, LSB-first
/// on the wire).
pub const DEVICE_TYPE_LIGHT_SENSOR: u32 = 4096;

/// Identity tuple reported in the device-info response.
///
/// Fixed for the lifetime of the process; the defaults are the TSA0002
/// values the reference device reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub device_type: u32,
    pub device_id: u16,
    pub firmware: u32,
    pub address: u8,
    pub group: u8,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            device_type: DEVICE_TYPE_LIGHT_SENSOR,
            device_id: 65535,
            firmware: 16842753,
            address: LIGHT_SENSOR_ADDRESS,
            group: LIGHT_SENSOR_GROUP,
        }
    }
}

impl DeviceIdentity {
    /// The identity as a device-info payload.
    pub fn info(&self) -> DeviceInfo {
        DeviceInfo {
            device_type: self.device_type,
            device_id: self.device_id,
            firmware: self.firmware,
            address: self.address,
            group: self.group,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_identity_matches_reference_device() {
        let id = DeviceIdentity::default();
        assert_eq!(id.device_type, 4096);
        assert_eq!(id.device_id, 65535);
        assert_eq!(id.firmware, 16842753);
        assert_eq!(id.address, LIGHT_SENSOR_ADDRESS);
        assert_eq!(id.group, 0xFE);
    }
}
