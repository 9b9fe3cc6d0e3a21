//! Typed response payloads.
//!
//! Payload fields are fixed-width little-endian integers. Decoding is only
//! needed on the master side (the LCU, or a test standing in for it), but it
//! lives next to the encoder so the two cannot drift apart.

use serde::{Deserialize, Serialize};

use crate::error::FramingError;

/// Payload of `MSG_GET_LIGHT_VALUE_RESP`: three 16-bit readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightValue {
    /// Instantaneous reading.
    pub raw: u16,
    /// Averaged reading; the simulator models sensor noise here.
    pub avg: u16,
    /// Most recent stable reading.
    pub last: u16,
}

impl LightValue {
    pub const WIRE_LEN: usize = 6;

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::WIRE_LEN);
        out.extend_from_slice(&self.raw.to_le_bytes());
        out.extend_from_slice(&self.avg.to_le_bytes());
        out.extend_from_slice(&self.last.to_le_bytes());
        out
    }

    pub fn decode(payload: &[u8]) -> Result<Self, FramingError> {
        if payload.len() < Self::WIRE_LEN {
            return Err(FramingError::TooShort { len: payload.len(), min: Self::WIRE_LEN });
        }
        Ok(LightValue {
            raw: u16::from_le_bytes([payload[0], payload[1]]),
            avg: u16::from_le_bytes([payload[2], payload[3]]),
            last: u16::from_le_bytes([payload[4], payload[5]]),
        })
    }
}

/// Payload of `MSG_DEVICE_INFO_RESP`: the static identity tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_type: u32,
    pub device_id: u16,
    pub firmware: u32,
    pub address: u8,
    pub group: u8,
}

impl DeviceInfo {
    pub const WIRE_LEN: usize = 12;

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::WIRE_LEN);
        out.extend_from_slice(&self.device_type.to_le_bytes());
        out.extend_from_slice(&self.device_id.to_le_bytes());
        out.extend_from_slice(&self.firmware.to_le_bytes());
        out.push(self.address);
        out.push(self.group);
        out
    }

    pub fn decode(payload: &[u8]) -> Result<Self, FramingError> {
        if payload.len() < Self::WIRE_LEN {
            return Err(FramingError::TooShort { len: payload.len(), min: Self::WIRE_LEN });
        }
        Ok(DeviceInfo {
            device_type: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
            device_id: u16::from_le_bytes([payload[4], payload[5]]),
            firmware: u32::from_le_bytes([payload[6], payload[7], payload[8], payload[9]]),
            address: payload[10],
            group: payload[11],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_value_wire_layout_is_little_endian() {
        let lv = LightValue { raw: 0x0102, avg: 0x0304, last: 0x0506 };
        assert_eq!(lv.encode(), vec![0x02, 0x01, 0x04, 0x03, 0x06, 0x05]);
        assert_eq!(LightValue::decode(&lv.encode()).unwrap(), lv);
    }

    #[test]
    fn device_info_wire_layout() {
        // TSA0002 identity from the protocol notes: 0x00001000 encodes LSB-first.
        let info = DeviceInfo {
            device_type: 4096,
            device_id: 65535,
            firmware: 16842753,
            address: 0x21,
            group: 0xFE,
        };
        let bytes = info.encode();
        assert_eq!(bytes.len(), DeviceInfo::WIRE_LEN);
        assert_eq!(&bytes[0..4], &[0x00, 0x10, 0x00, 0x00]);
        assert_eq!(&bytes[4..6], &[0xFF, 0xFF]);
        assert_eq!(bytes[10], 0x21);
        assert_eq!(bytes[11], 0xFE);
        assert_eq!(DeviceInfo::decode(&bytes).unwrap(), info);
    }

    #[test]
    fn truncated_payloads_are_rejected() {
        assert!(matches!(LightValue::decode(&[1, 2, 3]), Err(FramingError::TooShort { .. })));
        assert!(matches!(DeviceInfo::decode(&[0; 11]), Err(FramingError::TooShort { .. })));
    }
}
