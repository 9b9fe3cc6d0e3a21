//! MSSP command codes.
//!
//! Response codes are the request code with the high bit set. Only the two
//! commands the TSA0002 answers are mapped; everything else stays a raw code
//! so the session can report it without guessing its meaning.

/// Request for the current light readings.
pub const MSG_GET_LIGHT_VALUE_REQ: u8 = 0x10;
/// Response carrying `(raw, avg, last)` light readings.
pub const MSG_GET_LIGHT_VALUE_RESP: u8 = 0x90;
/// Request for static device identification.
pub const MSG_DEVICE_INFO_REQ: u8 = 0x01;
/// Response carrying the device identity tuple.
pub const MSG_DEVICE_INFO_RESP: u8 = 0x81;

/// A decoded command code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    GetLightValueReq,
    GetLightValueResp,
    DeviceInfoReq,
    DeviceInfoResp,
    /// A code this device does not understand. Observed, never answered.
    Unknown(u8),
}

impl Command {
    /// Map a raw command byte to a command.
    pub fn from_code(code: u8) -> Self {
        match code {
            MSG_GET_LIGHT_VALUE_REQ => Command::GetLightValueReq,
            MSG_GET_LIGHT_VALUE_RESP => Command::GetLightValueResp,
            MSG_DEVICE_INFO_REQ => Command::DeviceInfoReq,
            MSG_DEVICE_INFO_RESP => Command::DeviceInfoResp,
            other => Command::Unknown(other),
        }
    }

    /// The wire code for this command.
    pub fn code(&self) -> u8 {
        match self {
            Command::GetLightValueReq => MSG_GET_LIGHT_VALUE_REQ,
            Command::GetLightValueResp => MSG_GET_LIGHT_VALUE_RESP,
            Command::DeviceInfoReq => MSG_DEVICE_INFO_REQ,
            Command::DeviceInfoResp => MSG_DEVICE_INFO_RESP,
            Command::Unknown(code) => *code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_round_trip() {
        for code in [
            MSG_GET_LIGHT_VALUE_REQ,
            MSG_GET_LIGHT_VALUE_RESP,
            MSG_DEVICE_INFO_REQ,
            MSG_DEVICE_INFO_RESP,
        ] {
            assert_eq!(Command::from_code(code).code(), code);
            assert!(!matches!(Command::from_code(code), Command::Unknown(_)));
        }
    }

    #[test]
    fn unknown_codes_are_preserved() {
        assert_eq!(Command::from_code(0x42), Command::Unknown(0x42));
        assert_eq!(Command::from_code(0x42).code(), 0x42);
    }

    #[test]
    fn responses_set_the_high_bit() {
        assert_eq!(MSG_GET_LIGHT_VALUE_RESP, MSG_GET_LIGHT_VALUE_REQ | 0x80);
        assert_eq!(MSG_DEVICE_INFO_RESP, MSG_DEVICE_INFO_REQ | 0x80);
    }
}
