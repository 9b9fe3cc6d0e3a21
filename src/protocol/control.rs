//! Control-byte rules.
//!
//! The MSSP control byte is a bitmask. Bit 6 ([`MASTER_BIT`]) marks a frame
//! as master-originated; the LCU sets it on every request and the sensor
//! clears it when answering. Every other bit (sequence numbers and flags on
//! the LCU side) is opaque to the slave and must survive the round trip
//! unchanged.

/// Bit 6 of the control byte, set by the master on requests.
pub const MASTER_BIT: u8 = 0x40;

/// Derive the control byte for a response from the request's control byte.
///
/// Clears [`MASTER_BIT`] and preserves all other bits. Idempotent.
#[inline]
pub const fn to_response_control(request_control: u8) -> u8 {
    request_control & !MASTER_BIT
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn clears_master_bit() {
        assert_eq!(to_response_control(0x40), 0x00);
        assert_eq!(to_response_control(0xFF), 0xBF);
        assert_eq!(to_response_control(0x00), 0x00);
    }

    proptest! {
        #[test]
        fn response_control_is_never_master(c in any::<u8>()) {
            prop_assert_eq!(to_response_control(c) & MASTER_BIT, 0);
        }

        #[test]
        fn only_bit_six_changes(c in any::<u8>()) {
            prop_assert_eq!(to_response_control(c) | MASTER_BIT, c | MASTER_BIT);
        }

        #[test]
        fn transform_is_idempotent(c in any::<u8>()) {
            prop_assert_eq!(
                to_response_control(to_response_control(c)),
                to_response_control(c)
            );
        }
    }
}
