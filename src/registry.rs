//! Command dispatch: request frame in, response frame out.
//!
//! The registry answers exactly two commands. Everything else is reported by
//! the session and left unanswered: the LCU polls other device classes on
//! the same bus, and a slave must stay silent on commands it does not own.

use rand::Rng;

use crate::events::ResponseKind;
use crate::identity::DeviceIdentity;
use crate::protocol::{
    Command, Frame, LightValue, MSG_DEVICE_INFO_RESP, MSG_GET_LIGHT_VALUE_RESP,
    to_response_control,
};
use crate::state::SensorReading;

/// Modeled sensor noise on the averaged reading, in lux.
const AVG_JITTER: i32 = 5;

/// A response ready to go out: the frame to write plus what it contained,
/// for the observer event.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub frame: Frame,
    pub kind: ResponseKind,
}

/// Build the response for an inbound request, if the command is one this
/// device answers.
///
/// Pure computation over its inputs: the sensor reading is a snapshot taken
/// by the caller, so concurrent UI writes cannot tear it. Unknown commands
/// yield `None`.
pub fn dispatch(
    frame: &Frame,
    reading: &SensorReading,
    identity: &DeviceIdentity,
) -> Option<Outbound> {
    match Command::from_code(frame.command) {
        Command::GetLightValueReq => {
            let light = clamp_lux(reading.light);
            let jitter = rand::thread_rng().gen_range(-AVG_JITTER..=AVG_JITTER);
            let value = LightValue {
                raw: light,
                avg: clamp_lux(reading.light + jitter),
                last: light,
            };
            Some(Outbound {
                frame: Frame::new(
                    identity.address,
                    to_response_control(frame.control),
                    MSG_GET_LIGHT_VALUE_RESP,
                    value.encode(),
                ),
                kind: ResponseKind::LightValue(value),
            })
        }
        Command::DeviceInfoReq => {
            let info = identity.info();
            Some(Outbound {
                frame: Frame::new(
                    identity.address,
                    to_response_control(frame.control),
                    MSG_DEVICE_INFO_RESP,
                    info.encode(),
                ),
                kind: ResponseKind::DeviceInfo(info),
            })
        }
        // Responses on the bus and foreign commands are not ours to answer.
        _ => None,
    }
}

/// Clamp a scenario light value into the u16 wire width.
fn clamp_lux(lux: i32) -> u16 {
    lux.clamp(0, u16::MAX as i32) as u16
}
