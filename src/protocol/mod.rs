//! The MSSP message layer: framing, control-byte rules, command codes and
//! typed payloads.
//!
//! Everything here is pure computation over bytes; the concurrency wrapper
//! around it lives in [`crate::session`].

mod command;
mod control;
mod frame;
mod messages;

pub use command::{
    Command, MSG_DEVICE_INFO_REQ, MSG_DEVICE_INFO_RESP, MSG_GET_LIGHT_VALUE_REQ,
    MSG_GET_LIGHT_VALUE_RESP,
};
pub use control::{MASTER_BIT, to_response_control};
pub use frame::{ETX, Frame, FrameBuffer, MAX_PAYLOAD, MIN_FRAME, MIN_HEADER};
pub use messages::{DeviceInfo, LightValue};
