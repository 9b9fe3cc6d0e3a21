//! Observer events emitted by the communication loop.
//!
//! The core never renders anything; it publishes what happened and the
//! subscriber (a UI, a logger, a test) decides what to do with it. Events
//! are serializable so a frontend boundary can forward them as-is.

use serde::{Deserialize, Serialize};

use crate::protocol::{DeviceInfo, LightValue};

/// What a sent response contained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ResponseKind {
    LightValue(LightValue),
    DeviceInfo(DeviceInfo),
}

/// One observable step of the communication loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A well-formed frame arrived.
    FrameReceived {
        /// Raw wire bytes, terminator included.
        raw: Vec<u8>,
        /// Control byte of the request.
        control: u8,
        /// Destination address as sent by the master.
        address: u8,
        /// Command code.
        command: u8,
    },
    /// A response was written back to the master.
    ResponseSent { kind: ResponseKind },
    /// Something recoverable worth showing: malformed input, unknown command.
    Diagnostic { text: String },
    /// A transport failure. The loop survives these until the configured
    /// threshold of consecutive failures is reached.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_for_the_ui_boundary() {
        let event = SessionEvent::ResponseSent {
            kind: ResponseKind::LightValue(LightValue { raw: 100, avg: 103, last: 100 }),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("ResponseSent"));
        assert!(json.contains("103"));
    }
}
