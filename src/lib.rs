//! Light-sensor simulator for the MSSP master/slave serial protocol.
//!
//! Luxlink plays the slave side of an MSSP link: a TSA0002-class light
//! sensor polled by a Light Control Unit (LCU). It provides the byte-exact
//! frame codec, the control-byte rules, command dispatch against live sensor
//! state, and a background session that keeps answering the master while the
//! embedding application (typically a UI) updates the simulated readings.
//!
//! # Features
//!
//! - **Bit-exact framing**: length-delimited frames, checksum and terminator
//!   validation, stream reassembly from arbitrary chunking
//! - **Master/slave control bytes**: responses clear MASTER_BIT and pass
//!   every other bit through untouched
//! - **Tear-free state sharing**: the worker always dispatches against one
//!   consistent sensor snapshot
//! - **Observable**: every received frame, sent response and failure is an
//!   event on a broadcast stream
//!
//! # Quick start
//!
//! ```rust,no_run
//! use luxlink::{Luxlink, SensorHandle, SensorReading, transports::mock};
//!
//! #[tokio::main]
//! async fn main() -> luxlink::Result<()> {
//!     let (transport, _lcu) = mock::pair();
//!
//!     let sensor = SensorHandle::new(SensorReading { light: 400, temperature: 25, voltage: 5.0 });
//!     let session = Luxlink::attach(transport, &sensor).await?;
//!
//!     // The UI side keeps feeding scenario values while the session
//!     // answers the LCU in the background.
//!     sensor.set_light(1000);
//!
//!     session.stop().await;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod events;
pub mod identity;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod state;
pub mod transport;
pub mod transports;

pub use error::{FramingError, LinkError, Result};
pub use events::{ResponseKind, SessionEvent};
pub use identity::{DeviceIdentity, LIGHT_SENSOR_ADDRESS, LIGHT_SENSOR_GROUP};
pub use protocol::{Command, DeviceInfo, Frame, FrameBuffer, LightValue, MASTER_BIT};
pub use registry::{Outbound, dispatch};
pub use session::{Session, SessionConfig, SessionState};
pub use state::{SensorHandle, SensorReading};
pub use transport::Transport;

/// Unified entry point for attaching a simulated sensor to a transport.
///
/// Thin convenience over [`Session::start`] with default configuration; use
/// `Session::start` directly to tune timeouts, identity or the error
/// threshold.
pub struct Luxlink;

impl Luxlink {
    /// Attach a session to an already opened transport.
    ///
    /// The transport moves into the session, which owns it exclusively until
    /// stopped.
    pub async fn attach<T: Transport>(transport: T, sensor: &SensorHandle) -> Result<Session> {
        Session::start(move || Ok(transport), sensor, SessionConfig::default()).await
    }

    /// Attach with explicit configuration, opening the transport through the
    /// given opener.
    pub async fn attach_with<T, F>(
        opener: F,
        sensor: &SensorHandle,
        config: SessionConfig,
    ) -> Result<Session>
    where
        T: Transport,
        F: FnOnce() -> Result<T>,
    {
        Session::start(opener, sensor, config).await
    }
}
