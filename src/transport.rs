//! Transport seam between the protocol core and the serial layer.

use std::time::Duration;

use crate::error::Result;

/// A byte-stream duplex channel to the master.
///
/// The core does not open ports or negotiate baud rates; it is handed an
/// already-opened channel (or an opener it calls once at session start) and
/// uses these three operations. Implementations own their timing:
///
/// - `read_chunk` returns whatever bytes are available, blocking up to
///   `timeout`. An expired deadline is
///   `Err(LinkError::Framing(FramingError::Timeout))`; the session treats
///   it as "no frame available this tick", not as a failure. Chunks need not
///   be frame-aligned; the session reassembles.
/// - `write` sends a fully encoded frame.
/// - `close` releases the channel. Called exactly once, when the session
///   stops.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    async fn read_chunk(&mut self, timeout: Duration) -> Result<Vec<u8>>;

    async fn write(&mut self, bytes: &[u8]) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}
