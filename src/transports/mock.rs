//! In-memory transport for tests and host-side runs without hardware.
//!
//! [`pair`] returns the two ends of a simulated serial link: the sensor side
//! implements [`Transport`] and is handed to a session; the master side is
//! an [`LcuHandle`] the test (or demo) drives like a Light Control Unit.
//! The master side can also inject read failures to exercise the session's
//! error paths.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::error::{FramingError, LinkError, Result};
use crate::protocol::Frame;
use crate::transport::Transport;

/// What the master side pushes toward the sensor.
#[derive(Debug)]
enum Inbound {
    Chunk(Vec<u8>),
    ReadError(String),
}

/// Sensor-side end of the simulated link.
#[derive(Debug)]
pub struct MockTransport {
    rx: mpsc::UnboundedReceiver<Inbound>,
    tx: mpsc::UnboundedSender<Vec<u8>>,
    closed: bool,
}

/// Master-side end: sends requests, receives responses.
#[derive(Debug)]
pub struct LcuHandle {
    tx: mpsc::UnboundedSender<Inbound>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

/// Create a connected transport/master pair.
pub fn pair() -> (MockTransport, LcuHandle) {
    let (to_sensor, from_master) = mpsc::unbounded_channel();
    let (to_master, from_sensor) = mpsc::unbounded_channel();
    (
        MockTransport { rx: from_master, tx: to_master, closed: false },
        LcuHandle { tx: to_sensor, rx: from_sensor },
    )
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn read_chunk(&mut self, deadline: Duration) -> Result<Vec<u8>> {
        if self.closed {
            return Err(LinkError::read_failed("transport closed"));
        }
        match timeout(deadline, self.rx.recv()).await {
            Ok(Some(Inbound::Chunk(bytes))) => Ok(bytes),
            Ok(Some(Inbound::ReadError(reason))) => Err(LinkError::read_failed(reason)),
            Ok(None) => Err(LinkError::read_failed("master end dropped")),
            Err(_) => Err(LinkError::Framing(FramingError::Timeout { deadline })),
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Err(LinkError::write_failed("transport closed"));
        }
        self.tx
            .send(bytes.to_vec())
            .map_err(|_| LinkError::write_failed("master end dropped"))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.rx.close();
        Ok(())
    }
}

impl LcuHandle {
    /// Send a request frame toward the sensor.
    pub fn send_frame(&self, frame: &Frame) {
        let _ = self.tx.send(Inbound::Chunk(frame.encode()));
    }

    /// Push raw bytes, frame-aligned or not.
    pub fn send_raw(&self, bytes: &[u8]) {
        let _ = self.tx.send(Inbound::Chunk(bytes.to_vec()));
    }

    /// Make the sensor's next read fail, as a flaky serial line would.
    pub fn inject_read_error(&self, reason: impl Into<String>) {
        let _ = self.tx.send(Inbound::ReadError(reason.into()));
    }

    /// Wait for the next response frame from the sensor.
    ///
    /// Returns `None` if nothing arrives within the deadline or the sensor
    /// end is gone.
    pub async fn recv_frame(&mut self, deadline: Duration) -> Option<Frame> {
        match timeout(deadline, self.rx.recv()).await {
            Ok(Some(bytes)) => Frame::decode(&bytes).ok(),
            _ => None,
        }
    }
}
