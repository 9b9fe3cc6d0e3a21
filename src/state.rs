//! Mutable sensor state shared between the UI side and the worker.
//!
//! The UI thread writes, the communication loop reads. Sharing goes through
//! a watch channel so the worker always sees one consistent
//! [`SensorReading`]: a multi-field update can never be observed half
//! applied.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Current simulated readings.
///
/// `light` is in lux as the scenario defines it; negative values model a
/// broken sensor and are clamped at response-build time, not here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub light: i32,
    pub temperature: i32,
    pub voltage: f32,
}

impl Default for SensorReading {
    fn default() -> Self {
        // Reference scenario defaults.
        Self { light: 100, temperature: 25, voltage: 5.0 }
    }
}

/// Clone-able writer handle owned by the UI-facing boundary.
///
/// The protocol layer never writes through this; it holds a
/// [`watch::Receiver`] and snapshots the value per dispatch.
#[derive(Debug, Clone)]
pub struct SensorHandle {
    tx: Arc<watch::Sender<SensorReading>>,
}

impl SensorHandle {
    pub fn new(initial: SensorReading) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Replace the whole reading atomically.
    pub fn set(&self, reading: SensorReading) {
        self.tx.send_replace(reading);
    }

    pub fn set_light(&self, lux: i32) {
        self.tx.send_modify(|r| r.light = lux);
    }

    pub fn set_temperature(&self, celsius: i32) {
        self.tx.send_modify(|r| r.temperature = celsius);
    }

    pub fn set_voltage(&self, volts: f32) {
        self.tx.send_modify(|r| r.voltage = volts);
    }

    /// Current value as a consistent snapshot.
    pub fn snapshot(&self) -> SensorReading {
        *self.tx.borrow()
    }

    /// Receiver side for the worker task.
    pub(crate) fn subscribe(&self) -> watch::Receiver<SensorReading> {
        self.tx.subscribe()
    }
}

impl Default for SensorHandle {
    fn default() -> Self {
        Self::new(SensorReading::default())
    }
}
