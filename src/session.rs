//! The communication session: a background worker wrapped around the codec.
//!
//! One session owns one transport for its whole life. The worker task polls
//! the transport, reassembles and decodes frames, dispatches them against a
//! snapshot of the sensor state, writes responses, and publishes events for
//! whoever is watching. Failures are funneled into events; nothing escapes
//! the task uncaught.

use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::error::{LinkError, Result};
use crate::events::SessionEvent;
use crate::identity::DeviceIdentity;
use crate::protocol::{Frame, FrameBuffer};
use crate::registry::dispatch;
use crate::state::{SensorHandle, SensorReading};
use crate::transport::Transport;

/// Lifecycle of a session.
///
/// `Idle` exists only between `start()` and the worker's first poll; the
/// worker enters `Running` immediately and leaves through `Stopping` into
/// `Stopped`, releasing the transport exactly once on the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Tuning knobs for a session. Plain parameters, no files or env vars.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Blocking-read deadline per poll. Expiry is an idle tick, not an error.
    pub read_timeout: Duration,
    /// Consecutive transport failures tolerated before the session gives up.
    pub max_io_errors: u32,
    /// Identity reported in device-info responses.
    pub identity: DeviceIdentity,
    /// Capacity of the observer event channel.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(500),
            max_io_errors: 10,
            identity: DeviceIdentity::default(),
            event_capacity: 64,
        }
    }
}

/// Handle to a running communication loop.
///
/// Dropping the session cancels the worker; [`Session::stop`] does the same
/// but also waits until the transport has been released.
pub struct Session {
    events: broadcast::Sender<SessionEvent>,
    state: watch::Receiver<SessionState>,
    cancel: CancellationToken,
}

impl Session {
    /// Open the transport and start the worker.
    ///
    /// The opener runs once; its error is surfaced as
    /// [`LinkError::TransportUnavailable`] and no worker is spawned; the
    /// session never enters `Running`. On success the transport moves into
    /// the worker task, which owns it exclusively until `Stopped`.
    pub async fn start<T, F>(opener: F, sensor: &SensorHandle, config: SessionConfig) -> Result<Self>
    where
        T: Transport,
        F: FnOnce() -> Result<T>,
    {
        let transport = opener().map_err(|e| match e {
            e @ LinkError::TransportUnavailable { .. } => e,
            other => LinkError::unavailable_with_source("transport opener failed", Box::new(other)),
        })?;

        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let (event_tx, _) = broadcast::channel(config.event_capacity);
        let cancel = CancellationToken::new();

        let reading = sensor.subscribe();
        let events = event_tx.clone();
        let worker_cancel = cancel.clone();
        tokio::spawn(async move {
            comm_loop(transport, reading, config, events, state_tx, worker_cancel).await;
        });

        Ok(Self { events: event_tx, state: state_rx, cancel })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Whether the loop is still serving requests.
    pub fn is_running(&self) -> bool {
        matches!(self.state(), SessionState::Running)
    }

    /// Subscribe to session events as a stream.
    ///
    /// A lagging subscriber misses events rather than stalling the loop.
    pub fn events(&self) -> BroadcastStream<SessionEvent> {
        BroadcastStream::new(self.events.subscribe())
    }

    /// Subscribe to session events as a raw broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Request the loop to stop and wait for the transport to be released.
    ///
    /// Safe to call from any task and idempotent: stopping an already
    /// stopped (or never started) session is a no-op.
    pub async fn stop(&self) {
        if self.state() == SessionState::Stopped {
            return;
        }
        self.cancel.cancel();
        let mut rx = self.state.clone();
        let _ = rx.wait_for(|s| *s == SessionState::Stopped).await;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!("dropping session, cancelling worker");
        self.cancel.cancel();
    }
}

/// The worker loop. Read → decode → dispatch → write, one frame at a time,
/// FIFO relative to arrival. Cancellation is observed at the top of every
/// iteration and during the blocking read.
async fn comm_loop<T: Transport>(
    mut transport: T,
    reading: watch::Receiver<SensorReading>,
    config: SessionConfig,
    events: broadcast::Sender<SessionEvent>,
    state: watch::Sender<SessionState>,
    cancel: CancellationToken,
) {
    let _ = state.send(SessionState::Running);
    info!(
        read_timeout_ms = config.read_timeout.as_millis() as u64,
        address = config.identity.address,
        "communication loop started"
    );

    let mut buffer = FrameBuffer::new();
    let mut frames = 0u64;
    let mut responses = 0u64;
    let mut io_errors = 0u32;

    'poll: loop {
        if cancel.is_cancelled() {
            info!("communication loop cancelled");
            break;
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                info!("communication loop cancelled during read");
                break;
            }
            r = transport.read_chunk(config.read_timeout) => r,
        };

        match result {
            Ok(chunk) => {
                io_errors = 0;
                buffer.push(&chunk);

                while let Some(region) = buffer.next_region() {
                    let frame = match Frame::decode(&region) {
                        Ok(frame) => frame,
                        Err(e) => {
                            debug!(error = %e, len = region.len(), "discarding malformed frame");
                            let _ = events.send(SessionEvent::Diagnostic {
                                text: format!("malformed frame discarded: {e}"),
                            });
                            continue;
                        }
                    };

                    frames += 1;
                    trace!(
                        command = frame.command,
                        control = frame.control,
                        address = frame.address,
                        "frame received"
                    );
                    let _ = events.send(SessionEvent::FrameReceived {
                        raw: region,
                        control: frame.control,
                        address: frame.address,
                        command: frame.command,
                    });

                    // One consistent snapshot per dispatch; concurrent UI
                    // writes are either fully in or fully out.
                    let snapshot = *reading.borrow();

                    match dispatch(&frame, &snapshot, &config.identity) {
                        Some(out) => match transport.write(&out.frame.encode()).await {
                            Ok(()) => {
                                responses += 1;
                                debug!(kind = ?out.kind, "response sent");
                                let _ = events.send(SessionEvent::ResponseSent { kind: out.kind });
                            }
                            Err(e) => {
                                warn!(error = %e, "response write failed");
                                let _ =
                                    events.send(SessionEvent::Error { message: e.to_string() });
                                io_errors += 1;
                                if io_errors >= config.max_io_errors {
                                    emit_terminal(&events, io_errors);
                                    break 'poll;
                                }
                            }
                        },
                        None => {
                            debug!(command = frame.command, "command not handled by this device");
                            let _ = events.send(SessionEvent::Diagnostic {
                                text: format!("unhandled command {:#04x}", frame.command),
                            });
                        }
                    }
                }
            }
            Err(e) if e.is_timeout() => {
                trace!("read deadline elapsed, no frame this tick");
            }
            Err(e) => {
                io_errors += 1;
                error!(
                    error = %e,
                    failures = io_errors,
                    max = config.max_io_errors,
                    "transport failure"
                );
                let _ = events.send(SessionEvent::Error { message: e.to_string() });

                if io_errors >= config.max_io_errors {
                    emit_terminal(&events, io_errors);
                    break;
                }

                // Bounded exponential backoff: 100ms, 200ms, ... capped.
                let backoff = Duration::from_millis(50 * (1 << io_errors.min(5)));
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        }
    }

    let _ = state.send(SessionState::Stopping);
    if let Err(e) = transport.close().await {
        warn!(error = %e, "transport close failed");
    }
    info!(frames, responses, "communication loop ended");
    let _ = state.send(SessionState::Stopped);
}

fn emit_terminal(events: &broadcast::Sender<SessionEvent>, failures: u32) {
    let terminal = LinkError::SessionTerminated { failures };
    error!(failures, "giving up on transport");
    let _ = events.send(SessionEvent::Error { message: terminal.to_string() });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ResponseKind;
    use crate::protocol::{
        LightValue, MASTER_BIT, MSG_DEVICE_INFO_REQ, MSG_DEVICE_INFO_RESP, MSG_GET_LIGHT_VALUE_REQ,
        MSG_GET_LIGHT_VALUE_RESP,
    };
    use crate::transports::mock::{self, MockTransport};
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    fn fast_config() -> SessionConfig {
        SessionConfig { read_timeout: Duration::from_millis(20), ..SessionConfig::default() }
    }

    async fn start_session(
        transport: MockTransport,
        sensor: &SensorHandle,
        config: SessionConfig,
    ) -> Session {
        Session::start(move || Ok(transport), sensor, config).await.expect("session starts")
    }

    fn light_request() -> Frame {
        Frame::new(0x21, MASTER_BIT | 0x02, MSG_GET_LIGHT_VALUE_REQ, vec![])
    }

    async fn next_event_matching(
        rx: &mut broadcast::Receiver<SessionEvent>,
        pred: impl Fn(&SessionEvent) -> bool,
    ) -> SessionEvent {
        timeout(WAIT, async {
            loop {
                match rx.recv().await {
                    Ok(event) if pred(&event) => return event,
                    Ok(_) => continue,
                    Err(e) => panic!("event channel ended: {e}"),
                }
            }
        })
        .await
        .expect("expected event within deadline")
    }

    #[tokio::test]
    async fn answers_light_request_with_current_reading() {
        let (transport, mut lcu) = mock::pair();
        let sensor = SensorHandle::new(SensorReading { light: 100, temperature: 25, voltage: 5.0 });
        let session = start_session(transport, &sensor, fast_config()).await;

        lcu.send_frame(&light_request());
        let resp = lcu.recv_frame(WAIT).await.expect("light response");

        assert_eq!(resp.command, MSG_GET_LIGHT_VALUE_RESP);
        assert_eq!(resp.control & MASTER_BIT, 0);
        assert_eq!(resp.control, 0x02); // other bits pass through
        let value = LightValue::decode(&resp.payload).unwrap();
        assert_eq!(value.raw, 100);
        assert_eq!(value.last, 100);
        assert!((95..=105).contains(&value.avg));

        session.stop().await;
    }

    #[tokio::test]
    async fn answers_device_info_request() {
        let (transport, mut lcu) = mock::pair();
        let sensor = SensorHandle::default();
        let session = start_session(transport, &sensor, fast_config()).await;

        lcu.send_frame(&Frame::new(0x21, MASTER_BIT, MSG_DEVICE_INFO_REQ, vec![]));
        let resp = lcu.recv_frame(WAIT).await.expect("device info response");

        assert_eq!(resp.command, MSG_DEVICE_INFO_RESP);
        let info = crate::protocol::DeviceInfo::decode(&resp.payload).unwrap();
        assert_eq!(info, DeviceIdentity::default().info());

        session.stop().await;
    }

    #[tokio::test]
    async fn unknown_command_is_observed_but_unanswered() {
        let (transport, mut lcu) = mock::pair();
        let sensor = SensorHandle::default();
        let session = start_session(transport, &sensor, fast_config()).await;
        let mut events = session.subscribe();

        lcu.send_frame(&Frame::new(0x21, MASTER_BIT, 0x6E, vec![]));

        let event = next_event_matching(&mut events, |e| {
            matches!(e, SessionEvent::Diagnostic { text } if text.contains("0x6e"))
        })
        .await;
        assert!(matches!(event, SessionEvent::Diagnostic { .. }));

        // And nothing comes back on the wire.
        assert!(lcu.recv_frame(Duration::from_millis(100)).await.is_none());

        session.stop().await;
    }

    #[tokio::test]
    async fn malformed_input_never_terminates_the_loop() {
        let (transport, mut lcu) = mock::pair();
        let sensor = SensorHandle::default();
        let session = start_session(transport, &sensor, fast_config()).await;
        let mut events = session.subscribe();

        lcu.send_raw(&[0x01, 0x02]); // garbage that cannot start a frame
        next_event_matching(&mut events, |e| {
            matches!(e, SessionEvent::Diagnostic { text } if text.contains("malformed"))
        })
        .await;

        // The loop is still alive and answers the next well-formed request.
        lcu.send_frame(&light_request());
        assert!(lcu.recv_frame(WAIT).await.is_some());
        assert!(session.is_running());

        session.stop().await;
    }

    #[tokio::test]
    async fn request_behind_line_noise_is_still_answered() {
        let (transport, mut lcu) = mock::pair();
        let sensor = SensorHandle::default();
        let session = start_session(transport, &sensor, fast_config()).await;
        let mut events = session.subscribe();

        // A high noise byte reads like a huge declared length; the request
        // right behind it must not be held hostage to it.
        lcu.send_raw(&[0xFF]);
        lcu.send_frame(&light_request());

        let resp = lcu.recv_frame(WAIT).await.expect("response despite noise");
        assert_eq!(resp.command, MSG_GET_LIGHT_VALUE_RESP);

        // The dropped noise is reported, not swallowed.
        next_event_matching(&mut events, |e| {
            matches!(e, SessionEvent::Diagnostic { text } if text.contains("malformed"))
        })
        .await;

        session.stop().await;
    }

    #[tokio::test]
    async fn frame_split_across_chunks_is_served() {
        let (transport, mut lcu) = mock::pair();
        let sensor = SensorHandle::default();
        let session = start_session(transport, &sensor, fast_config()).await;

        let bytes = light_request().encode();
        lcu.send_raw(&bytes[..3]);
        lcu.send_raw(&bytes[3..]);

        assert!(lcu.recv_frame(WAIT).await.is_some());
        session.stop().await;
    }

    #[tokio::test]
    async fn responses_reflect_ui_updates_between_polls() {
        let (transport, mut lcu) = mock::pair();
        let sensor = SensorHandle::new(SensorReading { light: 20, temperature: 21, voltage: 5.0 });
        let session = start_session(transport, &sensor, fast_config()).await;

        // The UI pushes a new scenario field by field.
        sensor.set_light(800);
        sensor.set_temperature(80);
        sensor.set_voltage(3.3);

        lcu.send_frame(&light_request());
        let resp = lcu.recv_frame(WAIT).await.expect("response");
        let value = LightValue::decode(&resp.payload).unwrap();
        assert_eq!(value.raw, 800);
        assert_eq!(value.last, 800);

        session.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_releases_cleanly() {
        let (transport, _lcu) = mock::pair();
        let sensor = SensorHandle::default();
        let session = start_session(transport, &sensor, fast_config()).await;

        session.stop().await;
        assert_eq!(session.state(), SessionState::Stopped);

        // Second stop on an already stopped session is a no-op.
        session.stop().await;
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn opener_failure_never_enters_running() {
        let sensor = SensorHandle::default();
        let result = Session::start(
            || Err::<MockTransport, _>(LinkError::unavailable("COM7 not present")),
            &sensor,
            SessionConfig::default(),
        )
        .await;

        assert!(matches!(result, Err(LinkError::TransportUnavailable { .. })));
    }

    #[tokio::test]
    async fn transient_read_error_is_survived() {
        let (transport, mut lcu) = mock::pair();
        let sensor = SensorHandle::default();
        let session = start_session(transport, &sensor, fast_config()).await;
        let mut events = session.subscribe();

        lcu.inject_read_error("glitch");
        next_event_matching(&mut events, |e| matches!(e, SessionEvent::Error { .. })).await;

        lcu.send_frame(&light_request());
        assert!(lcu.recv_frame(WAIT).await.is_some());
        assert!(session.is_running());

        session.stop().await;
    }

    #[tokio::test]
    async fn repeated_io_errors_reach_the_terminal_threshold() {
        let (transport, lcu) = mock::pair();
        let sensor = SensorHandle::default();
        let config = SessionConfig { max_io_errors: 3, ..fast_config() };
        let session = start_session(transport, &sensor, config).await;
        let mut events = session.subscribe();

        for _ in 0..3 {
            lcu.inject_read_error("line down");
        }

        next_event_matching(&mut events, |e| {
            matches!(e, SessionEvent::Error { message } if message.contains("terminated"))
        })
        .await;

        let mut state = session.state.clone();
        timeout(WAIT, state.wait_for(|s| *s == SessionState::Stopped))
            .await
            .expect("session reaches Stopped")
            .expect("state channel alive");
    }

    #[tokio::test]
    async fn event_stream_orders_receive_before_response() {
        use futures::StreamExt;

        let (transport, mut lcu) = mock::pair();
        let sensor = SensorHandle::default();
        let session = start_session(transport, &sensor, fast_config()).await;
        let mut events = session.events();

        lcu.send_frame(&light_request());
        lcu.recv_frame(WAIT).await.expect("response");

        let first = timeout(WAIT, events.next())
            .await
            .expect("event within deadline")
            .expect("stream alive")
            .expect("no lag on a fresh subscriber");
        assert!(
            matches!(first, SessionEvent::FrameReceived { command, .. } if command == MSG_GET_LIGHT_VALUE_REQ)
        );

        let second = timeout(WAIT, events.next())
            .await
            .expect("event within deadline")
            .expect("stream alive")
            .expect("no lag on a fresh subscriber");
        assert!(matches!(second, SessionEvent::ResponseSent { kind: ResponseKind::LightValue(_) }));

        session.stop().await;
    }
}
