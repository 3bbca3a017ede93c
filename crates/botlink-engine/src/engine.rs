use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use botlink_content::{apply_payload, Command, DeviceState, OutgoingBuffer};
use botlink_frame::FrameParser;
use botlink_transport::{unwrap_delivery, Link, MessageSink, TransportError};
use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::event::{LinkEvent, EVENT_CAPACITY};
use crate::rate::RateLimiter;
use crate::scheduler;

/// Protocol engine for one device.
///
/// Cloning is cheap; clones share the same session.
pub struct Engine<L: Link> {
    inner: Arc<Inner<L>>,
}

impl<L: Link> Clone for Engine<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub(crate) struct Inner<L: Link> {
    pub(crate) link: L,
    pub(crate) config: EngineConfig,
    shared: Mutex<Shared>,
    events: broadcast::Sender<LinkEvent>,
}

/// Everything the inbound path, the tick and the watchdog touch.
pub(crate) struct Shared {
    pub(crate) parser: FrameParser,
    pub(crate) state: DeviceState,
    pub(crate) detected: bool,
    pub(crate) outgoing: OutgoingBuffer,
    pub(crate) limiter: RateLimiter,
    /// Set once a tick has seen the link drop; cleared on reconnect.
    link_lost: bool,
    session: Option<Session>,
}

/// Per-connection cancellation scope and watchdog re-arm signal.
#[derive(Clone)]
pub(crate) struct Session {
    pub(crate) cancel: CancellationToken,
    pub(crate) rearm: Arc<Notify>,
}

impl Shared {
    fn new(config: &EngineConfig) -> Self {
        Self {
            parser: FrameParser::with_config(config.parser_config()),
            state: DeviceState::default(),
            detected: false,
            outgoing: OutgoingBuffer::with_limit(config.max_outgoing),
            limiter: RateLimiter::new(config.send_rate_max),
            link_lost: false,
            session: None,
        }
    }

    fn reset(&mut self, config: &EngineConfig) {
        self.parser.reset();
        self.state = DeviceState::default();
        self.detected = false;
        self.outgoing.clear();
        self.limiter = RateLimiter::new(config.send_rate_max);
        self.link_lost = false;
    }

    /// The current session unless it has been cancelled.
    fn live_session(&self) -> Option<&Session> {
        self.session.as_ref().filter(|s| !s.cancel.is_cancelled())
    }
}

impl<L: Link> Engine<L> {
    pub fn new(link: L, config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                shared: Mutex::new(Shared::new(&config)),
                link,
                config,
                events,
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn link(&self) -> &L {
        &self.inner.link
    }

    /// Connect the link to device `id` and start the tick and watchdog tasks.
    ///
    /// Must be called from inside a tokio runtime. An existing session is
    /// ended first.
    pub fn connect(&self, id: &str) -> Result<()> {
        let handle = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;

        let session = Session {
            cancel: CancellationToken::new(),
            rearm: Arc::new(Notify::new()),
        };
        {
            let mut shared = self.inner.lock();
            if let Some(old) = shared.session.take() {
                old.cancel.cancel();
            }
            shared.reset(&self.inner.config);
            shared.session = Some(session.clone());
        }

        let weak = Arc::downgrade(&self.inner);
        let sink: MessageSink = Arc::new(move |blob: Bytes| {
            if let Some(inner) = weak.upgrade() {
                // Failures are logged and published by the inbound path.
                let _ = inner.on_message(&blob);
            }
        });

        if let Err(err) = self.inner.link.connect(id, sink) {
            warn!(id, error = %err, "link connect failed");
            let mut shared = self.inner.lock();
            session.cancel.cancel();
            shared.session = None;
            return Err(err.into());
        }

        handle.spawn(scheduler::run_ticks(
            Arc::downgrade(&self.inner),
            session.cancel.clone(),
            self.inner.config.tick_interval,
        ));
        handle.spawn(scheduler::run_watchdog(
            Arc::downgrade(&self.inner),
            session.cancel.clone(),
            Arc::clone(&session.rearm),
            self.inner.config.watchdog_timeout,
        ));

        info!(
            id,
            tick = ?self.inner.config.tick_interval,
            watchdog = ?self.inner.config.watchdog_timeout,
            "engine connected"
        );
        Ok(())
    }

    /// End the session: stop the timers, clear all state, drop the link.
    pub fn disconnect(&self) {
        let mut shared = self.inner.lock();
        let had_session = match shared.session.take() {
            Some(session) => {
                session.cancel.cancel();
                true
            }
            None => false,
        };
        shared.reset(&self.inner.config);
        self.inner.link.disconnect();
        if had_session {
            info!("engine disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.link.is_connected()
    }

    /// Whether a valid header has arrived since connect.
    pub fn is_detected(&self) -> bool {
        self.inner.lock().detected
    }

    /// Copy of the latest device state.
    pub fn device_state(&self) -> DeviceState {
        self.inner.lock().state.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.inner.events.subscribe()
    }

    /// Feed one inbound delivery (envelope included) to the engine.
    pub fn on_message(&self, blob: &[u8]) -> Result<()> {
        self.inner.on_message(blob)
    }

    /// Queue a command record for the next outgoing frame.
    ///
    /// Returns the bytes queued; a record that would overflow the outgoing
    /// buffer is dropped and reported as an error.
    pub fn queue(&self, command: &Command) -> Result<usize> {
        Ok(self.inner.lock().outgoing.push(command)?)
    }

    /// Bytes queued for the next outgoing frame.
    pub fn pending_content(&self) -> usize {
        self.inner.lock().outgoing.len()
    }
}

impl<L: Link> Inner<L> {
    pub(crate) fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: LinkEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    pub(crate) fn on_message(&self, blob: &[u8]) -> Result<()> {
        let content = match unwrap_delivery(blob) {
            Ok(content) => content,
            Err(err) => {
                warn!(error = %err, len = blob.len(), "dropping malformed delivery");
                return Err(err.into());
            }
        };

        let mut guard = self.lock();
        let shared = &mut *guard;
        let Some(session) = shared.live_session() else {
            debug!(len = content.len(), "delivery without a session, ignored");
            return Ok(());
        };
        let rearm = Arc::clone(&session.rearm);

        let parsed = match shared.parser.push(content) {
            Ok(parsed) => parsed,
            Err(err) => {
                let capacity = shared.parser.config().capacity;
                shared.parser.reset();
                warn!(error = %err, "receive buffer overflow, cleared");
                self.publish(LinkEvent::Overflow { capacity });
                return Err(err.into());
            }
        };

        if parsed.saw_valid_header() {
            if !shared.detected {
                shared.detected = true;
                info!("device detected");
                self.publish(LinkEvent::Detected);
            }
            rearm.notify_one();
        }

        for frame in &parsed.frames {
            let summary = apply_payload(&frame.payload, &mut shared.state);
            debug!(
                payload_len = frame.payload.len(),
                applied = summary.applied,
                skipped = summary.skipped,
                truncated = summary.truncated,
                "frame decoded"
            );
        }
        if parsed.rejected > 0 {
            debug!(rejected = parsed.rejected, "frames failed payload checksum");
        }
        trace!(buffered = shared.parser.buffered(), "delivery handled");
        Ok(())
    }

    /// One outgoing tick. No-op once `cancel` has fired.
    pub(crate) fn tick(&self, cancel: &CancellationToken) {
        let mut guard = self.lock();
        let shared = &mut *guard;
        if cancel.is_cancelled() {
            return;
        }
        if !self.link.is_connected() {
            if !shared.link_lost {
                shared.link_lost = true;
                warn!("link lost");
                self.publish(LinkEvent::TransportError(TransportError::Closed.to_string()));
            }
            return;
        }
        if !shared.limiter.try_acquire() {
            return;
        }

        for command in scheduler::periodic_commands(shared.detected) {
            // Overflow is logged by the buffer; the rest still goes out.
            let _ = shared.outgoing.push(&command);
        }
        let packet = match shared
            .outgoing
            .build_frame(self.config.product_type, self.config.protocol_version)
        {
            Ok(packet) => packet,
            Err(err) => {
                warn!(error = %err, "failed to assemble outgoing frame");
                return;
            }
        };

        trace!(len = packet.len(), detected = shared.detected, "sending frame");
        if let Err(err) = self.link.send_message(packet) {
            warn!(error = %err, "send failed");
            self.publish(LinkEvent::TransportError(err.to_string()));
        }
    }

    /// Watchdog window elapsed. No-op once `cancel` has fired.
    pub(crate) fn watchdog_fired(&self, cancel: &CancellationToken) {
        let _guard = self.lock();
        if cancel.is_cancelled() {
            return;
        }
        warn!(window = ?self.config.watchdog_timeout, "no valid header within watchdog window");
        self.publish(LinkEvent::Stale);
    }
}

impl<L: Link> Drop for Inner<L> {
    fn drop(&mut self) {
        let shared = self.shared.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = shared.session.take() {
            session.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullLink;

    impl Link for NullLink {
        fn scan(&self) -> botlink_transport::Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn connect(&self, _id: &str, _sink: MessageSink) -> botlink_transport::Result<()> {
            Ok(())
        }

        fn disconnect(&self) {}

        fn is_connected(&self) -> bool {
            false
        }

        fn send_message(&self, _packet: Bytes) -> botlink_transport::Result<()> {
            Err(TransportError::NotConnected)
        }
    }

    #[test]
    fn connect_outside_runtime_fails() {
        let engine = Engine::new(NullLink, EngineConfig::default());
        assert!(matches!(engine.connect("dev"), Err(EngineError::NoRuntime)));
    }

    #[test]
    fn delivery_without_session_is_ignored() {
        let engine = Engine::new(NullLink, EngineConfig::default());
        let blob = [
            0x0B, 0x00, 0x00, 0x00, // envelope
            0x77, 0xF9, 0x03, 0x22, 0x05, 0x00, // header
            0x43, 0x02, 0x00, 0x10, 0x02, // analog value
        ];
        assert!(engine.on_message(&blob).is_ok());
        assert!(!engine.is_detected());
    }

    #[test]
    fn malformed_delivery_is_an_error() {
        let engine = Engine::new(NullLink, EngineConfig::default());
        assert!(matches!(
            engine.on_message(&[0x01, 0x00]),
            Err(EngineError::Transport(TransportError::ShortDelivery { .. }))
        ));
    }

    #[test]
    fn queue_reports_overflow() {
        let config = EngineConfig {
            max_outgoing: 8,
            ..EngineConfig::default()
        };
        let engine = Engine::new(NullLink, config);
        assert_eq!(engine.queue(&Command::HeartBeat).unwrap(), 4);
        assert_eq!(engine.queue(&Command::HeartBeat).unwrap(), 4);
        assert!(matches!(
            engine.queue(&Command::HeartBeat),
            Err(EngineError::Content(_))
        ));
        assert_eq!(engine.pending_content(), 8);
    }
}
