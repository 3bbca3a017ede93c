/// Link-level notifications published to [`Engine::subscribe`] receivers.
///
/// [`Engine::subscribe`]: crate::Engine::subscribe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// First valid header of the session.
    Detected,
    /// No valid header for a whole watchdog window.
    Stale,
    /// The receive accumulator overflowed and was cleared.
    Overflow { capacity: usize },
    /// The link refused an outgoing packet.
    TransportError(String),
}

/// Capacity of the event channel; slow receivers see `Lagged`.
pub(crate) const EVENT_CAPACITY: usize = 64;
