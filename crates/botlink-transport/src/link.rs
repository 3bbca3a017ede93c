use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;

/// Callback invoked for every inbound delivery (still wrapped in its envelope).
pub type MessageSink = Arc<dyn Fn(Bytes) + Send + Sync>;

/// A byte transport to one device.
///
/// Implementations must not block: `send_message` enqueues the packet and
/// returns, and inbound bytes are pushed to the sink registered at connect
/// time from whatever task or thread the transport runs on.
pub trait Link: Send + Sync + 'static {
    /// List identifiers of devices that `connect` can reach.
    fn scan(&self) -> Result<Vec<String>>;

    /// Connect to the device `id`, delivering inbound envelopes to `sink`.
    fn connect(&self, id: &str, sink: MessageSink) -> Result<()>;

    /// Drop the current connection. Idempotent.
    fn disconnect(&self);

    /// Whether the link currently has a live connection.
    fn is_connected(&self) -> bool;

    /// Hand one outbound packet to the transport.
    fn send_message(&self, packet: Bytes) -> Result<()>;
}

impl<L: Link + ?Sized> Link for Arc<L> {
    fn scan(&self) -> Result<Vec<String>> {
        (**self).scan()
    }

    fn connect(&self, id: &str, sink: MessageSink) -> Result<()> {
        (**self).connect(id, sink)
    }

    fn disconnect(&self) {
        (**self).disconnect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn send_message(&self, packet: Bytes) -> Result<()> {
        (**self).send_message(packet)
    }
}
