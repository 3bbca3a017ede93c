//! Transport boundary for the botlink protocol engine.
//!
//! The engine never performs I/O itself. It talks to a [`Link`], which owns
//! connection management and byte delivery:
//! - outbound packets are handed to [`Link::send_message`] (non-blocking)
//! - inbound deliveries arrive through a [`MessageSink`] as length-prefixed
//!   envelopes, unwrapped with [`unwrap_delivery`]
//!
//! With the `bridge` feature, [`BridgeLink`] connects to a serial bridge
//! exposed as a Unix domain socket.

pub mod envelope;
pub mod error;
pub mod link;

#[cfg(all(unix, feature = "bridge"))]
pub mod bridge;

pub use envelope::{unwrap_delivery, wrap_delivery, ENVELOPE_HEADER_SIZE};
pub use error::{Result, TransportError};
pub use link::{Link, MessageSink};

#[cfg(all(unix, feature = "bridge"))]
pub use bridge::BridgeLink;
