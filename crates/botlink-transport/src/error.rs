use std::path::PathBuf;

/// Errors that can occur at the transport boundary.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the requested device or bridge.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to enumerate candidate devices.
    #[error("failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An operation required a live connection.
    #[error("link is not connected")]
    NotConnected,

    /// The link was closed while a packet was being handed over.
    #[error("link closed")]
    Closed,

    /// An inbound delivery is too short to hold its length prefix.
    #[error("delivery too short ({len} bytes, need at least {min})")]
    ShortDelivery { len: usize, min: usize },

    /// An inbound delivery declares more content than it carries.
    #[error("delivery truncated (declared {declared} bytes, {available} available)")]
    TruncatedDelivery { declared: usize, available: usize },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
