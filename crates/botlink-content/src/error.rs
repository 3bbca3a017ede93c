/// A command argument that cannot be encoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    /// The value is NaN or infinite.
    #[error("{field} is not a finite number")]
    NotFinite { field: &'static str },

    /// The value names an entry outside the allowed set.
    #[error("{field} value {value} is out of range")]
    OutOfRange { field: &'static str, value: i64 },
}

/// Errors that can occur while building outgoing content.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// The record does not fit the outgoing buffer.
    #[error("outgoing content full ({len} buffered + {record} record > {max})")]
    OutgoingFull {
        len: usize,
        record: usize,
        max: usize,
    },

    /// The record's item count or body does not fit its header fields.
    #[error("{kind} record with {items} items does not fit a record")]
    RecordTooLarge { kind: &'static str, items: usize },

    /// Frame assembly failed.
    #[error("frame error: {0}")]
    Frame(#[from] botlink_frame::FrameError),
}

pub type Result<T> = std::result::Result<T, ContentError>;
