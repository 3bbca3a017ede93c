/// Errors that can occur during frame buffering and encoding.
///
/// Checksum mismatches are not errors: the parser recovers from them by
/// discarding bytes until the stream resynchronizes.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Appending would grow the receive buffer past its fixed capacity.
    #[error("receive buffer capacity exceeded ({len} buffered + {incoming} incoming > {capacity})")]
    CapacityExceeded {
        len: usize,
        incoming: usize,
        capacity: usize,
    },

    /// The payload does not fit the 16-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
