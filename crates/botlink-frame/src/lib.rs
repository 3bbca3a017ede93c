//! Device framing with streaming reassembly.
//!
//! Every packet exchanged with the device is framed with a 6-byte header:
//! - byte 0: header checksum (`0xAA` folded with bytes 1..6)
//! - byte 1: payload checksum (`0xAA` folded with every payload byte)
//! - byte 2: product type
//! - byte 3: protocol version
//! - bytes 4..6: payload length, u16 little-endian
//!
//! Inbound bytes accumulate in a fixed-capacity [`ByteRing`]; the
//! [`FrameParser`] resynchronizes one byte at a time past corrupt headers and
//! waits for partial frames to complete.

pub mod codec;
pub mod error;
pub mod parser;
pub mod ring;

pub use codec::{
    encode_frame, fold, header_is_valid, verify_frame, Frame, HEADER_SIZE, MAX_PAYLOAD,
    PROTOCOL_VERSION, PRODUCT_TYPE, SYNC,
};
pub use error::{FrameError, Result};
pub use parser::{FrameParser, Parsed, ParserConfig, DEFAULT_CAPACITY};
pub use ring::ByteRing;
