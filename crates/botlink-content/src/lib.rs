//! Content records carried inside botlink frames.
//!
//! A frame payload is a sequence of self-delimited records:
//! - a 1-byte index naming the record kind
//! - a 2-byte little-endian size (body length)
//! - the body, starting with an item count for counted kinds
//!
//! Outgoing [`Command`]s are encoded into an [`OutgoingBuffer`] and flushed as
//! one frame; inbound payloads are decoded into a [`DeviceState`]. Both sides
//! consult the same [`RecordKind`] table.

pub mod args;
pub mod command;
pub mod decode;
pub mod error;
pub mod kind;
pub mod outgoing;
pub mod state;

pub use args::{Direction, LedColor};
pub use command::{Command, DcSpeed, Note, ReturnRequest, Rgb, ServoOffset, ServoTarget};
pub use decode::{apply_payload, records, DecodeSummary, Record, Records};
pub use error::{ArgumentError, ContentError, Result};
pub use kind::{Layout, RecordKind, RECORD_HEADER_SIZE};
pub use outgoing::{OutgoingBuffer, DEFAULT_MAX_CONTENT};
pub use state::{DeviceState, SERVO_COUNT, SERVO_NEUTRAL};
