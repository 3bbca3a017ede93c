use bytes::{BufMut, BytesMut};

use crate::error::{Result, TransportError};

/// Envelope prefix: content length as u32 little-endian.
pub const ENVELOPE_HEADER_SIZE: usize = 4;

/// Strip the envelope from an inbound delivery.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────────┐
/// │ Length (4B)  │ Content          │
/// │ u32 LE       │ (Length bytes)   │
/// └──────────────┴──────────────────┘
/// ```
///
/// Bytes past the declared length are ignored.
pub fn unwrap_delivery(blob: &[u8]) -> Result<&[u8]> {
    if blob.len() < ENVELOPE_HEADER_SIZE {
        return Err(TransportError::ShortDelivery {
            len: blob.len(),
            min: ENVELOPE_HEADER_SIZE,
        });
    }

    let declared = u32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]) as usize;
    let content = &blob[ENVELOPE_HEADER_SIZE..];
    if declared > content.len() {
        return Err(TransportError::TruncatedDelivery {
            declared,
            available: content.len(),
        });
    }

    Ok(&content[..declared])
}

/// Wrap content in an envelope, appending to `dst`.
pub fn wrap_delivery(content: &[u8], dst: &mut BytesMut) {
    dst.reserve(ENVELOPE_HEADER_SIZE + content.len());
    dst.put_u32_le(content.len() as u32);
    dst.put_slice(content);
}
