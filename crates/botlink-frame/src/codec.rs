use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Header: checksum (1) + payload checksum (1) + product (1) + version (1) + length (2).
pub const HEADER_SIZE: usize = 6;

/// Seed value of both checksum bytes.
pub const SYNC: u8 = 0xAA;

/// Default product type (toy robot).
pub const PRODUCT_TYPE: u8 = 0x03;

/// Default protocol version (2.2).
pub const PROTOCOL_VERSION: u8 = 0x22;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// One complete, header-validated frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw header bytes as received.
    pub header: [u8; HEADER_SIZE],
    /// The content records carried by this frame.
    pub payload: Bytes,
}

impl Frame {
    /// Build a frame around `payload`, computing both checksum bytes.
    pub fn new(product_type: u8, protocol_version: u8, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        let header = build_header(product_type, protocol_version, &payload)?;
        Ok(Self { header, payload })
    }

    pub fn product_type(&self) -> u8 {
        self.header[2]
    }

    pub fn protocol_version(&self) -> u8 {
        self.header[3]
    }

    /// Payload length declared in the header.
    pub fn content_length(&self) -> usize {
        content_length(&self.header)
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Whether header byte 1 matches the fold over the payload.
    pub fn payload_checksum_ok(&self) -> bool {
        fold(SYNC, &self.payload) == self.header[1]
    }

    /// Serialize back to wire bytes.
    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        dst.put_slice(&self.header);
        dst.put_slice(&self.payload);
        dst.freeze()
    }
}

/// XOR-fold `bytes` into `seed`.
pub fn fold(seed: u8, bytes: &[u8]) -> u8 {
    bytes.iter().fold(seed, |acc, b| acc ^ b)
}

/// Whether the first 6 bytes of `bytes` form a valid header.
///
/// Only the header checksum (byte 0) is checked. Returns false when fewer than
/// 6 bytes are available.
pub fn header_is_valid(bytes: &[u8]) -> bool {
    bytes.len() >= HEADER_SIZE && fold(SYNC, &bytes[1..HEADER_SIZE]) == bytes[0]
}

/// Payload length declared by a header.
pub(crate) fn content_length(header: &[u8]) -> usize {
    u16::from_le_bytes([header[4], header[5]]) as usize
}

/// Check a complete wire frame: header checksum, declared length, and payload checksum.
///
/// Changing any single byte other than byte 0 makes this return false.
pub fn verify_frame(bytes: &[u8]) -> bool {
    if !header_is_valid(bytes) {
        return false;
    }
    let payload = &bytes[HEADER_SIZE..];
    payload.len() == content_length(bytes) && fold(SYNC, payload) == bytes[1]
}

fn build_header(product_type: u8, protocol_version: u8, payload: &[u8]) -> Result<[u8; HEADER_SIZE]> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    let len = (payload.len() as u16).to_le_bytes();
    let mut header = [SYNC, SYNC, product_type, protocol_version, len[0], len[1]];
    // Payload folds into byte 1 first; byte 0 then covers the finished bytes 1..6.
    header[1] = fold(header[1], payload);
    header[0] = fold(header[0], &header[1..HEADER_SIZE]);
    Ok(header)
}

/// Encode a frame into the wire format, appending to `dst`.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────┬─────────┬─────────┬───────────┬─────────────────┐
/// │ Hdr sum  │ Pay sum  │ Product │ Version │ Length    │ Payload         │
/// │ (1B)     │ (1B)     │ (1B)    │ (1B)    │ (2B LE)   │ (Length bytes)  │
/// └──────────┴──────────┴─────────┴─────────┴───────────┴─────────────────┘
/// ```
pub fn encode_frame(
    product_type: u8,
    protocol_version: u8,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    let header = build_header(product_type, protocol_version, payload)?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&header);
    dst.put_slice(payload);
    Ok(())
}
