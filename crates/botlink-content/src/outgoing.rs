use botlink_frame::{encode_frame, HEADER_SIZE, MAX_PAYLOAD};
use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use crate::command::Command;
use crate::error::{ContentError, Result};

/// Default cap on buffered outgoing content.
pub const DEFAULT_MAX_CONTENT: usize = 1024;

/// Records queued for the next outgoing frame.
#[derive(Debug)]
pub struct OutgoingBuffer {
    content: BytesMut,
    max: usize,
}

impl OutgoingBuffer {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_CONTENT)
    }

    /// Limit is capped at the largest payload a frame can carry.
    pub fn with_limit(max: usize) -> Self {
        let max = max.min(MAX_PAYLOAD);
        Self {
            content: BytesMut::with_capacity(max.min(DEFAULT_MAX_CONTENT)),
            max,
        }
    }

    /// Append one record.
    ///
    /// Returns the bytes written, which is 0 for a command with no items.
    /// A record that would overflow the buffer is not written.
    pub fn push(&mut self, command: &Command) -> Result<usize> {
        let record = command.encoded_len();
        if !command.fits_record() {
            warn!(
                kind = command.kind().name(),
                items = command.item_count(),
                "record too large, dropping"
            );
            return Err(ContentError::RecordTooLarge {
                kind: command.kind().name(),
                items: command.item_count(),
            });
        }
        if record == 0 {
            debug!(kind = command.kind().name(), "empty command, nothing queued");
            return Ok(0);
        }
        if self.content.len() + record > self.max {
            warn!(
                kind = command.kind().name(),
                buffered = self.content.len(),
                record,
                max = self.max,
                "outgoing content full, dropping record"
            );
            return Err(ContentError::OutgoingFull {
                len: self.content.len(),
                record,
                max: self.max,
            });
        }
        Ok(command.encode(&mut self.content))
    }

    /// Frame the buffered records and clear the buffer.
    pub fn build_frame(&mut self, product_type: u8, protocol_version: u8) -> Result<Bytes> {
        let mut frame = BytesMut::with_capacity(HEADER_SIZE + self.content.len());
        let built = encode_frame(product_type, protocol_version, &self.content, &mut frame);
        self.content.clear();
        built?;
        Ok(frame.freeze())
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.max
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.content
    }

    pub fn clear(&mut self) {
        self.content.clear();
    }
}

impl Default for OutgoingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{ReturnRequest, ServoTarget};
    use crate::decode::apply_payload;
    use crate::kind::RecordKind;
    use crate::state::DeviceState;
    use botlink_frame::{verify_frame, FrameParser, PRODUCT_TYPE, PROTOCOL_VERSION};

    #[test]
    fn build_frame_clears_buffer() {
        let mut out = OutgoingBuffer::new();
        out.push(&Command::HeartBeat).unwrap();
        assert_eq!(out.len(), 4);

        let frame = out.build_frame(PRODUCT_TYPE, PROTOCOL_VERSION).unwrap();
        assert!(out.is_empty());
        assert!(verify_frame(&frame));
        assert_eq!(&frame[2..6], &[0x03, 0x22, 0x04, 0x00]);
        assert_eq!(&frame[HEADER_SIZE..], &[0xFF, 0x01, 0x00, 0x01]);
    }

    #[test]
    fn empty_buffer_builds_header_only_frame() {
        let mut out = OutgoingBuffer::new();
        out.push(&Command::DcControl(Vec::new())).unwrap();
        let frame = out.build_frame(PRODUCT_TYPE, PROTOCOL_VERSION).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE);
        assert!(verify_frame(&frame));
    }

    #[test]
    fn overflowing_record_is_dropped() {
        let mut out = OutgoingBuffer::with_limit(10);
        out.push(&Command::Led(Default::default())).unwrap();
        let err = out.push(&Command::Led(Default::default())).unwrap_err();
        assert!(matches!(
            err,
            ContentError::OutgoingFull { len: 6, record: 6, max: 10 }
        ));
        assert_eq!(out.len(), 6);
        out.push(&Command::HeartBeat).unwrap();
        assert_eq!(out.len(), 10);
    }

    #[test]
    fn oversized_record_is_rejected() {
        let mut out = OutgoingBuffer::new();
        let targets = vec![ServoTarget { id: 1, speed: 2, position: 900 }; 300];
        let err = out.push(&Command::ServoControl(targets)).unwrap_err();
        assert!(matches!(
            err,
            ContentError::RecordTooLarge { kind: "servo-control", items: 300 }
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn encode_frame_parse_decode_round_trip() {
        let mut out = OutgoingBuffer::new();
        out.push(&Command::ReturnRequest(vec![ReturnRequest {
            kind: RecordKind::ServoControl,
            repeat: 2,
        }]))
        .unwrap();
        out.push(&Command::ServoControl(vec![
            ServoTarget { id: 1, speed: 2, position: 1234 },
            ServoTarget { id: 3, speed: 2, position: 0 },
        ]))
        .unwrap();
        out.push(&Command::HeartBeat).unwrap();
        let wire = out.build_frame(PRODUCT_TYPE, PROTOCOL_VERSION).unwrap();

        let mut parser = FrameParser::new();
        let frames = parser.push(&wire).unwrap().frames;
        assert_eq!(frames.len(), 1);

        let mut state = DeviceState::default();
        let summary = apply_payload(&frames[0].payload, &mut state);
        assert!(!summary.truncated);
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(state.servo_positions, [900, 1234, 900, 0, 900]);
    }
}
