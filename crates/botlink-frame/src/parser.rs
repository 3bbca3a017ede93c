use tracing::{debug, trace};

use crate::codec::{content_length, header_is_valid, Frame, HEADER_SIZE};
use crate::error::Result;
use crate::ring::ByteRing;

/// Default receive buffer capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 256;

/// Configuration for the frame parser.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Fixed receive buffer capacity. Default: 256 bytes.
    pub capacity: usize,
    /// Drop extracted frames whose payload checksum (header byte 1) does not
    /// match. Default: false; only the header checksum gates extraction.
    pub verify_payload: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            verify_payload: false,
        }
    }
}

/// What one drain pass produced.
#[derive(Debug, Default)]
pub struct Parsed {
    /// Complete frames, in stream order.
    pub frames: Vec<Frame>,
    /// Valid headers seen, including one whose frame is still incomplete.
    pub headers: usize,
    /// Bytes discarded while resynchronizing.
    pub discarded: usize,
    /// Extracted frames dropped by payload verification.
    pub rejected: usize,
}

impl Parsed {
    /// Whether at least one structurally valid header was seen.
    pub fn saw_valid_header(&self) -> bool {
        self.headers > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Looking for a header whose checksum matches.
    Seeking,
    /// Header accepted; waiting until `total` bytes are buffered.
    Draining { total: usize },
}

/// Resynchronizing frame parser over a fixed-capacity receive buffer.
///
/// Feed it arbitrary chunks with [`push`]; it returns every frame completed
/// so far. The sequence of frames does not depend on how the stream was
/// chunked.
///
/// [`push`]: FrameParser::push
#[derive(Debug)]
pub struct FrameParser {
    ring: ByteRing,
    config: ParserConfig,
    state: State,
}

impl FrameParser {
    /// Create a parser with default configuration.
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    /// Create a parser with explicit configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            ring: ByteRing::with_capacity(config.capacity),
            config,
            state: State::Seeking,
        }
    }

    /// Append `bytes` and extract every complete frame.
    ///
    /// Fails only when the bytes do not fit the receive buffer; in that case
    /// nothing is appended and no frames are extracted.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Parsed> {
        self.ring.append(bytes)?;
        Ok(self.drain())
    }

    /// Extract every complete frame already buffered.
    pub fn drain(&mut self) -> Parsed {
        let mut parsed = Parsed::default();

        while self.ring.len() > HEADER_SIZE {
            match self.state {
                State::Seeking => {
                    let buf = self.ring.as_slice();
                    let total = HEADER_SIZE + content_length(buf);
                    if !header_is_valid(buf) || total > self.ring.capacity() {
                        trace!(byte = buf[0], "resync: discarding byte");
                        self.ring.consume(1);
                        parsed.discarded += 1;
                        continue;
                    }
                    parsed.headers += 1;
                    self.state = State::Draining { total };
                }
                State::Draining { total } => {
                    if self.ring.len() < total {
                        break;
                    }
                    self.state = State::Seeking;

                    let mut bytes = self.ring.split_to(total);
                    let payload = bytes.split_off(HEADER_SIZE).freeze();
                    let mut header = [0u8; HEADER_SIZE];
                    header.copy_from_slice(&bytes);
                    let frame = Frame { header, payload };

                    if self.config.verify_payload && !frame.payload_checksum_ok() {
                        debug!(len = frame.payload.len(), "dropping frame with bad payload checksum");
                        parsed.rejected += 1;
                        continue;
                    }
                    parsed.frames.push(frame);
                }
            }
        }

        if parsed.discarded > 0 {
            debug!(discarded = parsed.discarded, "resynchronized receive stream");
        }
        parsed
    }

    /// Drop all buffered bytes and return to seeking.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.state = State::Seeking;
    }

    /// Bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    /// The receive buffer.
    pub fn ring(&self) -> &ByteRing {
        &self.ring
    }

    /// Current parser configuration.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}
