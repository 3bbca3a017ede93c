//! Inbound payload decoding.
//!
//! Records are walked with a cursor. Unknown indices are skipped using their
//! declared size; a record that runs past the end of the payload stops the
//! walk.

use tracing::{debug, trace};

use crate::kind::{index_name, RecordKind, RECORD_HEADER_SIZE};
use crate::state::{DeviceState, SERVO_COUNT};

/// One raw record borrowed from a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub index: u8,
    pub body: &'a [u8],
}

impl Record<'_> {
    pub fn kind(&self) -> Option<RecordKind> {
        RecordKind::from_index(self.index)
    }
}

/// Iterator over the records of a payload.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    payload: &'a [u8],
    cursor: usize,
    truncated: bool,
}

impl Records<'_> {
    /// Whether the walk stopped on a record that ran past the payload end.
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.truncated || self.cursor >= self.payload.len() {
            return None;
        }
        let rest = &self.payload[self.cursor..];
        if rest.len() < RECORD_HEADER_SIZE {
            self.truncated = true;
            return None;
        }
        let size = u16::from_le_bytes([rest[1], rest[2]]) as usize;
        let end = RECORD_HEADER_SIZE + size;
        if rest.len() < end {
            self.truncated = true;
            return None;
        }
        self.cursor += end;
        Some(Record {
            index: rest[0],
            body: &rest[RECORD_HEADER_SIZE..end],
        })
    }
}

pub fn records(payload: &[u8]) -> Records<'_> {
    Records {
        payload,
        cursor: 0,
        truncated: false,
    }
}

/// What [`apply_payload`] did with a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Records that updated device state.
    pub applied: usize,
    /// Records skipped because their index is unknown or outbound-only.
    pub skipped: usize,
    pub truncated: bool,
}

/// Decode every record in `payload` into `state`.
pub fn apply_payload(payload: &[u8], state: &mut DeviceState) -> DecodeSummary {
    let mut summary = DecodeSummary::default();
    let mut walk = records(payload);
    for record in walk.by_ref() {
        if apply_record(&record, state) {
            summary.applied += 1;
        } else {
            summary.skipped += 1;
            trace!(
                index = record.index,
                kind = index_name(record.index),
                size = record.body.len(),
                "skipped record"
            );
        }
    }
    summary.truncated = walk.truncated();
    if summary.truncated {
        debug!(
            payload_len = payload.len(),
            applied = summary.applied,
            "payload truncated mid-record"
        );
    }
    summary
}

fn apply_record(record: &Record<'_>, state: &mut DeviceState) -> bool {
    let body = record.body;
    match record.kind() {
        Some(RecordKind::DeviceName) => {
            let chars = body.get(1..).unwrap_or_default();
            let end = chars.iter().position(|&b| b == 0).unwrap_or(chars.len());
            state.name = String::from_utf8_lossy(&chars[..end]).into_owned();
            debug!(name = %state.name, "device name");
            true
        }
        Some(RecordKind::DeviceMode) => match body.first() {
            Some(&mode) => {
                state.mode = mode;
                true
            }
            None => false,
        },
        Some(RecordKind::ServoControl) => {
            for entry in counted_entries(RecordKind::ServoControl, body) {
                let id = entry[0] as usize;
                if id < SERVO_COUNT {
                    state.servo_positions[id] = u16::from_le_bytes([entry[2], entry[3]]);
                }
            }
            true
        }
        Some(RecordKind::ServoCalibration) => {
            for entry in counted_entries(RecordKind::ServoCalibration, body) {
                let id = entry[0] as usize;
                if id < SERVO_COUNT {
                    state.servo_offsets[id] = i16::from_le_bytes([entry[1], entry[2]]);
                }
            }
            true
        }
        Some(RecordKind::AnalogValue) => match read_u16(body) {
            Some(value) => {
                state.analog = value;
                true
            }
            None => false,
        },
        Some(RecordKind::UltrasonicDistance) => match read_u16(body) {
            Some(value) => {
                state.distance = value;
                true
            }
            None => false,
        },
        Some(RecordKind::ButtonControl) => match body {
            [first, second, ..] => {
                state.buttons = [*first, *second];
                true
            }
            _ => false,
        },
        _ => false,
    }
}

/// Entries of a counted body, split at the kind's stride. Entries that would
/// run past the body are dropped.
fn counted_entries(kind: RecordKind, body: &[u8]) -> impl Iterator<Item = &[u8]> {
    let stride = kind.layout().stride;
    let (count, entries) = match body.split_first() {
        Some((&count, entries)) => (count as usize, entries),
        None => (0, body),
    };
    entries.chunks_exact(stride).take(count)
}

fn read_u16(body: &[u8]) -> Option<u16> {
    match body {
        [lo, hi, ..] => Some(u16::from_le_bytes([*lo, *hi])),
        _ => None,
    }
}
