use bytes::{BufMut, BytesMut};

use crate::args::{self, Direction};
use crate::error::ArgumentError;
use crate::kind::{RecordKind, RECORD_HEADER_SIZE};

/// Ask the device to report a record kind `repeat` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnRequest {
    pub kind: RecordKind,
    pub repeat: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoTarget {
    pub id: u8,
    pub speed: u8,
    /// Tenths of a degree.
    pub position: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoOffset {
    pub id: u8,
    pub offset: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DcSpeed {
    pub id: u8,
    pub speed: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    /// Beat byte. 0 holds the pitch until the next score record.
    pub beat: u8,
    /// Encoded pitch (octave | tone), 0 for a rest.
    pub pitch: u8,
}

impl Note {
    /// Silence queued after every note.
    pub const REST: Note = Note { beat: 11, pitch: 0 };
}

/// One outgoing content record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ReturnRequest(Vec<ReturnRequest>),
    DeviceMode(u8),
    ServoControl(Vec<ServoTarget>),
    ServoCalibration(Vec<ServoOffset>),
    DcControl(Vec<DcSpeed>),
    Pwm(u16),
    Led(Rgb),
    MelodyScore(Vec<Note>),
    MelodyPlayList { title: u8, play: u8 },
    HeartBeat,
}

impl Command {
    pub fn kind(&self) -> RecordKind {
        match self {
            Command::ReturnRequest(_) => RecordKind::ReturnRequest,
            Command::DeviceMode(_) => RecordKind::DeviceMode,
            Command::ServoControl(_) => RecordKind::ServoControl,
            Command::ServoCalibration(_) => RecordKind::ServoCalibration,
            Command::DcControl(_) => RecordKind::DcControl,
            Command::Pwm(_) => RecordKind::PwmControl,
            Command::Led(_) => RecordKind::LedControl,
            Command::MelodyScore(_) => RecordKind::MelodyScore,
            Command::MelodyPlayList { .. } => RecordKind::MelodyPlayList,
            Command::HeartBeat => RecordKind::HeartBeat,
        }
    }

    pub fn item_count(&self) -> usize {
        match self {
            Command::ReturnRequest(items) => items.len(),
            Command::ServoControl(items) => items.len(),
            Command::ServoCalibration(items) => items.len(),
            Command::DcControl(items) => items.len(),
            Command::MelodyScore(items) => items.len(),
            _ => 1,
        }
    }

    /// Whether the item count fits the count byte and the body fits the
    /// 16-bit size field.
    pub fn fits_record(&self) -> bool {
        let kind = self.kind();
        let items = self.item_count();
        (!kind.layout().counted || items <= usize::from(u8::MAX))
            && kind.body_size(items) <= usize::from(u16::MAX)
    }

    /// Bytes this record occupies on the wire. 0 when it has no items or does
    /// not fit a record.
    pub fn encoded_len(&self) -> usize {
        match self.item_count() {
            0 => 0,
            _ if !self.fits_record() => 0,
            items => RECORD_HEADER_SIZE + self.kind().body_size(items),
        }
    }

    /// Append the record to `dst`. Returns the number of bytes written; a
    /// command that [`encoded_len`] rejects writes nothing.
    ///
    /// [`encoded_len`]: Command::encoded_len
    pub fn encode(&self, dst: &mut BytesMut) -> usize {
        let len = self.encoded_len();
        if len == 0 {
            return 0;
        }
        let items = self.item_count();
        let kind = self.kind();
        dst.reserve(len);
        dst.put_u8(kind.index());
        dst.put_u16_le(kind.body_size(items) as u16);
        if kind.layout().counted {
            dst.put_u8(items as u8);
        }

        match self {
            Command::ReturnRequest(requests) => {
                for request in requests {
                    dst.put_u8(request.kind.index());
                    dst.put_u8(request.repeat);
                }
            }
            Command::DeviceMode(mode) => dst.put_u8(*mode),
            Command::ServoControl(targets) => {
                for target in targets {
                    dst.put_u8(target.id);
                    dst.put_u8(target.speed);
                    dst.put_u16_le(target.position);
                }
            }
            Command::ServoCalibration(offsets) => {
                for offset in offsets {
                    dst.put_u8(offset.id);
                    dst.put_i16_le(offset.offset);
                }
            }
            Command::DcControl(motors) => {
                for motor in motors {
                    dst.put_u8(motor.id);
                    dst.put_i16_le(motor.speed);
                }
            }
            Command::Pwm(duty) => dst.put_u16_le(*duty),
            Command::Led(rgb) => {
                dst.put_u8(rgb.r);
                dst.put_u8(rgb.g);
                dst.put_u8(rgb.b);
            }
            Command::MelodyScore(notes) => {
                for note in notes {
                    dst.put_u8(note.beat);
                    dst.put_u8(note.pitch);
                }
            }
            Command::MelodyPlayList { title, play } => {
                dst.put_u8(*title);
                dst.put_u8(*play);
            }
            Command::HeartBeat => dst.put_u8(1),
        }
        len
    }

    /// Move one servo to `angle` degrees.
    pub fn servo_angle(id: u8, speed: f64, angle: f64) -> Result<Self, ArgumentError> {
        Ok(Command::ServoControl(vec![ServoTarget {
            id,
            speed: args::to_u8("speed", speed)?,
            position: args::angle_to_position(angle)?,
        }]))
    }

    /// Move every servo at once; `angles[i]` drives servo `i`.
    pub fn servo_all(speed: f64, angles: &[f64]) -> Result<Self, ArgumentError> {
        let speed = args::to_u8("speed", speed)?;
        let targets = angles
            .iter()
            .enumerate()
            .map(|(id, &angle)| {
                Ok(ServoTarget {
                    id: id as u8,
                    speed,
                    position: args::angle_to_position(angle)?,
                })
            })
            .collect::<Result<Vec<_>, ArgumentError>>()?;
        Ok(Command::ServoControl(targets))
    }

    /// LED color from channel percentages.
    pub fn led_percent(red: f64, green: f64, blue: f64) -> Result<Self, ArgumentError> {
        Ok(Command::Led(Rgb {
            r: args::percent_to_channel("red", red)?,
            g: args::percent_to_channel("green", green)?,
            b: args::percent_to_channel("blue", blue)?,
        }))
    }

    pub fn analog_output(percent: f64) -> Result<Self, ArgumentError> {
        Ok(Command::Pwm(args::percent_to_pwm(percent)?))
    }

    /// Drive the listed DC motors at the same speed.
    pub fn dc_motor(ids: &[u8], speed: f64, direction: Direction) -> Result<Self, ArgumentError> {
        let speed = args::dc_speed(speed, direction)?;
        Ok(Command::DcControl(
            ids.iter().map(|&id| DcSpeed { id, speed }).collect(),
        ))
    }

    /// Start one note. The device holds it until the next score record, so
    /// the beat byte is 0 and the caller times the note and queues [`Note::REST`].
    pub fn note(octave: u8, pitch: i32, accidental: i32) -> Result<Self, ArgumentError> {
        Ok(Command::MelodyScore(vec![Note {
            beat: 0,
            pitch: args::note_pitch(octave, pitch, accidental)?,
        }]))
    }

    pub fn play_list(title: u8) -> Self {
        Command::MelodyPlayList { title, play: 1 }
    }
}
