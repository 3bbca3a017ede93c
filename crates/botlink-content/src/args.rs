//! Conversions from user-facing command arguments to wire values.
//!
//! Every conversion rejects NaN and infinities with
//! [`ArgumentError::NotFinite`] and clamps everything else into the field's
//! range.

use crate::command::Rgb;
use crate::error::ArgumentError;

/// Octave base for low notes (4th octave).
pub const OCTAVE_LOW: u8 = 0x40;
/// Octave base for middle notes (5th octave).
pub const OCTAVE_MIDDLE: u8 = 0x50;
/// Octave base for high notes (6th octave).
pub const OCTAVE_HIGH: u8 = 0x60;

/// Pitch value meaning "rest".
pub const REST: i32 = -1;

/// Largest servo angle in degrees.
pub const SERVO_ANGLE_MAX: f64 = 180.0;

/// Largest PWM duty value.
pub const PWM_MAX: u16 = 1023;

/// Fails unless `value` is finite.
pub fn finite(field: &'static str, value: f64) -> Result<f64, ArgumentError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ArgumentError::NotFinite { field })
    }
}

/// Round and clamp to a byte.
pub fn to_u8(field: &'static str, value: f64) -> Result<u8, ArgumentError> {
    Ok(finite(field, value)?.round().clamp(0.0, 255.0) as u8)
}

/// Servo angle in degrees to position in tenths of a degree.
///
/// The angle is clamped to `0..=180`, so 90 gives 900, -10 gives 0 and 999
/// gives 1800.
pub fn angle_to_position(angle: f64) -> Result<u16, ArgumentError> {
    let angle = finite("angle", angle)?.clamp(0.0, SERVO_ANGLE_MAX);
    Ok((angle * 10.0).round() as u16)
}

/// LED channel percentage (0..=100) to a byte.
pub fn percent_to_channel(field: &'static str, percent: f64) -> Result<u8, ArgumentError> {
    Ok((finite(field, percent)? * 2.55).round().clamp(0.0, 255.0) as u8)
}

/// Analog output percentage (0..=100) to a PWM duty value.
pub fn percent_to_pwm(percent: f64) -> Result<u16, ArgumentError> {
    let duty = (finite("percent", percent)? * 10.23).round();
    Ok(duty.clamp(0.0, f64::from(PWM_MAX)) as u16)
}

/// DC motor speed step (1..=5) times direction to a signed wire speed.
pub fn dc_speed(speed: f64, direction: Direction) -> Result<i16, ArgumentError> {
    let speed = finite("speed", speed)?.round().clamp(0.0, 5.0);
    Ok((speed * 51.0) as i16 * direction.sign())
}

/// Encode a note pitch byte.
///
/// `pitch` is 1..=12 within `octave`, or [`REST`]. A flat on the first note
/// wraps to the previous octave and a sharp on the twelfth to the next one.
pub fn note_pitch(octave: u8, pitch: i32, accidental: i32) -> Result<u8, ArgumentError> {
    if pitch == REST {
        return Ok(0);
    }
    if !(1..=12).contains(&pitch) {
        return Err(ArgumentError::OutOfRange {
            field: "pitch",
            value: i64::from(pitch),
        });
    }
    if !(-1..=1).contains(&accidental) {
        return Err(ArgumentError::OutOfRange {
            field: "accidental",
            value: i64::from(accidental),
        });
    }
    let encoded = match pitch + accidental {
        0 => octave.wrapping_sub(0x10) | 12,
        13 => octave.wrapping_add(0x10) | 1,
        tone => octave | tone as u8,
    };
    Ok(encoded)
}

/// Named LED colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedColor {
    Off,
    White,
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Navy,
    Violet,
}

impl LedColor {
    pub const ALL: [LedColor; 9] = [
        LedColor::Off,
        LedColor::White,
        LedColor::Red,
        LedColor::Orange,
        LedColor::Yellow,
        LedColor::Green,
        LedColor::Blue,
        LedColor::Navy,
        LedColor::Violet,
    ];

    pub const fn rgb(self) -> Rgb {
        let (r, g, b) = match self {
            LedColor::Off => (0x00, 0x00, 0x00),
            LedColor::White => (0xFF, 0xFF, 0xFF),
            LedColor::Red => (0xFF, 0x00, 0x00),
            LedColor::Orange => (0xFF, 0x80, 0x00),
            LedColor::Yellow => (0xFF, 0xFF, 0x00),
            LedColor::Green => (0x00, 0xFF, 0x00),
            LedColor::Blue => (0x00, 0x00, 0xFF),
            LedColor::Navy => (0x00, 0x00, 0x80),
            LedColor::Violet => (0x7F, 0x00, 0xFF),
        };
        Rgb { r, g, b }
    }

    pub fn name(self) -> &'static str {
        match self {
            LedColor::Off => "off",
            LedColor::White => "white",
            LedColor::Red => "red",
            LedColor::Orange => "orange",
            LedColor::Yellow => "yellow",
            LedColor::Green => "green",
            LedColor::Blue => "blue",
            LedColor::Navy => "navy",
            LedColor::Violet => "violet",
        }
    }
}

impl std::str::FromStr for LedColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|color| color.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown LED color: {s}"))
    }
}

/// DC motor rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
    Stop,
}

impl Direction {
    pub const fn sign(self) -> i16 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
            Direction::Stop => 0,
        }
    }
}
