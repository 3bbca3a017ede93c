//! Application-facing device commands.
//!
//! Every command queues its record for the next outgoing frame and then waits
//! for the configured command delay. Invalid arguments skip the record and are
//! logged at debug; they are never returned.

use std::time::Duration;

use botlink_content::args;
use botlink_content::{
    ArgumentError, Command, Direction, LedColor, Note, ServoOffset, ServoTarget, SERVO_COUNT,
    SERVO_NEUTRAL,
};
use botlink_transport::Link;
use tracing::debug;

use crate::engine::Engine;

/// Which DC motor a command drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DcSelect {
    First,
    Second,
    Both,
}

impl DcSelect {
    fn ids(self) -> &'static [u8] {
        match self {
            DcSelect::First => &[0],
            DcSelect::Second => &[1],
            DcSelect::Both => &[0, 1],
        }
    }
}

/// Which servo a calibration command applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoSelect {
    /// Servo 0..=4.
    Servo(u8),
    All,
}

impl<L: Link> Engine<L> {
    async fn submit(&self, command: Result<Command, ArgumentError>) {
        match command {
            Ok(command) => {
                // A full outgoing buffer is already logged by the buffer.
                let _ = self.queue(&command);
            }
            Err(err) => debug!(error = %err, "command skipped"),
        }
        tokio::time::sleep(self.config().command_delay).await;
    }

    pub async fn set_led_color(&self, color: LedColor) {
        self.submit(Ok(Command::Led(color.rgb()))).await
    }

    /// LED color from channel percentages (0..=100).
    pub async fn set_led_rgb(&self, red: f64, green: f64, blue: f64) {
        self.submit(Command::led_percent(red, green, blue)).await
    }

    /// Play one note, then a short rest once `beat_ms` has elapsed.
    ///
    /// `octave` is one of the `args::OCTAVE_*` bases, `pitch` is 1..=12 or
    /// `args::REST`, and `accidental` is -1 (flat), 0 or 1 (sharp).
    pub async fn play_note(&self, beat_ms: u32, octave: u8, pitch: i32, accidental: i32) {
        match Command::note(octave, pitch, accidental) {
            Ok(command) => {
                let _ = self.queue(&command);
            }
            Err(err) => {
                debug!(error = %err, "note skipped");
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(u64::from(beat_ms))).await;
        let _ = self.queue(&Command::MelodyScore(vec![Note::REST]));
    }

    pub async fn play_sound_effect(&self, effect: u8) {
        self.submit(Ok(Command::play_list(effect))).await
    }

    pub async fn play_melody(&self, melody: u8) {
        self.submit(Ok(Command::play_list(melody))).await
    }

    /// Move servo `id` to `angle` degrees (clamped to 0..=180).
    pub async fn set_servo_angle(&self, id: u8, speed: f64, angle: f64) {
        self.submit(Command::servo_angle(id, speed, angle)).await
    }

    pub async fn set_servo_all(&self, speed: f64, angles: [f64; SERVO_COUNT]) {
        self.submit(Command::servo_all(speed, &angles)).await
    }

    /// Move every servo to the neutral position.
    pub async fn set_servo_home(&self, speed: f64) {
        let command = args::to_u8("speed", speed).map(|speed| {
            Command::ServoControl(
                (0..SERVO_COUNT as u8)
                    .map(|id| ServoTarget {
                        id,
                        speed,
                        position: SERVO_NEUTRAL,
                    })
                    .collect(),
            )
        });
        self.submit(command).await
    }

    /// PWM output from a percentage (0..=100).
    pub async fn set_analog_output(&self, percent: f64) {
        self.submit(Command::analog_output(percent)).await
    }

    /// Run DC motors at speed step 1..=5.
    pub async fn set_dc_motor(&self, select: DcSelect, speed: f64, direction: Direction) {
        self.submit(Command::dc_motor(select.ids(), speed, direction)).await
    }

    /// Store the current servo positions as the neutral calibration.
    ///
    /// The new offset is the reported position minus neutral plus the
    /// current offset.
    pub async fn set_servo_offset(&self, select: ServoSelect) {
        let state = self.device_state();
        let offset = |id: usize| ServoOffset {
            id: id as u8,
            offset: (i32::from(state.servo_positions[id]) - i32::from(SERVO_NEUTRAL)
                + i32::from(state.servo_offsets[id]))
            .clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16,
        };
        let command = match select {
            ServoSelect::Servo(id) if usize::from(id) < SERVO_COUNT => {
                Ok(Command::ServoCalibration(vec![offset(usize::from(id))]))
            }
            ServoSelect::Servo(id) => Err(ArgumentError::OutOfRange {
                field: "servo",
                value: i64::from(id),
            }),
            ServoSelect::All => Ok(Command::ServoCalibration(
                (0..SERVO_COUNT).map(offset).collect(),
            )),
        };
        self.submit(command).await
    }

    /// Clear every servo calibration offset.
    pub async fn reset_servo_offsets(&self) {
        let offsets = (0..SERVO_COUNT as u8)
            .map(|id| ServoOffset { id, offset: 0 })
            .collect();
        self.submit(Ok(Command::ServoCalibration(offsets))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_select_ids() {
        assert_eq!(DcSelect::First.ids(), &[0]);
        assert_eq!(DcSelect::Second.ids(), &[1]);
        assert_eq!(DcSelect::Both.ids(), &[0, 1]);
    }
}
