use serde::{Deserialize, Serialize};

/// Number of servo channels on the device.
pub const SERVO_COUNT: usize = 5;

/// Neutral servo position in tenths of a degree (90.0°).
pub const SERVO_NEUTRAL: u16 = 900;

/// Latest values reported by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    pub name: String,
    /// Last reported device mode byte.
    pub mode: u8,
    /// Ultrasonic distance in millimetres.
    pub distance: u16,
    pub buttons: [u8; 2],
    /// Analog input, 0..=1023.
    pub analog: u16,
    /// Servo positions in tenths of a degree.
    pub servo_positions: [u16; SERVO_COUNT],
    /// Servo calibration offsets in tenths of a degree.
    pub servo_offsets: [i16; SERVO_COUNT],
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            name: String::new(),
            mode: 0,
            distance: 0,
            buttons: [0; 2],
            analog: 0,
            servo_positions: [SERVO_NEUTRAL; SERVO_COUNT],
            servo_offsets: [0; SERVO_COUNT],
        }
    }
}

impl DeviceState {
    pub fn distance_cm(&self) -> f64 {
        f64::from(self.distance) / 10.0
    }

    pub fn button_pressed(&self, button: usize) -> bool {
        self.buttons.get(button).is_some_and(|&state| state > 0)
    }

    /// Analog input scaled to 0..=100.
    pub fn analog_percent(&self) -> u32 {
        (f64::from(self.analog) / 1024.0 * 100.0).round() as u32
    }

    /// Servo angle in whole degrees.
    pub fn servo_angle(&self, servo: usize) -> Option<u16> {
        self.servo_positions
            .get(servo)
            .map(|&position| (f64::from(position) / 10.0).round() as u16)
    }
}
