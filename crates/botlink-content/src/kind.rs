/// Record header: index (1) + size (2).
pub const RECORD_HEADER_SIZE: usize = 3;

/// Fixed body layout of a record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Bytes per item.
    pub stride: usize,
    /// Whether the body starts with a one-byte item count.
    pub counted: bool,
}

/// Every record kind the protocol defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Ask the device to report the listed kinds.
    ReturnRequest,
    DeviceMode,
    DeviceName,
    ServoControl,
    ServoCalibration,
    DcControl,
    PwmControl,
    AnalogValue,
    ButtonControl,
    LedControl,
    UltrasonicDistance,
    MelodyScore,
    MelodyPlayList,
    HeartBeat,
}

impl RecordKind {
    pub const ALL: [RecordKind; 14] = [
        RecordKind::ReturnRequest,
        RecordKind::DeviceMode,
        RecordKind::DeviceName,
        RecordKind::ServoControl,
        RecordKind::ServoCalibration,
        RecordKind::DcControl,
        RecordKind::PwmControl,
        RecordKind::AnalogValue,
        RecordKind::ButtonControl,
        RecordKind::LedControl,
        RecordKind::UltrasonicDistance,
        RecordKind::MelodyScore,
        RecordKind::MelodyPlayList,
        RecordKind::HeartBeat,
    ];

    /// Wire index of this kind.
    pub const fn index(self) -> u8 {
        match self {
            RecordKind::ReturnRequest => 0x01,
            RecordKind::DeviceMode => 0x02,
            RecordKind::DeviceName => 0x03,
            RecordKind::ServoControl => 0x13,
            RecordKind::ServoCalibration => 0x1E,
            RecordKind::DcControl => 0x23,
            RecordKind::PwmControl => 0x33,
            RecordKind::AnalogValue => 0x43,
            RecordKind::ButtonControl => 0x53,
            RecordKind::LedControl => 0x63,
            RecordKind::UltrasonicDistance => 0x73,
            RecordKind::MelodyScore => 0x83,
            RecordKind::MelodyPlayList => 0x87,
            RecordKind::HeartBeat => 0xFF,
        }
    }

    /// Look up a kind by wire index.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.index() == index)
    }

    pub const fn layout(self) -> Layout {
        let (stride, counted) = match self {
            RecordKind::ReturnRequest => (2, true),
            RecordKind::DeviceMode => (1, false),
            RecordKind::DeviceName => (1, true),
            RecordKind::ServoControl => (4, true),
            RecordKind::ServoCalibration => (3, true),
            RecordKind::DcControl => (3, true),
            RecordKind::PwmControl => (2, false),
            RecordKind::AnalogValue => (2, false),
            RecordKind::ButtonControl => (2, false),
            RecordKind::LedControl => (3, false),
            RecordKind::UltrasonicDistance => (2, false),
            RecordKind::MelodyScore => (2, true),
            RecordKind::MelodyPlayList => (2, false),
            RecordKind::HeartBeat => (1, false),
        };
        Layout { stride, counted }
    }

    /// Body size for `items` items (excludes the record header).
    pub const fn body_size(self, items: usize) -> usize {
        let layout = self.layout();
        layout.stride * items + layout.counted as usize
    }

    /// Human-readable name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            RecordKind::ReturnRequest => "return-request",
            RecordKind::DeviceMode => "device-mode",
            RecordKind::DeviceName => "device-name",
            RecordKind::ServoControl => "servo-control",
            RecordKind::ServoCalibration => "servo-calibration",
            RecordKind::DcControl => "dc-control",
            RecordKind::PwmControl => "pwm-control",
            RecordKind::AnalogValue => "analog-value",
            RecordKind::ButtonControl => "button-control",
            RecordKind::LedControl => "led-control",
            RecordKind::UltrasonicDistance => "ultrasonic-distance",
            RecordKind::MelodyScore => "melody-score",
            RecordKind::MelodyPlayList => "melody-play-list",
            RecordKind::HeartBeat => "heartbeat",
        }
    }
}

/// Returns a human-readable name for a wire index.
pub fn index_name(index: u8) -> &'static str {
    RecordKind::from_index(index)
        .map(RecordKind::name)
        .unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_unique_and_round_trip() {
        for kind in RecordKind::ALL {
            assert_eq!(RecordKind::from_index(kind.index()), Some(kind));
        }
        let mut indices: Vec<u8> = RecordKind::ALL.iter().map(|k| k.index()).collect();
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices.len(), RecordKind::ALL.len());
    }

    #[test]
    fn unknown_index() {
        assert_eq!(RecordKind::from_index(0x44), None);
        assert_eq!(index_name(0x44), "unknown");
        assert_eq!(index_name(0xFF), "heartbeat");
    }

    #[test]
    fn body_sizes() {
        assert_eq!(RecordKind::ServoControl.body_size(5), 21);
        assert_eq!(RecordKind::ReturnRequest.body_size(1), 3);
        assert_eq!(RecordKind::LedControl.body_size(1), 3);
        assert_eq!(RecordKind::HeartBeat.body_size(1), 1);
    }
}
