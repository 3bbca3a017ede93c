//! Tick and watchdog tasks.
//!
//! Both tasks hold a `Weak` reference to the engine and stop when the session
//! is cancelled or the engine is dropped.

use std::sync::{Arc, Weak};
use std::time::Duration;

use botlink_content::{Command, RecordKind, ReturnRequest};
use botlink_transport::Link;
use tokio::sync::Notify;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::engine::Inner;

/// Times the device repeats each requested report.
const REPORT_REPEAT: u8 = 2;

/// Device mode requested while probing.
pub const DEVICE_MODE_CONTROL: u8 = 3;

/// Kinds polled once the device has been detected.
pub const POLLED_KINDS: [RecordKind; 5] = [
    RecordKind::ServoControl,
    RecordKind::ServoCalibration,
    RecordKind::AnalogValue,
    RecordKind::ButtonControl,
    RecordKind::UltrasonicDistance,
];

fn request(kinds: &[RecordKind]) -> Command {
    Command::ReturnRequest(
        kinds
            .iter()
            .map(|&kind| ReturnRequest {
                kind,
                repeat: REPORT_REPEAT,
            })
            .collect(),
    )
}

/// Records sent before detection: ask for the name, enter control mode.
pub fn probe_commands() -> Vec<Command> {
    vec![
        request(&[RecordKind::DeviceName]),
        Command::DeviceMode(DEVICE_MODE_CONTROL),
        Command::HeartBeat,
    ]
}

/// Records sent after detection: ask for every sensor report.
pub fn poll_commands() -> Vec<Command> {
    vec![request(&POLLED_KINDS), Command::HeartBeat]
}

pub(crate) fn periodic_commands(detected: bool) -> Vec<Command> {
    if detected {
        poll_commands()
    } else {
        probe_commands()
    }
}

pub(crate) async fn run_ticks<L: Link>(
    engine: Weak<Inner<L>>,
    cancel: CancellationToken,
    period: Duration,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(engine) = engine.upgrade() else { break };
                engine.tick(&cancel);
            }
        }
    }
    debug!("tick task stopped");
}

pub(crate) async fn run_watchdog<L: Link>(
    engine: Weak<Inner<L>>,
    cancel: CancellationToken,
    rearm: Arc<Notify>,
    window: Duration,
) {
    let mut deadline = Instant::now() + window;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = rearm.notified() => deadline = Instant::now() + window,
            _ = time::sleep_until(deadline) => {
                let Some(engine) = engine.upgrade() else { break };
                engine.watchdog_fired(&cancel);
                deadline += window;
            }
        }
    }
    debug!("watchdog task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use botlink_content::OutgoingBuffer;

    fn content(commands: &[Command]) -> Vec<u8> {
        let mut out = OutgoingBuffer::new();
        for command in commands {
            out.push(command).unwrap();
        }
        out.as_slice().to_vec()
    }

    #[test]
    fn probe_packet_content() {
        assert_eq!(
            content(&probe_commands()),
            vec![
                0x01, 0x03, 0x00, 0x01, 0x03, 0x02, // return request: name x2
                0x02, 0x01, 0x00, 0x03, // control mode
                0xFF, 0x01, 0x00, 0x01, // heartbeat
            ]
        );
    }

    #[test]
    fn poll_packet_content() {
        assert_eq!(
            content(&poll_commands()),
            vec![
                0x01, 0x0B, 0x00, 0x05, 0x13, 0x02, 0x1E, 0x02, 0x43, 0x02, 0x53, 0x02, 0x73,
                0x02, // return request: sensors x2
                0xFF, 0x01, 0x00, 0x01, // heartbeat
            ]
        );
    }

    #[test]
    fn detection_selects_packet() {
        assert_eq!(periodic_commands(false), probe_commands());
        assert_eq!(periodic_commands(true), poll_commands());
    }
}
