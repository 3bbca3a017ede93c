use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
#[cfg(unix)]
pub mod monitor;
#[cfg(unix)]
pub mod scan;
pub mod version;

/// Directory searched for bridge sockets when none is given.
pub const DEFAULT_BRIDGE_DIR: &str = "/tmp";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reassemble frames from captured bytes and decode their records.
    Decode(DecodeArgs),
    /// Print the wire bytes of a single command frame.
    Encode(EncodeArgs),
    /// List serial bridge sockets.
    Scan(ScanArgs),
    /// Connect to a bridge and print device state snapshots.
    Monitor(MonitorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        #[cfg(unix)]
        Command::Scan(args) => scan::run(args, format),
        #[cfg(unix)]
        Command::Monitor(args) => monitor::run(args, format),
        #[cfg(not(unix))]
        Command::Scan(_) | Command::Monitor(_) => Err(CliError::new(
            USAGE,
            "serial bridge sockets require a Unix platform",
        )),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Captured bytes as hex.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub hex: Option<String>,
    /// Read raw captured bytes from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Feed the parser this many bytes at a time. Default: receive capacity.
    #[arg(long, value_name = "BYTES")]
    pub chunk: Option<usize>,
    /// Receive buffer capacity in bytes.
    #[arg(long, default_value_t = botlink_frame::DEFAULT_CAPACITY)]
    pub capacity: usize,
    /// Drop frames whose payload checksum does not match.
    #[arg(long)]
    pub verify: bool,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Product type byte.
    #[arg(long, default_value_t = botlink_frame::PRODUCT_TYPE)]
    pub product: u8,
    /// Protocol version byte.
    #[arg(long = "protocol", default_value_t = botlink_frame::PROTOCOL_VERSION)]
    pub protocol_version: u8,
    /// Wrap the frame in a bridge delivery envelope.
    #[arg(long)]
    pub envelope: bool,
    #[command(subcommand)]
    pub packet: Packet,
}

#[derive(Subcommand, Debug)]
pub enum Packet {
    /// Detection probe (device mode + name request).
    Probe,
    /// Sensor poll sent once the device is detected.
    Poll,
    /// Move one servo.
    Servo {
        /// Servo id (0..=4).
        id: u8,
        /// Angle in degrees, clamped to 0..=180.
        #[arg(allow_negative_numbers = true)]
        angle: f64,
        #[arg(long, default_value_t = 100.0)]
        speed: f64,
    },
    /// Set the LED color by name or by channel percentages.
    Led {
        /// off, white, red, orange, yellow, green, blue, navy, violet.
        #[arg(required_unless_present = "rgb")]
        color: Option<String>,
        /// Channel percentages as R,G,B.
        #[arg(long, value_delimiter = ',', conflicts_with = "color")]
        rgb: Option<Vec<f64>>,
    },
    /// Analog (PWM) output as a percentage.
    Pwm { percent: f64 },
    /// Keep-alive record.
    Heartbeat,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Directory holding bridge sockets.
    #[arg(env = "BOTLINK_BRIDGE_DIR", default_value = DEFAULT_BRIDGE_DIR)]
    pub dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Bridge socket name (relative to --dir) or path.
    pub socket: String,
    /// Directory holding bridge sockets.
    #[arg(long, env = "BOTLINK_BRIDGE_DIR", default_value = DEFAULT_BRIDGE_DIR)]
    pub dir: PathBuf,
    /// Exit after printing N snapshots.
    #[arg(long)]
    pub count: Option<usize>,
    /// Time between snapshots (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub interval: String,
    /// Window without a valid frame before the link is reported stale.
    #[arg(long, default_value = "3s")]
    pub watchdog: String,
    /// Give up if the device is not detected within this time.
    #[arg(long, default_value = "10s")]
    pub detect_timeout: String,
    /// Drop frames whose payload checksum does not match.
    #[arg(long)]
    pub verify: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
    }
}
