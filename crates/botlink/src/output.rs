use std::io::IsTerminal;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use botlink_content::kind::index_name;
use botlink_content::{records, DeviceState, SERVO_COUNT};
use botlink_frame::Frame;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct RecordOutput {
    index: u8,
    kind: &'static str,
    size: usize,
    body: String,
}

#[derive(Serialize)]
struct FrameOutput {
    seq: usize,
    product_type: u8,
    protocol_version: u8,
    payload_size: usize,
    payload_checksum_ok: bool,
    header: String,
    records: Vec<RecordOutput>,
    truncated: bool,
}

pub fn print_frame(seq: usize, frame: &Frame, format: OutputFormat) {
    let mut iter = records(&frame.payload);
    let recs: Vec<RecordOutput> = iter
        .by_ref()
        .map(|record| RecordOutput {
            index: record.index,
            kind: index_name(record.index),
            size: record.body.len(),
            body: to_hex(record.body),
        })
        .collect();
    let out = FrameOutput {
        seq,
        product_type: frame.product_type(),
        protocol_version: frame.protocol_version(),
        payload_size: frame.payload.len(),
        payload_checksum_ok: frame.payload_checksum_ok(),
        header: to_hex(&frame.header),
        records: recs,
        truncated: iter.truncated(),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FRAME", "INDEX", "KIND", "SIZE", "BODY"]);
            for record in &out.records {
                table.add_row(vec![
                    out.seq.to_string(),
                    format!("0x{:02x}", record.index),
                    record.kind.to_string(),
                    record.size.to_string(),
                    record.body.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "frame {} product=0x{:02x} version=0x{:02x} size={} checksum={}{}",
                out.seq,
                out.product_type,
                out.protocol_version,
                out.payload_size,
                if out.payload_checksum_ok { "ok" } else { "bad" },
                if out.truncated { " (truncated)" } else { "" }
            );
            for record in &out.records {
                println!(
                    "  0x{:02x} {:<20} {:>4}  {}",
                    record.index, record.kind, record.size, record.body
                );
            }
        }
    }
}

#[derive(Serialize)]
struct StateOutput<'a> {
    detected: bool,
    name: &'a str,
    mode: u8,
    distance_cm: f64,
    buttons: [bool; 2],
    analog_percent: u32,
    servo_angles: Vec<u16>,
    servo_offsets: [i16; SERVO_COUNT],
    timestamp: String,
}

pub fn print_state(state: &DeviceState, detected: bool, format: OutputFormat) {
    let out = StateOutput {
        detected,
        name: &state.name,
        mode: state.mode,
        distance_cm: state.distance_cm(),
        buttons: [state.button_pressed(0), state.button_pressed(1)],
        analog_percent: state.analog_percent(),
        servo_angles: (0..SERVO_COUNT)
            .filter_map(|servo| state.servo_angle(servo))
            .collect(),
        servo_offsets: state.servo_offsets,
        timestamp: now_unix_seconds(),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["detected".to_string(), out.detected.to_string()])
                .add_row(vec!["name".to_string(), out.name.to_string()])
                .add_row(vec!["mode".to_string(), out.mode.to_string()])
                .add_row(vec!["distance_cm".to_string(), out.distance_cm.to_string()])
                .add_row(vec!["buttons".to_string(), format!("{:?}", out.buttons)])
                .add_row(vec![
                    "analog_percent".to_string(),
                    out.analog_percent.to_string(),
                ])
                .add_row(vec![
                    "servo_angles".to_string(),
                    format!("{:?}", out.servo_angles),
                ])
                .add_row(vec![
                    "servo_offsets".to_string(),
                    format!("{:?}", out.servo_offsets),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "detected={} name={:?} distance={}cm buttons={:?} analog={}% servos={:?}",
                out.detected,
                out.name,
                out.distance_cm,
                out.buttons,
                out.analog_percent,
                out.servo_angles
            );
        }
    }
}

#[derive(Serialize)]
struct PacketOutput<'a> {
    command: &'a str,
    size: usize,
    hex: String,
}

pub fn print_packet(command: &str, packet: &[u8], format: OutputFormat) {
    let out = PacketOutput {
        command,
        size: packet.len(),
        hex: to_hex(packet),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "SIZE", "BYTES"])
                .add_row(vec![
                    out.command.to_string(),
                    out.size.to_string(),
                    out.hex.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", out.hex),
    }
}

#[derive(Serialize)]
struct SocketsOutput<'a> {
    dir: String,
    sockets: &'a [String],
}

pub fn print_sockets(dir: &Path, sockets: &[String], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&SocketsOutput {
            dir: dir.display().to_string(),
            sockets,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SOCKET", "PATH"]);
            for socket in sockets {
                table.add_row(vec![socket.clone(), dir.join(socket).display().to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if sockets.is_empty() {
                println!("no bridge sockets in {}", dir.display());
            }
            for socket in sockets {
                println!("{}", dir.join(socket).display());
            }
        }
    }
}

fn print_json(value: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Lowercase hex with no separators.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Parse hex, ignoring whitespace, `:` and `-` separators and an optional `0x`.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, String> {
    let input = input.trim();
    let input = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    let digits: String = input
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && *c != ':' && *c != '-')
        .collect();

    hex::decode(&digits).map_err(|err| format!("invalid hex input: {err}"))
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let bytes = parse_hex("0x01 ab:CD-ef").expect("hex should parse");
        assert_eq!(bytes, vec![0x01, 0xAB, 0xCD, 0xEF]);
        assert_eq!(to_hex(&bytes), "01abcdef");
    }

    #[test]
    fn hex_rejects_bad_input() {
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
        assert_eq!(parse_hex("").expect("empty input is valid"), Vec::<u8>::new());
    }
}
