use botlink_content::{Command, ContentError, LedColor, OutgoingBuffer};
use botlink_engine::scheduler::{poll_commands, probe_commands};
use botlink_transport::wrap_delivery;
use bytes::BytesMut;

use crate::cmd::{EncodeArgs, Packet};
use crate::exit::{CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_packet, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let (name, commands) = commands_for(&args.packet)?;

    let mut buffer = OutgoingBuffer::new();
    for command in &commands {
        buffer.push(command).map_err(content_error)?;
    }
    let frame = buffer
        .build_frame(args.product, args.protocol_version)
        .map_err(content_error)?;

    if args.envelope {
        let mut wrapped = BytesMut::new();
        wrap_delivery(&frame, &mut wrapped);
        print_packet(name, &wrapped, format);
    } else {
        print_packet(name, &frame, format);
    }
    Ok(SUCCESS)
}

fn commands_for(packet: &Packet) -> CliResult<(&'static str, Vec<Command>)> {
    let usage = |err: botlink_content::ArgumentError| CliError::new(USAGE, err.to_string());

    Ok(match packet {
        Packet::Probe => ("probe", probe_commands()),
        Packet::Poll => ("poll", poll_commands()),
        Packet::Servo { id, angle, speed } => (
            "servo",
            vec![Command::servo_angle(*id, *speed, *angle).map_err(usage)?],
        ),
        Packet::Led { color, rgb } => {
            let command = match (color, rgb) {
                (_, Some(rgb)) => match rgb.as_slice() {
                    &[r, g, b] => Command::led_percent(r, g, b).map_err(usage)?,
                    _ => return Err(CliError::new(USAGE, "--rgb takes exactly three values")),
                },
                (Some(color), None) => {
                    let color: LedColor = color.parse().map_err(|err| CliError::new(USAGE, err))?;
                    Command::Led(color.rgb())
                }
                (None, None) => return Err(CliError::new(USAGE, "a color or --rgb is required")),
            };
            ("led", vec![command])
        }
        Packet::Pwm { percent } => ("pwm", vec![Command::analog_output(*percent).map_err(usage)?]),
        Packet::Heartbeat => ("heartbeat", vec![Command::HeartBeat]),
    })
}

fn content_error(err: ContentError) -> CliError {
    CliError::new(DATA_INVALID, format!("encode failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn led_by_name_and_percent_agree() {
        let (_, by_name) = commands_for(&Packet::Led {
            color: Some("RED".to_string()),
            rgb: None,
        })
        .unwrap();
        let (_, by_rgb) = commands_for(&Packet::Led {
            color: None,
            rgb: Some(vec![100.0, 0.0, 0.0]),
        })
        .unwrap();
        assert_eq!(by_name, by_rgb);
    }

    #[test]
    fn unknown_color_is_usage_error() {
        let err = commands_for(&Packet::Led {
            color: Some("teal".to_string()),
            rgb: None,
        })
        .unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn nan_angle_is_usage_error() {
        let err = commands_for(&Packet::Servo {
            id: 0,
            angle: f64::NAN,
            speed: 100.0,
        })
        .unwrap_err();
        assert_eq!(err.code, USAGE);
    }
}
