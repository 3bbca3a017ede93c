use botlink_content::{apply_payload, DeviceState};
use botlink_frame::{FrameParser, ParserConfig, HEADER_SIZE};
use tracing::{debug, warn};

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{parse_hex, print_frame, print_state, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    if args.capacity <= HEADER_SIZE {
        return Err(CliError::new(
            USAGE,
            format!("capacity must exceed the {HEADER_SIZE}-byte header"),
        ));
    }

    let input = match (&args.hex, &args.file) {
        (Some(hex), _) => parse_hex(hex).map_err(|err| CliError::new(USAGE, err))?,
        (None, Some(path)) => std::fs::read(path)
            .map_err(|err| io_error(&format!("failed to read {}", path.display()), err))?,
        (None, None) => return Err(CliError::new(USAGE, "one of --hex or --file is required")),
    };

    let chunk = args.chunk.unwrap_or(args.capacity).clamp(1, args.capacity);
    let mut parser = FrameParser::with_config(ParserConfig {
        capacity: args.capacity,
        verify_payload: args.verify,
    });
    let mut state = DeviceState::default();
    let mut seq = 0usize;
    let mut discarded = 0usize;

    for piece in input.chunks(chunk) {
        let parsed = match parser.push(piece) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, "receive buffer overflow, resetting");
                parser.reset();
                parser.push(piece).map_err(|err| {
                    CliError::new(DATA_INVALID, format!("chunk does not fit: {err}"))
                })?
            }
        };
        discarded += parsed.discarded;

        for frame in parsed.frames {
            let summary = apply_payload(&frame.payload, &mut state);
            debug!(
                seq,
                applied = summary.applied,
                skipped = summary.skipped,
                truncated = summary.truncated,
                "decoded frame"
            );
            print_frame(seq, &frame, format);
            seq += 1;
        }
    }

    if parser.buffered() > 0 {
        debug!(buffered = parser.buffered(), "incomplete bytes left over");
    }
    if discarded > 0 {
        debug!(discarded, "bytes skipped while resynchronizing");
    }
    if seq == 0 {
        return Err(CliError::new(DATA_INVALID, "no valid frames found"));
    }

    print_state(&state, true, format);
    Ok(SUCCESS)
}
