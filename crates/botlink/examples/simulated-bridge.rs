//! Simulated serial bridge: plays the device side of the protocol on a Unix
//! socket so `botlink monitor` has something to talk to.
//!
//! Run with:
//!   cargo run --example simulated-bridge
//!
//! In another terminal:
//!   cargo run --features cli -- monitor toybot.sock --dir /tmp/botlink-sim \
//!     --interval 500ms --count 5

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::io::{Read, Write};
    use std::os::unix::net::UnixListener;

    use botlink::content::{records, RecordKind};
    use botlink::frame::{encode_frame, FrameParser, PRODUCT_TYPE, PROTOCOL_VERSION};
    use botlink::transport::{unwrap_delivery, wrap_delivery, ENVELOPE_HEADER_SIZE};
    use bytes::{BufMut, BytesMut};

    let dir = std::path::PathBuf::from("/tmp/botlink-sim");
    std::fs::create_dir_all(&dir)?;
    let sock_path = dir.join("toybot.sock");

    // Ensure no stale socket
    let _ = std::fs::remove_file(&sock_path);

    let listener = UnixListener::bind(&sock_path)?;
    eprintln!("Simulated bridge on {}", sock_path.display());

    let (mut stream, _) = listener.accept()?;
    eprintln!("Host connected");

    let mut parser = FrameParser::new();
    let mut distance: u16 = 120;
    loop {
        let mut envelope = vec![0u8; ENVELOPE_HEADER_SIZE];
        if stream.read_exact(&mut envelope).is_err() {
            eprintln!("Host disconnected");
            break;
        }
        let len = u32::from_le_bytes([envelope[0], envelope[1], envelope[2], envelope[3]]);
        envelope.resize(ENVELOPE_HEADER_SIZE + len as usize, 0);
        stream.read_exact(&mut envelope[ENVELOPE_HEADER_SIZE..])?;

        for frame in parser.push(unwrap_delivery(&envelope)?)?.frames {
            let wants_name = records(&frame.payload).any(|record| {
                record.kind() == Some(RecordKind::ReturnRequest)
                    && record
                        .body
                        .get(1..)
                        .unwrap_or_default()
                        .chunks_exact(2)
                        .any(|pair| pair[0] == RecordKind::DeviceName.index())
            });

            let mut payload = BytesMut::new();
            if wants_name {
                let name = b"ToyBot-Sim";
                payload.put_u8(RecordKind::DeviceName.index());
                payload.put_u16_le(name.len() as u16 + 1);
                payload.put_u8(name.len() as u8);
                payload.put_slice(name);
            } else {
                distance = if distance >= 400 { 120 } else { distance + 10 };
                payload.put_u8(RecordKind::UltrasonicDistance.index());
                payload.put_u16_le(2);
                payload.put_u16_le(distance);
                payload.put_u8(RecordKind::AnalogValue.index());
                payload.put_u16_le(2);
                payload.put_u16_le(distance * 2);
            }

            let mut wire = BytesMut::new();
            encode_frame(PRODUCT_TYPE, PROTOCOL_VERSION, &payload, &mut wire)?;
            let mut out = BytesMut::new();
            wrap_delivery(&wire, &mut out);
            stream.write_all(&out)?;
        }
    }

    let _ = std::fs::remove_file(&sock_path);
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("simulated-bridge requires Unix domain sockets");
}
