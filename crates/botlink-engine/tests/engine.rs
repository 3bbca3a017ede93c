use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use botlink_content::{args, records, Command, Direction, LedColor, RecordKind};
use botlink_engine::{DcSelect, Engine, EngineConfig, EngineError, LinkEvent, ServoSelect};
use botlink_frame::{encode_frame, verify_frame, HEADER_SIZE, PRODUCT_TYPE, PROTOCOL_VERSION};
use botlink_transport::{wrap_delivery, Link, MessageSink, TransportError};
use bytes::{Bytes, BytesMut};
use tokio::sync::broadcast;
use tokio::time::sleep;

#[derive(Default)]
struct RecordingLink {
    connected: AtomicBool,
    fail_sends: AtomicBool,
    sink: Mutex<Option<MessageSink>>,
    sent: Mutex<Vec<Bytes>>,
}

impl RecordingLink {
    fn deliver(&self, content: &[u8]) {
        let mut blob = BytesMut::new();
        wrap_delivery(content, &mut blob);
        let sink = self.sink.lock().unwrap().clone().expect("not connected");
        sink(blob.freeze());
    }

    fn sent(&self) -> Vec<Bytes> {
        self.sent.lock().unwrap().clone()
    }
}

impl Link for RecordingLink {
    fn scan(&self) -> botlink_transport::Result<Vec<String>> {
        Ok(vec!["toybot".to_string()])
    }

    fn connect(&self, id: &str, sink: MessageSink) -> botlink_transport::Result<()> {
        if id != "toybot" {
            return Err(TransportError::NotConnected);
        }
        *self.sink.lock().unwrap() = Some(sink);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&self) {
        self.sink.lock().unwrap().take();
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn send_message(&self, packet: Bytes) -> botlink_transport::Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.sent.lock().unwrap().push(packet);
        Ok(())
    }
}

fn setup(config: EngineConfig) -> (Arc<RecordingLink>, Engine<Arc<RecordingLink>>) {
    let link = Arc::new(RecordingLink::default());
    let engine = Engine::new(Arc::clone(&link), config);
    (link, engine)
}

fn frame(payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode_frame(PRODUCT_TYPE, PROTOCOL_VERSION, payload, &mut buf).unwrap();
    buf.to_vec()
}

/// A device report: distance 250 mm.
fn distance_report() -> Vec<u8> {
    frame(&[0x73, 0x02, 0x00, 0xFA, 0x00])
}

fn drain(rx: &mut broadcast::Receiver<LinkEvent>) -> Vec<LinkEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Content records of a sent packet as (index, body).
fn packet_records(packet: &[u8]) -> Vec<(u8, Vec<u8>)> {
    assert!(verify_frame(packet));
    records(&packet[HEADER_SIZE..])
        .map(|record| (record.index, record.body.to_vec()))
        .collect()
}

fn bodies_of(packets: &[Bytes], kind: RecordKind) -> Vec<Vec<u8>> {
    packets
        .iter()
        .flat_map(|packet| packet_records(packet))
        .filter(|(index, _)| *index == kind.index())
        .map(|(_, body)| body)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn probes_until_detected_then_polls() {
    let (link, engine) = setup(EngineConfig::default());
    let mut events = engine.subscribe();
    engine.connect("toybot").unwrap();
    assert!(engine.is_connected());

    sleep(Duration::from_millis(45)).await;
    let sent = link.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        &sent[0][HEADER_SIZE..],
        &[
            0x01, 0x03, 0x00, 0x01, 0x03, 0x02, // name x2
            0x02, 0x01, 0x00, 0x03, // control mode
            0xFF, 0x01, 0x00, 0x01, // heartbeat
        ]
    );

    link.deliver(&distance_report());
    assert!(engine.is_detected());
    assert_eq!(engine.device_state().distance, 250);
    assert_eq!(drain(&mut events), vec![LinkEvent::Detected]);

    sleep(Duration::from_millis(40)).await;
    let sent = link.sent();
    assert_eq!(sent.len(), 2);
    let polled: Vec<u8> = packet_records(&sent[1])
        .into_iter()
        .find(|(index, _)| *index == RecordKind::ReturnRequest.index())
        .map(|(_, body)| body)
        .unwrap();
    assert_eq!(
        polled,
        vec![0x05, 0x13, 0x02, 0x1E, 0x02, 0x43, 0x02, 0x53, 0x02, 0x73, 0x02]
    );

    // A second valid frame does not announce detection again.
    link.deliver(&distance_report());
    assert!(drain(&mut events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn chunked_deliveries_reassemble() {
    let (link, engine) = setup(EngineConfig::default());
    engine.connect("toybot").unwrap();

    let mut stream = vec![0x13, 0x37];
    stream.extend(frame(&[0x43, 0x02, 0x00, 0x00, 0x03]));
    stream.extend(frame(&[0x53, 0x02, 0x00, 0x00, 0x01]));
    for chunk in stream.chunks(3) {
        link.deliver(chunk);
    }

    let state = engine.device_state();
    assert_eq!(state.analog, 768);
    assert_eq!(state.buttons, [0, 1]);
    assert!(state.button_pressed(1));
}

#[tokio::test(start_paused = true)]
async fn sends_are_rate_limited() {
    let config = EngineConfig {
        tick_interval: Duration::from_millis(10),
        send_rate_max: 10,
        ..EngineConfig::default()
    };
    let (link, engine) = setup(config);
    engine.connect("toybot").unwrap();

    sleep(Duration::from_millis(1005)).await;
    let sent = link.sent().len();
    // 100 ticks: a full bucket of 10 plus about 10 refills.
    assert!((18..=22).contains(&sent), "sent {sent} packets");
}

#[tokio::test(start_paused = true)]
async fn watchdog_fires_once_per_window_and_rearms() {
    let config = EngineConfig {
        tick_interval: Duration::from_secs(3600),
        watchdog_timeout: Duration::from_secs(1),
        ..EngineConfig::default()
    };
    let (link, engine) = setup(config);
    let mut events = engine.subscribe();
    engine.connect("toybot").unwrap();

    link.deliver(&distance_report());
    assert_eq!(drain(&mut events), vec![LinkEvent::Detected]);

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(drain(&mut events), vec![LinkEvent::Stale]);

    sleep(Duration::from_millis(1000)).await;
    assert_eq!(drain(&mut events), vec![LinkEvent::Stale]);

    // t = 2.5 s: a valid header pushes the next fire to 3.5 s.
    link.deliver(&distance_report());
    sleep(Duration::from_millis(700)).await;
    assert!(drain(&mut events).is_empty());

    sleep(Duration::from_millis(400)).await;
    assert_eq!(drain(&mut events), vec![LinkEvent::Stale]);
}

#[tokio::test(start_paused = true)]
async fn corrupt_bytes_do_not_rearm_watchdog() {
    let config = EngineConfig {
        tick_interval: Duration::from_secs(3600),
        watchdog_timeout: Duration::from_secs(1),
        ..EngineConfig::default()
    };
    let (link, engine) = setup(config);
    let mut events = engine.subscribe();
    engine.connect("toybot").unwrap();

    sleep(Duration::from_millis(600)).await;
    link.deliver(&[0x00; 12]);
    sleep(Duration::from_millis(500)).await;
    assert_eq!(drain(&mut events), vec![LinkEvent::Stale]);
    assert!(!engine.is_detected());
}

#[tokio::test(start_paused = true)]
async fn overflow_clears_accumulator_and_reports() {
    let config = EngineConfig {
        capacity: 16,
        ..EngineConfig::default()
    };
    let (_link, engine) = setup(config);
    let mut events = engine.subscribe();
    engine.connect("toybot").unwrap();

    let mut blob = BytesMut::new();
    wrap_delivery(&[0x00; 17], &mut blob);
    let err = engine.on_message(&blob).unwrap_err();
    assert!(matches!(err, EngineError::Frame(_)));
    assert_eq!(drain(&mut events), vec![LinkEvent::Overflow { capacity: 16 }]);

    // The next delivery starts from an empty accumulator.
    let mut blob = BytesMut::new();
    wrap_delivery(&distance_report(), &mut blob);
    engine.on_message(&blob).unwrap();
    assert_eq!(engine.device_state().distance, 250);
}

#[tokio::test(start_paused = true)]
async fn disconnect_resets_and_stops_ticks() {
    let (link, engine) = setup(EngineConfig::default());
    engine.connect("toybot").unwrap();
    link.deliver(&distance_report());
    engine.queue(&Command::HeartBeat).unwrap();
    assert!(engine.is_detected());

    engine.disconnect();
    assert!(!engine.is_connected());
    assert!(!engine.is_detected());
    assert_eq!(engine.device_state(), Default::default());
    assert_eq!(engine.pending_content(), 0);

    sleep(Duration::from_millis(500)).await;
    assert!(link.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn reconnect_starts_a_fresh_session() {
    let (link, engine) = setup(EngineConfig::default());
    engine.connect("toybot").unwrap();
    link.deliver(&distance_report());
    engine.connect("toybot").unwrap();

    assert!(!engine.is_detected());
    assert_eq!(engine.device_state().distance, 0);

    sleep(Duration::from_millis(45)).await;
    assert_eq!(link.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_connect_is_reported() {
    let (link, engine) = setup(EngineConfig::default());
    let err = engine.connect("nowhere").unwrap_err();
    assert!(matches!(err, EngineError::Transport(_)));

    sleep(Duration::from_millis(200)).await;
    assert!(link.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn send_failure_publishes_transport_error() {
    let (link, engine) = setup(EngineConfig::default());
    let mut events = engine.subscribe();
    engine.connect("toybot").unwrap();
    link.fail_sends.store(true, Ordering::SeqCst);

    sleep(Duration::from_millis(45)).await;
    let events = drain(&mut events);
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], LinkEvent::TransportError(msg) if msg.contains("closed")));
}

#[tokio::test(start_paused = true)]
async fn dropped_link_is_reported_once_per_session() {
    let (link, engine) = setup(EngineConfig::default());
    let mut events = engine.subscribe();
    engine.connect("toybot").unwrap();
    sleep(Duration::from_millis(45)).await;
    let sent = link.sent().len();

    // Bridge goes away without the host calling disconnect.
    link.connected.store(false, Ordering::SeqCst);
    sleep(Duration::from_millis(300)).await;
    assert_eq!(
        drain(&mut events),
        vec![LinkEvent::TransportError("link closed".to_string())]
    );
    assert!(!engine.is_connected());
    assert_eq!(link.sent().len(), sent);

    engine.connect("toybot").unwrap();
    sleep(Duration::from_millis(45)).await;
    assert!(drain(&mut events).is_empty());
    link.connected.store(false, Ordering::SeqCst);
    sleep(Duration::from_millis(100)).await;
    assert_eq!(
        drain(&mut events),
        vec![LinkEvent::TransportError("link closed".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn servo_angles_are_clamped_on_the_wire() {
    let (link, engine) = setup(EngineConfig::default());
    engine.connect("toybot").unwrap();

    engine.set_servo_angle(0, 3.0, 90.0).await;
    engine.set_servo_angle(1, 3.0, -10.0).await;
    engine.set_servo_angle(2, 3.0, 999.0).await;
    engine.set_servo_angle(3, 3.0, f64::NAN).await;
    sleep(Duration::from_millis(20)).await;

    let bodies = bodies_of(&link.sent(), RecordKind::ServoControl);
    assert_eq!(
        bodies,
        vec![
            vec![0x01, 0x00, 0x03, 0x84, 0x03],
            vec![0x01, 0x01, 0x03, 0x00, 0x00],
            vec![0x01, 0x02, 0x03, 0x08, 0x07],
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn commands_ride_the_next_frame() {
    let (link, engine) = setup(EngineConfig::default());
    engine.connect("toybot").unwrap();

    engine.set_led_color(LedColor::Orange).await;
    engine.set_led_rgb(100.0, 0.0, 20.0).await;
    engine.set_analog_output(100.0).await;
    engine.set_dc_motor(DcSelect::Second, 1.0, Direction::Reverse).await;
    sleep(Duration::from_millis(5)).await;

    let sent = link.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        bodies_of(&sent, RecordKind::LedControl),
        vec![vec![0xFF, 0x80, 0x00], vec![0xFF, 0x00, 0x33]]
    );
    assert_eq!(bodies_of(&sent, RecordKind::PwmControl), vec![vec![0xFF, 0x03]]);
    assert_eq!(
        bodies_of(&sent, RecordKind::DcControl),
        vec![vec![0x01, 0x01, 0xCD, 0xFF]]
    );
    assert_eq!(engine.pending_content(), 0);
}

#[tokio::test(start_paused = true)]
async fn note_is_followed_by_rest() {
    let (link, engine) = setup(EngineConfig::default());
    engine.connect("toybot").unwrap();

    engine.play_note(1000, args::OCTAVE_MIDDLE, 12, 1).await;
    sleep(Duration::from_millis(60)).await;

    // The note carries beat 0; the host times it and ends it with a rest.
    let notes = bodies_of(&link.sent(), RecordKind::MelodyScore);
    assert_eq!(notes, vec![vec![0x01, 0x00, 0x61], vec![0x01, 11, 0x00]]);
}

#[tokio::test(start_paused = true)]
async fn servo_offset_uses_reported_position() {
    let (link, engine) = setup(EngineConfig::default());
    engine.connect("toybot").unwrap();

    // Servo 1 reports 950 with a current offset of -20.
    let mut report = vec![0x13, 0x05, 0x00, 0x01, 0x01, 0x00, 0xB6, 0x03];
    report.extend([0x1E, 0x04, 0x00, 0x01, 0x01, 0xEC, 0xFF]);
    link.deliver(&frame(&report));

    engine.set_servo_offset(ServoSelect::Servo(1)).await;
    engine.set_servo_offset(ServoSelect::Servo(9)).await;
    engine.reset_servo_offsets().await;
    sleep(Duration::from_millis(20)).await;

    let bodies = bodies_of(&link.sent(), RecordKind::ServoCalibration);
    assert_eq!(bodies.len(), 2);
    // 950 - 900 + (-20) = 30
    assert_eq!(bodies[0], vec![0x01, 0x01, 0x1E, 0x00]);
    assert_eq!(bodies[1][0], 5);
    assert!(bodies[1][1..].chunks(3).all(|entry| entry[1] == 0 && entry[2] == 0));
}
