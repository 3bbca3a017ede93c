use std::sync::Arc;
use std::time::Duration;

use botlink_engine::{Engine, EngineConfig, LinkEvent};
use botlink_transport::BridgeLink;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cmd::{parse_duration, MonitorArgs};
use crate::exit::{
    engine_error, io_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT, TRANSPORT_ERROR,
};
use crate::output::{print_state, OutputFormat};

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let watchdog = parse_duration(&args.watchdog)?;
    let detect_timeout = parse_duration(&args.detect_timeout)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;

    let stop = Arc::new(Notify::new());
    install_ctrlc_handler(stop.clone())?;

    let config = EngineConfig {
        watchdog_timeout: watchdog,
        verify_payload: args.verify,
        ..EngineConfig::default()
    };
    let engine = Engine::new(BridgeLink::new(&args.dir), config);

    let session = Session {
        socket: args.socket,
        count: args.count,
        interval,
        detect_timeout,
        format,
    };
    runtime.block_on(session.run(&engine, &stop))
}

/// Snapshot loop for one bridge connection.
struct Session {
    socket: String,
    count: Option<usize>,
    interval: Duration,
    detect_timeout: Duration,
    format: OutputFormat,
}

impl Session {
    async fn run(self, engine: &Engine<BridgeLink>, stop: &Notify) -> CliResult<i32> {
        let mut events = engine.subscribe();
        engine
            .connect(&self.socket)
            .map_err(|err| engine_error("connect failed", err))?;

        let detect_deadline = tokio::time::sleep(self.detect_timeout);
        tokio::pin!(detect_deadline);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut printed = 0usize;

        let result = loop {
            tokio::select! {
                _ = stop.notified() => {
                    info!("interrupted");
                    break Ok(SUCCESS);
                }
                _ = &mut detect_deadline, if !engine.is_detected() => {
                    break Err(CliError::new(
                        TIMEOUT,
                        format!("device not detected within {:?}", self.detect_timeout),
                    ));
                }
                event = events.recv() => match event {
                    Ok(LinkEvent::Detected) => info!(socket = %self.socket, "device detected"),
                    Ok(LinkEvent::Stale) => warn!("no valid frame within the watchdog window"),
                    Ok(LinkEvent::Overflow { capacity }) => {
                        warn!(capacity, "receive buffer overflowed and was cleared")
                    }
                    Ok(LinkEvent::TransportError(err)) => {
                        if !engine.is_connected() {
                            break Err(CliError::new(
                                TRANSPORT_ERROR,
                                format!("bridge closed the connection: {err}"),
                            ));
                        }
                        warn!(error = %err, "link error");
                    }
                    Err(RecvError::Lagged(skipped)) => debug!(skipped, "event receiver lagged"),
                    Err(RecvError::Closed) => break Ok(SUCCESS),
                },
                _ = ticker.tick() => {
                    if !engine.is_detected() {
                        continue;
                    }
                    print_state(&engine.device_state(), true, self.format);
                    printed = printed.saturating_add(1);
                    if self.count.is_some_and(|count| printed >= count) {
                        break Ok(SUCCESS);
                    }
                }
            }
        };

        engine.disconnect();
        result
    }
}

fn install_ctrlc_handler(stop: Arc<Notify>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        stop.notify_one();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
