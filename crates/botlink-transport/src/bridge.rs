use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::envelope::ENVELOPE_HEADER_SIZE;
use crate::error::{Result, TransportError};
use crate::link::{Link, MessageSink};

/// Largest envelope accepted from or sent to a bridge.
const MAX_ENVELOPE: usize = 64 * 1024;

/// Link to a serial bridge exposed as a Unix domain socket.
///
/// The bridge speaks envelopes in both directions: a u32 LE length followed by
/// that many bytes. Inbound envelopes are handed to the sink with their prefix
/// intact; outbound packets are wrapped on the way out.
///
/// `connect` must be called from inside a tokio runtime; it spawns one reader
/// and one writer task per connection.
pub struct BridgeLink {
    search_dir: PathBuf,
    conn: Mutex<Option<Connection>>,
}

struct Connection {
    path: PathBuf,
    outbound: mpsc::UnboundedSender<Bytes>,
    cancel: CancellationToken,
    alive: Arc<AtomicBool>,
}

impl BridgeLink {
    /// Create a link that scans and resolves device ids under `search_dir`.
    pub fn new(search_dir: impl AsRef<Path>) -> Self {
        Self {
            search_dir: search_dir.as_ref().to_path_buf(),
            conn: Mutex::new(None),
        }
    }

    /// Directory used by `scan` and for resolving relative ids.
    pub fn search_dir(&self) -> &Path {
        &self.search_dir
    }

    /// Socket path of the current connection.
    pub fn connected_path(&self) -> Option<PathBuf> {
        self.lock().as_ref().map(|conn| conn.path.clone())
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "serial-bridge-uds"
    }

    fn resolve(&self, id: &str) -> PathBuf {
        let candidate = Path::new(id);
        if candidate.is_absolute() || id.contains('/') {
            candidate.to_path_buf()
        } else {
            self.search_dir.join(id)
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn envelope_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .little_endian()
        .length_field_length(ENVELOPE_HEADER_SIZE)
        .num_skip(0)
        .max_frame_length(MAX_ENVELOPE)
        .new_codec()
}

impl Link for BridgeLink {
    fn scan(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.search_dir).map_err(|e| TransportError::Scan {
            path: self.search_dir.clone(),
            source: e,
        })?;

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TransportError::Scan {
                path: self.search_dir.clone(),
                source: e,
            })?;
            let is_socket = entry
                .file_type()
                .map(|ft| ft.is_socket())
                .unwrap_or(false);
            if is_socket {
                found.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        found.sort();
        debug!(dir = ?self.search_dir, count = found.len(), "scanned bridge sockets");
        Ok(found)
    }

    fn connect(&self, id: &str, sink: MessageSink) -> Result<()> {
        self.disconnect();

        let path = self.resolve(id);
        let handle = tokio::runtime::Handle::try_current().map_err(|e| TransportError::Connect {
            path: path.clone(),
            source: std::io::Error::other(e),
        })?;

        let stream = std::os::unix::net::UnixStream::connect(&path).map_err(|e| {
            TransportError::Connect {
                path: path.clone(),
                source: e,
            }
        })?;
        stream.set_nonblocking(true)?;
        let stream = {
            let _guard = handle.enter();
            tokio::net::UnixStream::from_std(stream)?
        };
        let (read_half, write_half) = stream.into_split();

        let cancel = CancellationToken::new();
        let alive = Arc::new(AtomicBool::new(true));
        let (outbound, queue) = mpsc::unbounded_channel();

        handle.spawn(read_loop(read_half, sink, cancel.clone(), alive.clone()));
        handle.spawn(write_loop(write_half, queue, cancel.clone(), alive.clone()));

        info!(?path, "connected to serial bridge");
        *self.lock() = Some(Connection {
            path,
            outbound,
            cancel,
            alive,
        });
        Ok(())
    }

    fn disconnect(&self) {
        if let Some(conn) = self.lock().take() {
            conn.cancel.cancel();
            conn.alive.store(false, Ordering::SeqCst);
            info!(path = ?conn.path, "disconnected from serial bridge");
        }
    }

    fn is_connected(&self) -> bool {
        self.lock()
            .as_ref()
            .map(|conn| conn.alive.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    fn send_message(&self, packet: Bytes) -> Result<()> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(TransportError::NotConnected)?;
        if !conn.alive.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        conn.outbound
            .send(packet)
            .map_err(|_| TransportError::Closed)
    }
}

impl Drop for BridgeLink {
    fn drop(&mut self) {
        self.disconnect();
    }
}

async fn read_loop(
    read_half: OwnedReadHalf,
    sink: MessageSink,
    cancel: CancellationToken,
    alive: Arc<AtomicBool>,
) {
    let mut framed = FramedRead::new(read_half, envelope_codec());
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = framed.next() => match next {
                Some(Ok(envelope)) => sink(envelope.freeze()),
                Some(Err(err)) => {
                    warn!(error = %err, "bridge read failed");
                    break;
                }
                None => {
                    debug!("bridge closed the stream");
                    break;
                }
            },
        }
    }
    alive.store(false, Ordering::SeqCst);
}

async fn write_loop(
    write_half: OwnedWriteHalf,
    mut queue: mpsc::UnboundedReceiver<Bytes>,
    cancel: CancellationToken,
    alive: Arc<AtomicBool>,
) {
    let mut framed = FramedWrite::new(write_half, envelope_codec());
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = queue.recv() => match next {
                Some(packet) => {
                    if let Err(err) = framed.send(packet).await {
                        warn!(error = %err, "bridge write failed");
                        break;
                    }
                }
                None => break,
            },
        }
    }
    alive.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/botlink-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir
    }

    #[tokio::test]
    async fn scan_lists_only_sockets() {
        let dir = temp_dir("scan");
        let _listener = tokio::net::UnixListener::bind(dir.join("toybot.sock")).unwrap();
        std::fs::write(dir.join("notes.txt"), b"not a socket").unwrap();

        let link = BridgeLink::new(&dir);
        assert_eq!(link.scan().unwrap(), vec!["toybot.sock".to_string()]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn scan_missing_directory_fails() {
        let link = BridgeLink::new("/nonexistent/botlink-bridges");
        assert!(matches!(link.scan(), Err(TransportError::Scan { .. })));
    }

    #[tokio::test]
    async fn roundtrip_over_bridge_socket() {
        let dir = temp_dir("roundtrip");
        let listener = tokio::net::UnixListener::bind(dir.join("bridge.sock")).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();
        let sink: MessageSink = Arc::new(move |blob| {
            let _ = tx.send(blob);
        });

        let link = BridgeLink::new(&dir);
        link.connect("bridge.sock", sink).unwrap();
        assert!(link.is_connected());
        assert_eq!(link.connected_path(), Some(dir.join("bridge.sock")));

        let (mut server, _) = listener.accept().await.unwrap();
        server
            .write_all(&[0x03, 0x00, 0x00, 0x00, 0x0A, 0x0B, 0x0C])
            .await
            .unwrap();

        let blob = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(blob.as_ref(), &[0x03, 0x00, 0x00, 0x00, 0x0A, 0x0B, 0x0C]);

        link.send_message(Bytes::from_static(&[0xAA, 0xBB])).unwrap();
        let mut outbound = [0u8; 6];
        tokio::time::timeout(Duration::from_secs(2), server.read_exact(&mut outbound))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outbound, [0x02, 0x00, 0x00, 0x00, 0xAA, 0xBB]);

        link.disconnect();
        assert!(!link.is_connected());
        assert!(matches!(
            link.send_message(Bytes::from_static(b"x")),
            Err(TransportError::NotConnected)
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn connect_to_missing_socket_fails() {
        let dir = temp_dir("missing");
        let link = BridgeLink::new(&dir);
        let sink: MessageSink = Arc::new(|_| {});

        let err = link.connect("absent.sock", sink).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert!(!link.is_connected());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
