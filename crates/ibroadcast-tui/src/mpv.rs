/// mpv IPC driver with separated reader/writer tasks.
///
/// ```text
///   MpvDriver::spawn_and_connect()
///         │
///         ├── writer_task   ← PendingRequest via mpsc, one JSON line each
///         └── reader_task   ← JSON lines from mpv
///                                ├── has request_id → matching oneshot
///                                └── anything else  → event channel
/// ```
///
/// Unix uses a domain socket, Windows a named pipe `\\.\pipe\<name>`.
use ibroadcast_core::platform;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

// ── observe_property ids ──────────────────────────────────────────────────────

pub const OBS_PAUSE: u64 = 1;
pub const OBS_TIME_POS: u64 = 2;
pub const OBS_DURATION: u64 = 3;
pub const OBS_IDLE: u64 = 4;

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>;

struct PendingRequest {
    req_id: u64,
    payload: String,
    reply: oneshot::Sender<anyhow::Result<Value>>,
}

/// Anything mpv sends that is not a reply.
#[derive(Debug, Clone)]
pub struct MpvEvent {
    pub raw: Value,
}

impl MpvEvent {
    /// `(observe id, data)` for property-change events.
    pub fn as_property_change(&self) -> Option<(u64, &Value)> {
        if self.event_name()? != "property-change" {
            return None;
        }
        let id = self.raw.get("id")?.as_u64()?;
        Some((id, self.raw.get("data").unwrap_or(&Value::Null)))
    }

    pub fn event_name(&self) -> Option<&str> {
        self.raw.get("event")?.as_str()
    }

    /// `reason` of an `end-file` event: "eof", "stop", "error", ...
    pub fn end_reason(&self) -> Option<&str> {
        self.raw.get("reason")?.as_str()
    }
}

/// Cloneable handle to the writer task.
#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<PendingRequest>,
}

impl MpvHandle {
    pub async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let mut payload = serde_json::to_string(&json!({
            "command": command,
            "request_id": req_id,
        }))?;
        payload.push('\n');

        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                req_id,
                payload,
                reply,
            })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(REPLY_TIMEOUT, reply_rx)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for req={}", req_id))?
            .map_err(|_| anyhow::anyhow!("mpv reply dropped for req={}", req_id))?
    }

    pub async fn load_track(&self, url: &str, volume: f32) -> anyhow::Result<()> {
        debug!("mpv: loadfile {}", url);
        self.send(json!(["loadfile", url, "replace"])).await?;
        self.set_volume(volume).await?;
        self.set_pause(false).await
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        self.send(json!(["stop"])).await?;
        Ok(())
    }

    pub async fn set_volume(&self, volume: f32) -> anyhow::Result<()> {
        let pct = (volume * 100.0).clamp(0.0, 100.0);
        self.send(json!(["set_property", "volume", pct])).await?;
        Ok(())
    }

    pub async fn set_pause(&self, paused: bool) -> anyhow::Result<()> {
        self.send(json!(["set_property", "pause", paused])).await?;
        Ok(())
    }

    pub async fn quit(&self) {
        let _ = self.send(json!(["quit"])).await;
    }

    /// Must run after every fresh connection.
    pub async fn observe_properties(&self) {
        let props = [
            (OBS_PAUSE, "pause"),
            (OBS_TIME_POS, "time-pos"),
            (OBS_DURATION, "duration"),
            (OBS_IDLE, "idle-active"),
        ];
        for (id, name) in props {
            match self.send(json!(["observe_property", id, name])).await {
                Ok(_) => debug!("mpv: observing {} as {}", name, id),
                Err(e) => warn!("mpv: observe_property {} failed: {}", name, e),
            }
        }
    }
}

/// Owns the mpv child process.
pub struct MpvDriver {
    socket_name: String,
    binary_override: Option<PathBuf>,
    process: Option<tokio::process::Child>,
    pub last_volume: f32,
}

impl MpvDriver {
    pub fn new(binary_override: Option<PathBuf>, volume: f32) -> Self {
        Self {
            socket_name: platform::mpv_socket_name(),
            binary_override,
            process: None,
            last_volume: volume,
        }
    }

    pub fn process_alive(&mut self) -> bool {
        let Some(child) = self.process.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                warn!("mpv exited: {}", status);
                false
            }
            Err(e) => {
                warn!("mpv liveness check failed: {}", e);
                false
            }
        }
    }

    pub async fn kill(&mut self) {
        if let Some(mut child) = self.process.take() {
            let _ = child.kill().await;
        }
    }

    pub async fn spawn_and_connect(
        &mut self,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.kill().await;
        #[cfg(unix)]
        let _ = tokio::fs::remove_file(&self.socket_name).await;

        let binary = platform::find_mpv_binary(self.binary_override.as_deref())
            .ok_or_else(|| anyhow::anyhow!("mpv not found; install it or set player.mpv_path"))?;

        let stderr_path = platform::data_dir().join("mpv-stderr.log");
        if let Some(parent) = stderr_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let stderr_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&stderr_path)?;

        let child = tokio::process::Command::new(&binary)
            .arg("--no-video")
            .arg("--idle=yes")
            .arg("--no-terminal")
            .arg(platform::mpv_socket_arg())
            .arg(format!(
                "--volume={}",
                (self.last_volume * 100.0).clamp(0.0, 100.0).round() as i64
            ))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(stderr_file)
            .kill_on_drop(true)
            .spawn()?;
        info!("mpv: spawned {:?} pid {:?}", binary, child.id());
        self.process = Some(child);

        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if let Some(handle) = self.connect(event_tx.clone()).await {
                return Ok(handle);
            }
        }
        anyhow::bail!("mpv IPC endpoint did not appear")
    }

    #[cfg(unix)]
    async fn connect(&self, event_tx: mpsc::Sender<MpvEvent>) -> Option<MpvHandle> {
        let stream = tokio::net::UnixStream::connect(&self.socket_name).await.ok()?;
        let (read_half, write_half) = stream.into_split();
        Some(start_io_tasks(read_half, write_half, event_tx))
    }

    #[cfg(windows)]
    async fn connect(&self, event_tx: mpsc::Sender<MpvEvent>) -> Option<MpvHandle> {
        use tokio::net::windows::named_pipe::ClientOptions;
        let pipe = ClientOptions::new()
            .open(format!(r"\\.\pipe\{}", self.socket_name))
            .ok()?;
        let (read_half, write_half) = tokio::io::split(pipe);
        Some(start_io_tasks(read_half, write_half, event_tx))
    }
}

fn start_io_tasks<R, W>(read_half: R, write_half: W, event_tx: mpsc::Sender<MpvEvent>) -> MpvHandle
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
    let (tx, rx) = mpsc::channel::<PendingRequest>(64);
    tokio::spawn(writer_task(write_half, rx, pending.clone()));
    tokio::spawn(reader_task(BufReader::new(read_half), pending, event_tx));
    MpvHandle { tx }
}

async fn fail_all(pending: &Pending, reason: &str) {
    for (_, tx) in pending.lock().await.drain() {
        let _ = tx.send(Err(anyhow::anyhow!("{}", reason)));
    }
}

async fn reader_task<R>(mut reader: BufReader<R>, pending: Pending, event_tx: mpsc::Sender<MpvEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                fail_all(&pending, "mpv IPC connection closed").await;
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("mpv reader: {}", e);
                fail_all(&pending, "mpv IPC read error").await;
                break;
            }
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let val: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                debug!("mpv reader: bad json {:?}: {}", trimmed, e);
                continue;
            }
        };

        match val.get("request_id").and_then(Value::as_u64) {
            Some(req_id) => {
                let Some(tx) = pending.lock().await.remove(&req_id) else {
                    continue;
                };
                let result = match val.get("error").and_then(Value::as_str) {
                    Some("success") => Ok(val),
                    other => Err(anyhow::anyhow!("mpv error: {}", other.unwrap_or("unknown"))),
                };
                let _ = tx.send(result);
            }
            None => {
                if event_tx.send(MpvEvent { raw: val }).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<PendingRequest>, pending: Pending)
where
    W: AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // register first so the reader can always find the reply slot
        pending.lock().await.insert(req.req_id, req.reply);
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: {}", e);
            if let Some(tx) = pending.lock().await.remove(&req.req_id) {
                let _ = tx.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
    debug!("mpv writer: exiting");
}
