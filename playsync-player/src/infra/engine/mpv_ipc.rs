//! mpv driven over its JSON IPC socket.
//!
//! mpv is spawned as a child process in idle mode with `--input-ipc-server`.
//! Requests carry a `request_id` and are matched with their replies by a
//! reader task; `property-change` events are routed to the subscription that
//! registered the observation id.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::{
    EngineOptions, MediaEngine, ObservedProperty, PropertyEvent,
    PropertyFormat, PropertySubscription, PropertyValue,
};
use crate::error::{PlayerError, Result};

const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(50);
const QUIT_GRACE_PERIOD: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct MpvIpcConfig {
    pub binary: PathBuf,
    pub socket_path: PathBuf,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl MpvIpcConfig {
    pub fn new(binary: impl Into<PathBuf>, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            socket_path: socket_path.into(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
        }
    }

    /// Per-process socket in the temp directory.
    pub fn default_socket_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("playsync-mpv-{}.sock", std::process::id()))
    }
}

impl Default for MpvIpcConfig {
    fn default() -> Self {
        Self::new("mpv", Self::default_socket_path())
    }
}

type Reply = std::result::Result<Value, String>;

#[derive(Debug)]
struct Observer {
    /// mpv observation id to declared property.
    properties: HashMap<u64, ObservedProperty>,
    events: mpsc::UnboundedSender<PropertyEvent>,
}

#[derive(Debug, Default)]
struct Shared {
    next_request_id: AtomicU64,
    next_observation_id: AtomicU64,
    next_observer_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<Reply>>>,
    observers: Mutex<HashMap<u64, Observer>>,
}

#[derive(Debug)]
struct MpvConnection {
    child: Child,
    outgoing: mpsc::UnboundedSender<String>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

#[derive(Debug)]
pub struct MpvIpcEngine {
    config: MpvIpcConfig,
    connection: tokio::sync::Mutex<Option<MpvConnection>>,
    shared: Arc<Shared>,
}

impl MpvIpcEngine {
    pub fn new(config: MpvIpcConfig) -> Self {
        Self {
            config,
            connection: tokio::sync::Mutex::new(None),
            shared: Arc::new(Shared::default()),
        }
    }

    async fn outgoing(&self) -> Result<mpsc::UnboundedSender<String>> {
        let connection = self.connection.lock().await;
        connection
            .as_ref()
            .map(|c| c.outgoing.clone())
            .ok_or(PlayerError::EngineNotInitialized)
    }

    async fn request(&self, args: Vec<Value>) -> Result<Value> {
        let name = args
            .first()
            .and_then(Value::as_str)
            .unwrap_or("command")
            .to_string();
        let outgoing = self.outgoing().await?;

        let request_id =
            self.shared.next_request_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(request_id, tx);

        let line = json!({ "command": args, "request_id": request_id }).to_string();
        log::trace!("[Mpv] -> {line}");
        if outgoing.send(line).is_err() {
            self.shared.pending.lock().remove(&request_id);
            return Err(PlayerError::engine_command(name, "connection closed"));
        }

        match tokio::time::timeout(self.config.request_timeout, rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(message))) => {
                Err(PlayerError::engine_command(name, message))
            }
            Ok(Err(_)) => {
                Err(PlayerError::engine_command(name, "connection closed"))
            }
            Err(_) => {
                self.shared.pending.lock().remove(&request_id);
                Err(PlayerError::engine_command(name, "timed out"))
            }
        }
    }
}

impl Drop for MpvIpcEngine {
    fn drop(&mut self) {
        // Clean up socket file
        let _ = std::fs::remove_file(&self.config.socket_path);
    }
}

#[async_trait]
impl MediaEngine for MpvIpcEngine {
    async fn initialize(&self, options: &EngineOptions) -> Result<()> {
        let mut connection = self.connection.lock().await;
        if connection.is_some() {
            return Ok(());
        }

        let socket_path = &self.config.socket_path;
        let _ = tokio::fs::remove_file(socket_path).await;

        let mut cmd = Command::new(&self.config.binary);
        cmd.arg(format!("--input-ipc-server={}", socket_path.display()))
            .arg("--idle=yes")
            .arg("--no-terminal");
        for (name, value) in &options.options {
            cmd.arg(format!("--{name}={value}"));
        }
        cmd.stdin(Stdio::null()).kill_on_drop(true);

        log::info!(
            "[Mpv] Spawning {} with IPC socket {}",
            self.config.binary.display(),
            socket_path.display()
        );
        let mut child = cmd.spawn().map_err(|err| {
            PlayerError::EngineInit(format!(
                "failed to spawn {}: {err}",
                self.config.binary.display()
            ))
        })?;

        let stream =
            match connect_with_retry(socket_path, self.config.connect_timeout)
                .await
            {
                Ok(stream) => stream,
                Err(err) => {
                    let _ = child.kill().await;
                    return Err(err);
                }
            };

        let (read_half, write_half) = stream.into_split();
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_loop(write_half, outgoing_rx));
        let reader = tokio::spawn(read_loop(read_half, Arc::clone(&self.shared)));

        *connection = Some(MpvConnection {
            child,
            outgoing,
            reader,
            writer,
        });
        log::info!("[Mpv] Connected");
        Ok(())
    }

    async fn observe(
        &self,
        properties: &[ObservedProperty],
    ) -> Result<PropertySubscription> {
        let outgoing = self.outgoing().await?;
        let observer_id =
            self.shared.next_observer_id.fetch_add(1, Ordering::Relaxed);

        let mut declared = HashMap::new();
        for property in properties {
            let id = self
                .shared
                .next_observation_id
                .fetch_add(1, Ordering::Relaxed)
                + 1;
            declared.insert(id, *property);
        }
        let observation_ids: Vec<(u64, &'static str)> =
            declared.iter().map(|(id, p)| (*id, p.name)).collect();

        let (events, events_rx) = mpsc::unbounded_channel();
        self.shared.observers.lock().insert(
            observer_id,
            Observer {
                properties: declared,
                events,
            },
        );

        for (id, name) in &observation_ids {
            if let Err(err) = self
                .request(vec![json!("observe_property"), json!(id), json!(name)])
                .await
            {
                self.shared.observers.lock().remove(&observer_id);
                return Err(err);
            }
        }

        let shared = Arc::clone(&self.shared);
        Ok(PropertySubscription::new(events_rx, move || {
            shared.observers.lock().remove(&observer_id);
            for (id, _) in observation_ids {
                let line =
                    json!({ "command": ["unobserve_property", id] }).to_string();
                let _ = outgoing.send(line);
            }
            log::debug!("[Mpv] Observer {observer_id} unsubscribed");
        }))
    }

    async fn command(&self, name: &str, args: &[String]) -> Result<()> {
        let mut command = Vec::with_capacity(args.len() + 1);
        command.push(json!(name));
        command.extend(args.iter().map(|arg| json!(arg)));
        self.request(command).await.map(drop)
    }

    async fn set_property(
        &self,
        name: &str,
        value: PropertyValue,
    ) -> Result<()> {
        self.request(vec![json!("set_property"), json!(name), value.to_json()])
            .await
            .map(drop)
    }

    async fn shutdown(&self) -> Result<()> {
        let Some(mut connection) = self.connection.lock().await.take() else {
            return Ok(());
        };

        let _ = connection
            .outgoing
            .send(json!({ "command": ["quit"] }).to_string());
        match tokio::time::timeout(QUIT_GRACE_PERIOD, connection.child.wait())
            .await
        {
            Ok(Ok(status)) => log::info!("[Mpv] Exited with {status}"),
            Ok(Err(err)) => log::warn!("[Mpv] Failed to wait for exit: {err}"),
            Err(_) => {
                log::warn!("[Mpv] Did not quit in time, killing");
                connection.child.kill().await?;
            }
        }

        connection.reader.abort();
        connection.writer.abort();
        self.shared.pending.lock().clear();
        self.shared.observers.lock().clear();
        let _ = tokio::fs::remove_file(&self.config.socket_path).await;
        Ok(())
    }
}

async fn connect_with_retry(path: &Path, timeout: Duration) -> Result<UnixStream> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match UnixStream::connect(path).await {
            Ok(stream) => return Ok(stream),
            Err(err) if tokio::time::Instant::now() >= deadline => {
                return Err(PlayerError::EngineInit(format!(
                    "could not connect to {}: {err}",
                    path.display()
                )));
            }
            Err(_) => tokio::time::sleep(CONNECT_RETRY_DELAY).await,
        }
    }
}

async fn write_loop(
    mut stream: OwnedWriteHalf,
    mut outgoing: mpsc::UnboundedReceiver<String>,
) {
    while let Some(line) = outgoing.recv().await {
        let written = async {
            stream.write_all(line.as_bytes()).await?;
            stream.write_all(b"\n").await?;
            stream.flush().await
        }
        .await;
        if let Err(err) = written {
            log::warn!("[Mpv] IPC write failed: {err}");
            break;
        }
    }
}

async fn read_loop(stream: OwnedReadHalf, shared: Arc<Shared>) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => handle_message(&shared, &line),
            Ok(None) => break,
            Err(err) => {
                log::warn!("[Mpv] IPC read failed: {err}");
                break;
            }
        }
    }

    log::debug!("[Mpv] IPC connection closed");
    // Dropping the senders wakes every waiter with a closed-channel error.
    shared.pending.lock().clear();
    shared.observers.lock().clear();
}

fn handle_message(shared: &Shared, line: &str) {
    let message: Value = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(err) => {
            log::trace!("[Mpv] Ignoring malformed message ({err}): {line}");
            return;
        }
    };

    if let Some(request_id) = message.get("request_id").and_then(Value::as_u64) {
        if let Some(reply) = shared.pending.lock().remove(&request_id) {
            let result = match message.get("error").and_then(Value::as_str) {
                None | Some("success") => {
                    Ok(message.get("data").cloned().unwrap_or(Value::Null))
                }
                Some(error) => Err(error.to_string()),
            };
            let _ = reply.send(result);
        }
        return;
    }

    match message.get("event").and_then(Value::as_str) {
        Some("property-change") => {
            let (Some(id), Some(name)) = (
                message.get("id").and_then(Value::as_u64),
                message.get("name").and_then(Value::as_str),
            ) else {
                log::trace!("[Mpv] property-change without id/name: {line}");
                return;
            };
            let data = message.get("data").unwrap_or(&Value::Null);

            let observers = shared.observers.lock();
            for observer in observers.values() {
                if let Some(property) = observer.properties.get(&id) {
                    let event =
                        PropertyEvent::new(name, decode_property(data, property));
                    let _ = observer.events.send(event);
                }
            }
        }
        Some(event) => log::trace!("[Mpv] event: {event}"),
        None => {}
    }
}

/// Convert a JSON payload to a [`PropertyValue`] guided by the declared type.
///
/// mpv reports a disabled track selection as `false`; nullable id properties
/// map that to [`PropertyValue::None`].
pub fn decode_property(data: &Value, property: &ObservedProperty) -> PropertyValue {
    match data {
        Value::Null => PropertyValue::None,
        Value::Bool(false)
            if property.nullable && property.format == PropertyFormat::Int64 =>
        {
            PropertyValue::None
        }
        Value::Bool(flag) => PropertyValue::Flag(*flag),
        Value::Number(number) => {
            if property.format == PropertyFormat::Double {
                number
                    .as_f64()
                    .map(PropertyValue::Double)
                    .unwrap_or(PropertyValue::None)
            } else if let Some(int) = number.as_i64() {
                PropertyValue::Int(int)
            } else {
                number
                    .as_f64()
                    .map(PropertyValue::Double)
                    .unwrap_or(PropertyValue::None)
            }
        }
        Value::String(text) => PropertyValue::Str(text.clone()),
        Value::Array(_) | Value::Object(_) => PropertyValue::Node(data.clone()),
    }
}
