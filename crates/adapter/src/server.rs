//! TCP server
//!
//! Accepts connections, reads line-delimited JSON, and routes each connection
//! to a room actor on its first `join`. Every room runs on its own task and
//! owns its state outright, so rooms share nothing mutable.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::protocol::{parse_client_message, ClientMessage, ErrorCode, ServerMessage};
use crate::room::{ConnectionId, Room, RoomConfig, RoomEvent};
use crate::timers::{TimerFire, TokioTimerDriver};
use crate::types::DEFAULT_AI_MOVE_MS;

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        use std::env;

        let host = env::var("DUEL_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("DUEL_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(7878);

        let ai_move_ms = env::var("DUEL_AI_MOVE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_AI_MOVE_MS);

        let seed = env::var("DUEL_SEED").ok().and_then(|s| s.trim().parse().ok());

        let mut room = RoomConfig::default()
            .with_ai_move_ms(ai_move_ms)
            .with_seed(seed);
        if let Some(ms) = env::var("DUEL_AI_FALLBACK_MS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            room.ai_fallback = std::time::Duration::from_millis(ms);
        }

        Self { host, port, room }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

/// Sender side of a running room actor
#[derive(Debug, Clone)]
pub struct RoomHandle {
    events: mpsc::UnboundedSender<RoomEvent>,
}

impl RoomHandle {
    /// Queue an event for the room; false once the room has closed
    pub fn send(&self, event: RoomEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

/// Live rooms by id
///
/// A room task removes its own entry once its last connection leaves, so the
/// map only holds rooms someone is attached to.
#[derive(Debug, Clone)]
pub struct RoomRegistry {
    rooms: Arc<Mutex<HashMap<String, RoomHandle>>>,
    config: Arc<RoomConfig>,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            config: Arc::new(config),
        }
    }

    /// Connect `conn` to the room, opening it when needed
    pub async fn attach(
        &self,
        room_id: &str,
        conn: ConnectionId,
        tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> RoomHandle {
        let mut rooms = self.rooms.lock().await;
        let connect = RoomEvent::Connect { conn, tx };
        let connect = match rooms.get(room_id) {
            Some(handle) => match handle.events.send(connect) {
                Ok(()) => return handle.clone(),
                Err(mpsc::error::SendError(event)) => event,
            },
            None => connect,
        };

        let handle = self.spawn_room(room_id.to_string());
        let _ = handle.events.send(connect);
        rooms.insert(room_id.to_string(), handle.clone());
        handle
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Drop the entry unless a connect is already queued behind the disconnect
    async fn release_if_idle(
        &self,
        room_id: &str,
        events: &mpsc::UnboundedReceiver<RoomEvent>,
    ) -> bool {
        let mut rooms = self.rooms.lock().await;
        if !events.is_empty() {
            return false;
        }
        rooms.remove(room_id);
        true
    }

    /// Spawn the actor task that owns one room
    fn spawn_room(&self, room_id: String) -> RoomHandle {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<RoomEvent>();
        let (timer_tx, mut timer_rx) = mpsc::unbounded_channel::<TimerFire>();
        let registry = self.clone();
        let config = RoomConfig::clone(&self.config);

        tokio::spawn(async move {
            let mut room = Room::new(room_id, config, TokioTimerDriver::new(timer_tx));
            info!(room = %room.id(), "room opened");
            loop {
                tokio::select! {
                    event = events_rx.recv() => match event {
                        Some(event) => {
                            let leaving = matches!(event, RoomEvent::Disconnect { .. });
                            room.handle_event(event);
                            if leaving
                                && room.connection_count() == 0
                                && registry.release_if_idle(room.id(), &events_rx).await
                            {
                                break;
                            }
                        }
                        None => break,
                    },
                    Some(fire) = timer_rx.recv() => room.on_timer(fire),
                }
            }
            info!(room = %room.id(), "room closed");
        });

        RoomHandle { events: events_tx }
    }
}

/// Start the TCP server
pub async fn run_server(
    config: ServerConfig,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let bound = listener.local_addr()?;
    info!(%bound, "server listening");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let registry = RoomRegistry::new(config.room);
    let mut conn_counter: ConnectionId = 0;

    // Accept incoming connections
    loop {
        let (socket, peer) = listener.accept().await?;
        conn_counter += 1;
        let conn = conn_counter;

        info!(conn, %peer, "client connected");

        let registry = registry.clone();

        // Spawn task to handle this client
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, conn, registry).await {
                warn!(conn, error = %e, "client error");
            }
            info!(conn, "client disconnected");
        });
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    conn: ConnectionId,
    registry: RoomRegistry,
) -> anyhow::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);

    // Channel to send messages to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Spawn task to write messages to client
    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(msg) = rx.recv().await {
            buf.clear();
            if serde_json::to_writer(&mut buf, &msg).is_err() {
                continue;
            }
            buf.push(b'\n');
            if writer.write_all(&buf).await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    let mut room: Option<RoomHandle> = None;
    let mut line = String::new();

    let result: anyhow::Result<()> = loop {
        line.clear();
        let bytes_read = match reader.read_line(&mut line).await {
            Ok(n) => n,
            Err(e) => break Err(e.into()),
        };
        if bytes_read == 0 {
            break Ok(());
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let message = match parse_client_message(trimmed) {
            Ok(message) => message,
            Err(e) => {
                debug!(conn, error = %e, "rejected message");
                let _ = tx.send(ServerMessage::error(e.code()));
                continue;
            }
        };

        if room.is_none() {
            let ClientMessage::Join(join) = &message else {
                let _ = tx.send(ServerMessage::error(ErrorCode::NotJoined));
                continue;
            };
            room = Some(registry.attach(join.room_id(), conn, tx.clone()).await);
        }

        if let Some(handle) = room.as_ref() {
            handle.send(RoomEvent::Message { conn, message });
        }
    };

    if let Some(handle) = room {
        handle.send(RoomEvent::Disconnect { conn });
    }
    drop(tx);
    write_task.abort();
    result
}
