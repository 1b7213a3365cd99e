//! DCC++ over TCP (JMRI, Engine Driver and friends).
//!
//! Each connection gets its own [`FrameExtractor`], so fragments from one
//! client never mix with another's. Responses go back to the sending client
//! only; sensor notifications go to every client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::config::NetConfig;
use crate::frame::FrameExtractor;

use super::shared::SharedStation;

/// How often a connected client is checked for notifications.
const NOTIFY_INTERVAL: Duration = Duration::from_millis(50);

/// Scheduler pass interval for [`spawn_update_loop`].
pub const UPDATE_INTERVAL: Duration = Duration::from_millis(10);

/// TCP listener configuration.
#[derive(Debug, Clone)]
pub struct TcpServerConfig {
    /// Address to bind to.
    pub addr: SocketAddr,
}

impl Default for TcpServerConfig {
    fn default() -> Self {
        Self::from_config(&NetConfig::default())
    }
}

impl TcpServerConfig {
    /// Creates a config for the given address.
    pub fn new(addr: impl Into<SocketAddr>) -> Self {
        Self { addr: addr.into() }
    }

    /// Creates from the station's [`NetConfig`].
    pub fn from_config(config: &NetConfig) -> Self {
        Self {
            addr: ([0, 0, 0, 0], config.port).into(),
        }
    }
}

/// Serves one client until it disconnects.
pub async fn handle_client(state: Arc<SharedStation>, mut socket: TcpStream) -> std::io::Result<()> {
    let mut extractor: FrameExtractor = FrameExtractor::new();
    let mut cursor = state.notification_cursor();
    let mut buf = [0u8; 512];
    let mut ticker = tokio::time::interval(NOTIFY_INTERVAL);

    loop {
        tokio::select! {
            read = socket.read(&mut buf) => {
                let count = read?;
                if count == 0 {
                    return Ok(());
                }
                let response = state.feed(&mut extractor, &buf[..count]);
                if !response.is_empty() {
                    socket.write_all(response.as_bytes()).await?;
                }
            }
            _ = ticker.tick() => {
                let pending = state.notifications_since(&mut cursor).concat();
                if !pending.is_empty() {
                    socket.write_all(pending.as_bytes()).await?;
                }
            }
        }
    }
}

/// Accepts clients on an already bound listener.
pub async fn serve(state: Arc<SharedStation>, listener: TcpListener) -> std::io::Result<()> {
    loop {
        let (socket, addr) = listener.accept().await?;
        log::info!("[DCC++] Client connected: {addr}");
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            match handle_client(state, socket).await {
                Ok(()) => log::info!("[DCC++] Client disconnected: {addr}"),
                Err(err) => log::warn!("[DCC++] Client {addr} dropped: {err}"),
            }
        });
    }
}

/// Binds and runs the DCC++ listener.
pub async fn run_tcp_server(state: Arc<SharedStation>, config: TcpServerConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.addr).await?;
    log::info!("[DCC++] Listening on {}", config.addr);
    serve(state, listener).await
}

/// Spawns the loop that drives the scheduler.
pub fn spawn_update_loop(state: Arc<SharedStation>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPDATE_INTERVAL);
        loop {
            interval.tick().await;
            state.tick();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Scheduler;
    use crate::{CommandStation, StationConfig};

    async fn start() -> (Arc<SharedStation>, SocketAddr) {
        let state = Arc::new(SharedStation::new(
            CommandStation::with_mocks(StationConfig::default()),
            Scheduler::new(),
        ));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(Arc::clone(&state), listener));
        (state, addr)
    }

    async fn read_reply(socket: &mut TcpStream) -> String {
        let mut buf = [0u8; 256];
        let count = socket.read(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf[..count]).into_owned()
    }

    #[tokio::test]
    async fn answers_frames() {
        let (_state, addr) = start().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"<Z 1 16 0>").await.unwrap();
        assert_eq!(read_reply(&mut client).await, "<O>");

        client.write_all(b"<Z 1").await.unwrap();
        client.write_all(b" 1>").await.unwrap();
        assert_eq!(read_reply(&mut client).await, "<Y 1 0>");
    }

    #[tokio::test]
    async fn notifications_reach_clients() {
        let (state, addr) = start().await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        // Let the connection register its cursor
        client.write_all(b"<F>").await.unwrap();
        assert_eq!(read_reply(&mut client).await, "<f 180000>");

        state.with_station(|station| station.ctx.notify("<Q 3>".to_string()));
        assert_eq!(read_reply(&mut client).await, "<Q 3>");
    }
}
