//! # Push Channel Client
//!
//! WebSocket client with automatic reconnection and a caller-supplied
//! event handler.
//!
//! ## Connection Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Channel Connection States                       │
//! │                                                                     │
//! │  ┌────────────┐   handshake ok   ┌────────────┐                     │
//! │  │ Connecting │ ───────────────► │    Open    │                     │
//! │  └─────┬──────┘                  └─────┬──────┘                     │
//! │        │ failure/timeout              │ close / error               │
//! │        ▼                              ▼                             │
//! │  ┌──────────────────────────────────────────┐                       │
//! │  │          ClosedPendingReconnect          │ ──── base + jitter ─┐ │
//! │  └─────────────────────┬────────────────────┘                     │ │
//! │                        │ close()              back to Connecting ◄┘ │
//! │                        ▼                                            │
//! │  ┌──────────────────────────────────────────┐                       │
//! │  │        ClosedFinal (irreversible)        │                       │
//! │  └──────────────────────────────────────────┘                       │
//! │                                                                     │
//! │  RECONNECT DELAY: fixed 1.5s base + uniform jitter up to 2s,        │
//! │  retried indefinitely. Flat on purpose: an idle retry is cheap,     │
//! │  the channel is best-effort, and the jitter spreads reconnect       │
//! │  storms across clients.                                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Handler Contract
//! The handler runs synchronously in the delivery context, in strict
//! frame arrival order. Handler panics are caught and logged at the call
//! site; they never close the connection. After [`ChannelHandle::close`]
//! the handler is never invoked again.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

use shelf_core::ChangeEvent;

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::protocol::decode_frame;

// =============================================================================
// Channel State
// =============================================================================

/// Connection state of the channel client. Owned exclusively by the
/// client; observers only read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelState {
    /// Handshake in progress.
    Connecting = 0,
    /// Connected and delivering events.
    Open = 1,
    /// Connection lost; reconnect timer pending.
    ClosedPendingReconnect = 2,
    /// Explicitly shut down. Terminal.
    ClosedFinal = 3,
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelState::Connecting => write!(f, "connecting"),
            ChannelState::Open => write!(f, "open"),
            ChannelState::ClosedPendingReconnect => write!(f, "closed-pending-reconnect"),
            ChannelState::ClosedFinal => write!(f, "closed-final"),
        }
    }
}

// =============================================================================
// Channel Configuration
// =============================================================================

/// Configuration for the channel client.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Endpoint to connect to. Resolved once; reconnects reuse it.
    pub url: Url,

    /// Handshake timeout.
    pub connect_timeout: Duration,

    /// Fixed component of the reconnect delay.
    pub reconnect_base: Duration,

    /// Upper bound of the uniform random jitter added to the base.
    pub reconnect_jitter: Duration,
}

impl ChannelConfig {
    /// Resolves the channel endpoint and timings from the sync config.
    pub fn resolve(config: &SyncConfig) -> SyncResult<Self> {
        Ok(ChannelConfig {
            url: config.channel_url()?,
            connect_timeout: Duration::from_secs(config.channel.connect_timeout_secs),
            reconnect_base: config.reconnect_base(),
            reconnect_jitter: config.reconnect_jitter(),
        })
    }
}

// =============================================================================
// Event Handler
// =============================================================================

/// Receiver for decoded channel events.
///
/// Invoked synchronously from the delivery context. Implementations
/// should be quick; panics are isolated and logged.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: ChangeEvent);
}

// =============================================================================
// Channel Handle
// =============================================================================

/// Shared flags between the handle and the client task.
struct Shared {
    /// Current connection state (a `ChannelState` as u8).
    state: AtomicU8,

    /// Terminal flag. Once set, no reconnect fires and no event is
    /// delivered, even if a timer or in-flight frame races the shutdown.
    closed: AtomicBool,
}

impl Shared {
    fn set_state(&self, state: ChannelState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn state(&self) -> ChannelState {
        match self.state.load(Ordering::SeqCst) {
            0 => ChannelState::Connecting,
            1 => ChannelState::Open,
            2 => ChannelState::ClosedPendingReconnect,
            _ => ChannelState::ClosedFinal,
        }
    }
}

/// Handle for interacting with a running channel client.
#[derive(Clone)]
pub struct ChannelHandle {
    shared: Arc<Shared>,
    outgoing_tx: mpsc::Sender<serde_json::Value>,
    shutdown_tx: mpsc::Sender<()>,
}

impl ChannelHandle {
    /// Current connection state.
    pub fn state(&self) -> ChannelState {
        self.shared.state()
    }

    /// Returns true while the connection is open.
    pub fn is_open(&self) -> bool {
        self.shared.state() == ChannelState::Open
    }

    /// Best-effort send. Silently a no-op when the connection is not
    /// open; nothing is buffered for later.
    pub fn send(&self, payload: serde_json::Value) {
        if !self.is_open() {
            debug!("Channel not open, dropping outbound payload");
            return;
        }
        if let Err(e) = self.outgoing_tx.try_send(payload) {
            debug!(error = %e, "Outbound queue unavailable, dropping payload");
        }
    }

    /// Shuts the client down. Idempotent and terminal: cancels any
    /// pending reconnect timer, closes the live connection if present,
    /// and guarantees the handler is never invoked again. There is no
    /// reopen.
    pub async fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return; // already closed
        }
        let _ = self.shutdown_tx.send(()).await;
    }
}

// =============================================================================
// Channel Client
// =============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reconnecting push-channel client.
///
/// ## Usage
/// ```rust,ignore
/// let config = ChannelConfig::resolve(&sync_config)?;
/// let handle = ChannelClient::connect(config, Arc::new(controller.clone()));
/// // ... later
/// handle.close().await;
/// ```
pub struct ChannelClient {
    config: ChannelConfig,
    shared: Arc<Shared>,
    handler: Arc<dyn EventHandler>,
    outgoing_rx: mpsc::Receiver<serde_json::Value>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl ChannelClient {
    /// Spawns the client task and immediately begins connecting.
    ///
    /// Dropping every clone of the returned handle also shuts the
    /// client down.
    pub fn connect(config: ChannelConfig, handler: Arc<dyn EventHandler>) -> ChannelHandle {
        let (outgoing_tx, outgoing_rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let shared = Arc::new(Shared {
            state: AtomicU8::new(ChannelState::Connecting as u8),
            closed: AtomicBool::new(false),
        });

        let client = ChannelClient {
            config,
            shared: shared.clone(),
            handler,
            outgoing_rx,
            shutdown_rx,
        };

        tokio::spawn(client.run());

        ChannelHandle {
            shared,
            outgoing_tx,
            shutdown_tx,
        }
    }

    /// Main client loop: connect, pump, back off, repeat until closed.
    async fn run(mut self) {
        info!(url = %self.config.url, "Channel client starting");

        loop {
            if self.shared.closed.load(Ordering::SeqCst) || self.shutdown_rx.try_recv().is_ok() {
                break;
            }

            self.shared.set_state(ChannelState::Connecting);

            if let Some(ws_stream) = self.establish().await {
                info!("Channel connected");
                self.shared.set_state(ChannelState::Open);
                self.connection_loop(ws_stream).await;
            }

            if self.shared.closed.load(Ordering::SeqCst) {
                break;
            }

            self.shared.set_state(ChannelState::ClosedPendingReconnect);
            let delay = self.reconnect_delay();
            debug!(?delay, "Waiting before reconnect");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown_rx.recv() => {
                    self.shared.closed.store(true, Ordering::SeqCst);
                    break;
                }
            }
        }

        self.shared.set_state(ChannelState::ClosedFinal);
        info!("Channel client stopped");
    }

    /// Attempts the WebSocket handshake with a timeout. Failures are
    /// logged, never surfaced: the reconnect loop is the recovery.
    async fn establish(&self) -> Option<WsStream> {
        let connect_future = connect_async(self.config.url.as_str());

        match timeout(self.connect_timeout(), connect_future).await {
            Ok(Ok((ws_stream, response))) => {
                debug!(status = ?response.status(), "Channel handshake complete");
                Some(ws_stream)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Channel connect failed");
                None
            }
            Err(_) => {
                warn!(timeout = ?self.connect_timeout(), "Channel connect timed out");
                None
            }
        }
    }

    /// Pumps one live connection until it closes.
    ///
    /// Transport errors are treated like an unexpected close: try to
    /// close the socket cleanly and return, letting the caller's
    /// reconnect path take over.
    async fn connection_loop(&mut self, ws_stream: WsStream) {
        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                Some(payload) = self.outgoing_rx.recv() => {
                    let text = payload.to_string();
                    if let Err(e) = write.send(WsMessage::Text(text.into())).await {
                        warn!(error = %e, "Outbound send failed, closing connection");
                        let _ = write.send(WsMessage::Close(None)).await;
                        return;
                    }
                }

                frame = read.next() => {
                    match frame {
                        Some(Ok(WsMessage::Text(text))) => self.deliver(&text),
                        Some(Ok(WsMessage::Ping(data))) => {
                            if write.send(WsMessage::Pong(data)).await.is_err() {
                                return;
                            }
                        }
                        Some(Ok(WsMessage::Pong(_))) => {
                            debug!("Received pong");
                        }
                        Some(Ok(WsMessage::Close(frame))) => {
                            info!(?frame, "Channel closed by server");
                            return;
                        }
                        Some(Ok(WsMessage::Binary(_))) => {
                            warn!("Ignoring unexpected binary frame");
                        }
                        Some(Ok(WsMessage::Frame(_))) => {
                            // Raw frame, ignore
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "Channel transport error");
                            let _ = write.send(WsMessage::Close(None)).await;
                            return;
                        }
                        None => {
                            info!("Channel stream ended");
                            return;
                        }
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown requested, closing channel");
                    self.shared.closed.store(true, Ordering::SeqCst);
                    let _ = write.send(WsMessage::Close(None)).await;
                    return;
                }
            }
        }
    }

    /// Decodes one text frame and hands it to the handler.
    ///
    /// Decode failures are logged and dropped without touching the
    /// connection. Handler panics are caught here so a buggy handler
    /// cannot take the channel down.
    fn deliver(&self, text: &str) {
        // A frame already in flight when close() lands must not reach
        // the handler.
        if self.shared.closed.load(Ordering::SeqCst) {
            return;
        }

        let event = match decode_frame(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Dropping malformed channel frame");
                return;
            }
        };

        debug!(kind = event.kind(), id = event.product_id(), "Channel event");

        let handler = self.handler.clone();
        if catch_unwind(AssertUnwindSafe(|| handler.on_event(event))).is_err() {
            error!("Event handler panicked; event discarded");
        }
    }

    fn connect_timeout(&self) -> Duration {
        self.config.connect_timeout
    }

    fn reconnect_delay(&self) -> Duration {
        let jitter_ms = self.config.reconnect_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 { 0 } else { fastrand::u64(0..jitter_ms) };
        self.config.reconnect_base + Duration::from_millis(jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::Mutex;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    fn test_config(addr: SocketAddr) -> ChannelConfig {
        ChannelConfig {
            url: Url::parse(&format!("ws://{addr}/ws")).unwrap(),
            connect_timeout: Duration::from_secs(2),
            reconnect_base: Duration::from_millis(50),
            reconnect_jitter: Duration::from_millis(20),
        }
    }

    fn frame(id: i64, kind: &str) -> String {
        format!(
            r#"{{"type":"{kind}","product":{{"id":{id},"name":"P{id}","sku":"SKU-{id}","category":"Test"}}}}"#
        )
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<ChangeEvent>>,
        /// Panic when an event for this id arrives (before recording).
        panic_on: Option<i64>,
    }

    impl EventHandler for Recorder {
        fn on_event(&self, event: ChangeEvent) {
            if Some(event.product_id()) == self.panic_on {
                panic!("handler failure injected for test");
            }
            self.events.lock().unwrap().push(event);
        }
    }

    impl Recorder {
        fn count(&self) -> usize {
            self.events.lock().unwrap().len()
        }
    }

    async fn wait_for_count(recorder: &Recorder, n: usize) {
        timeout(Duration::from_secs(5), async {
            while recorder.count() < n {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("timed out waiting for events");
    }

    /// Accepts one connection, sends the given frames, then keeps the
    /// socket open until the peer goes away.
    async fn serve_once(listener: &TcpListener, frames: Vec<String>) {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        for f in frames {
            ws.send(WsMessage::Text(f.into())).await.unwrap();
        }
        while let Some(msg) = ws.next().await {
            if matches!(msg, Ok(WsMessage::Close(_)) | Err(_)) {
                break;
            }
        }
    }

    #[tokio::test]
    async fn delivers_events_and_drops_malformed_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            serve_once(
                &listener,
                vec![
                    "this is not json".to_string(),
                    r#"{"type":"CREATE"}"#.to_string(),
                    frame(1, "CREATE"),
                ],
            )
            .await;
        });

        let recorder = Arc::new(Recorder::default());
        let handle = ChannelClient::connect(test_config(addr), recorder.clone());

        wait_for_count(&recorder, 1).await;
        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(events, vec![ChangeEvent::Created(shelf_core::Product {
            id: 1,
            name: "P1".into(),
            sku: "SKU-1".into(),
            category: "Test".into(),
            stock: None,
            image_url: None,
        })]);

        handle.close().await;
    }

    #[tokio::test]
    async fn reconnects_after_server_drop() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // First connection: one event, then drop the socket.
            {
                let (stream, _) = listener.accept().await.unwrap();
                let mut ws = accept_async(stream).await.unwrap();
                ws.send(WsMessage::Text(frame(1, "CREATE").into())).await.unwrap();
            }
            // Second connection after the client's backoff.
            serve_once(&listener, vec![frame(2, "CREATE")]).await;
        });

        let recorder = Arc::new(Recorder::default());
        let handle = ChannelClient::connect(test_config(addr), recorder.clone());

        wait_for_count(&recorder, 2).await;
        let ids: Vec<i64> = recorder.events.lock().unwrap().iter().map(|e| e.product_id()).collect();
        assert_eq!(ids, vec![1, 2]);

        handle.close().await;
    }

    #[tokio::test]
    async fn closed_client_never_reconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let reconnected = Arc::new(AtomicBool::new(false));
        let reconnected_srv = reconnected.clone();
        tokio::spawn(async move {
            serve_once(&listener, vec![frame(1, "CREATE")]).await;
            // Any accept after the close below is a spec violation.
            if listener.accept().await.is_ok() {
                reconnected_srv.store(true, Ordering::SeqCst);
            }
        });

        let recorder = Arc::new(Recorder::default());
        let handle = ChannelClient::connect(test_config(addr), recorder.clone());
        wait_for_count(&recorder, 1).await;

        handle.close().await;

        // Past the maximum possible reconnect delay (base + jitter).
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(handle.state(), ChannelState::ClosedFinal);
        assert!(!reconnected.load(Ordering::SeqCst));
        assert_eq!(recorder.count(), 1);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // nothing listening: client sits in its retry loop

        let recorder = Arc::new(Recorder::default());
        let handle = ChannelClient::connect(test_config(addr), recorder.clone());

        handle.close().await;
        handle.close().await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(handle.state(), ChannelState::ClosedFinal);
    }

    #[tokio::test]
    async fn send_before_open_is_a_noop() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let recorder = Arc::new(Recorder::default());
        let handle = ChannelClient::connect(test_config(addr), recorder);

        assert!(!handle.is_open());
        handle.send(serde_json::json!({ "hello": true })); // must not panic or buffer
        handle.close().await;
    }

    #[tokio::test]
    async fn handler_panic_does_not_kill_the_channel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            serve_once(&listener, vec![frame(13, "CREATE"), frame(14, "CREATE")]).await;
        });

        let recorder = Arc::new(Recorder {
            events: Mutex::new(Vec::new()),
            panic_on: Some(13),
        });
        let handle = ChannelClient::connect(test_config(addr), recorder.clone());

        wait_for_count(&recorder, 1).await;
        assert_eq!(recorder.events.lock().unwrap()[0].product_id(), 14);

        handle.close().await;
    }

    #[tokio::test]
    async fn reconnect_delay_stays_within_window() {
        let config = ChannelConfig {
            url: Url::parse("ws://localhost:1/ws").unwrap(),
            connect_timeout: Duration::from_secs(1),
            reconnect_base: Duration::from_millis(1500),
            reconnect_jitter: Duration::from_millis(2000),
        };
        let (_tx, outgoing_rx) = mpsc::channel(1);
        let (_stx, shutdown_rx) = mpsc::channel(1);
        let client = ChannelClient {
            config,
            shared: Arc::new(Shared {
                state: AtomicU8::new(0),
                closed: AtomicBool::new(false),
            }),
            handler: Arc::new(Recorder::default()),
            outgoing_rx,
            shutdown_rx,
        };

        for _ in 0..100 {
            let d = client.reconnect_delay();
            assert!(d >= Duration::from_millis(1500));
            assert!(d < Duration::from_millis(3500));
        }
    }
}
