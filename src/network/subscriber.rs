//! Subscribe path: relay → player screen
//!
//! A player screen keeps one WebSocket open to the relay's `/ws/roll`
//! endpoint and mirrors every frame into its [`RollState`].
//!
//! # Connection lifecycle
//!
//! ```text
//!            connect()
//!               │
//!               ▼
//!   ┌──► [Connecting] ──fail──┐
//!   │           │ open        │
//!   │           ▼             │
//!   │      [Streaming] ──close/error──┐
//!   │                         │       │
//!   │                         ▼       ▼
//!   │                     code == 1000 or no URL? ──yes──► [Stopped]
//!   │                         │ no
//!   │                         ▼
//!   └──── sleep(reconnect_delay) ◄── [Waiting]
//! ```
//!
//! All of this runs in one task per subscriber, so there is never more than
//! one socket or one pending reconnect timer. `connect()` replaces the task;
//! `disconnect()` stops it, closing an open socket with code 1000.

use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::local::store::lock;
use crate::state::{RollState, CONNECTION_FAILED, NO_SERVER_URL};
use crate::stats::BroadcastCounters;

use super::config::{NetworkConfig, MANUAL_CLOSE_CODE};
use super::endpoint::ServerTarget;
use super::frame::RollFrame;

/// Close code reported when the connection dropped without a close frame
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// Close code reported when a close frame carried no status
pub const NO_STATUS_CODE: u16 = 1005;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Owner of the WebSocket subscription of one view
pub struct RollSubscriber {
    config: NetworkConfig,
    target: ServerTarget,
    state: Arc<RollState>,
    counters: Arc<BroadcastCounters>,
    /// Bumped whenever the running task is replaced or stopped; state writes
    /// from a task hold this lock
    generation: Arc<Mutex<u64>>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl RollSubscriber {
    pub fn new(
        config: NetworkConfig,
        target: ServerTarget,
        state: Arc<RollState>,
        counters: Arc<BroadcastCounters>,
    ) -> Self {
        Self {
            config,
            target,
            state,
            counters,
            generation: Arc::new(Mutex::new(0)),
            shutdown: Mutex::new(None),
        }
    }

    /// Open the subscription, replacing any existing one
    ///
    /// Must be called from within a Tokio runtime. Without a configured
    /// server URL this only records a connection error.
    pub fn connect(&self) {
        let mut shutdown = lock(&self.shutdown);
        let generation = {
            let mut current = lock(&self.generation);
            *current += 1;
            if let Some(previous) = shutdown.take() {
                let _ = previous.send(());
                self.state.set_connected(false);
            }
            *current
        };

        if !self.target.is_configured() {
            tracing::warn!("Cannot connect: no server URL");
            self.state.set_connection_error(Some(NO_SERVER_URL));
            return;
        }
        self.state.set_connection_error(None);

        let (tx, rx) = oneshot::channel();
        let task = SubscriptionTask {
            config: self.config.clone(),
            target: self.target.clone(),
            state: Arc::clone(&self.state),
            counters: Arc::clone(&self.counters),
            current: Arc::clone(&self.generation),
            generation,
        };
        tokio::spawn(task.run(rx));

        *shutdown = Some(tx);
    }

    /// Close the subscription and cancel any pending reconnect
    pub fn disconnect(&self) {
        let previous = lock(&self.shutdown).take();
        {
            let mut current = lock(&self.generation);
            *current += 1;
            self.state.set_connected(false);
        }

        if let Some(previous) = previous {
            let _ = previous.send(());
        }
        tracing::info!("WebSocket disconnected");
    }

    /// Whether a connection task is running (connected, connecting or waiting)
    pub fn is_active(&self) -> bool {
        lock(&self.shutdown)
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }
}

impl Drop for RollSubscriber {
    fn drop(&mut self) {
        *lock(&self.generation) += 1;
        if let Some(previous) = lock(&self.shutdown).take() {
            let _ = previous.send(());
        }
    }
}

/// How a streaming session ended
enum SessionEnd {
    /// `disconnect()` was called; the close frame has been sent
    Manual,
    /// The socket closed with this code
    Closed(u16),
}

struct SubscriptionTask {
    config: NetworkConfig,
    target: ServerTarget,
    state: Arc<RollState>,
    counters: Arc<BroadcastCounters>,
    current: Arc<Mutex<u64>>,
    generation: u64,
}

impl SubscriptionTask {
    fn is_current(&self) -> bool {
        *lock(&self.current) == self.generation
    }

    /// Run `update` only while this task is still the current one
    ///
    /// The generation lock is held across the check and the update, so a
    /// concurrent `disconnect()` either happens before (and `update` is
    /// skipped) or after (and overwrites it).
    fn if_current(&self, update: impl FnOnce()) -> bool {
        let current = lock(&self.current);
        if *current != self.generation {
            return false;
        }
        update();
        true
    }

    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        loop {
            if !self.is_current() {
                return;
            }
            let Some(endpoints) = self.target.get() else {
                tracing::warn!("Cannot connect: no server URL");
                self.if_current(|| self.state.set_connection_error(Some(NO_SERVER_URL)));
                return;
            };
            let url = endpoints.stream_url();

            self.counters.connect_attempt();
            tracing::info!(url = %url, "Connecting WebSocket");

            let connected = tokio::select! {
                biased;
                _ = &mut shutdown => return,
                result = connect_async(url.as_str()) => result,
            };

            let code = match connected {
                Ok((socket, _)) => {
                    self.on_open();
                    match self.stream(socket, &mut shutdown).await {
                        SessionEnd::Manual => return,
                        SessionEnd::Closed(code) => code,
                    }
                }
                Err(e) => {
                    tracing::error!(url = %url, error = %e, "WebSocket connect failed");
                    self.on_error();
                    ABNORMAL_CLOSE_CODE
                }
            };

            if !self.on_close(code) {
                return;
            }

            self.counters.reconnect_scheduled();
            tracing::info!(
                delay_ms = self.config.reconnect_delay.as_millis() as u64,
                "Scheduling reconnect"
            );

            tokio::select! {
                biased;
                _ = &mut shutdown => return,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
            tracing::info!("Reconnecting");
        }
    }

    async fn stream(&self, socket: Socket, shutdown: &mut oneshot::Receiver<()>) -> SessionEnd {
        let (mut write, mut read) = socket.split();

        loop {
            tokio::select! {
                biased;
                _ = &mut *shutdown => {
                    let frame = CloseFrame {
                        code: CloseCode::from(MANUAL_CLOSE_CODE),
                        reason: self.config.manual_close_reason.clone().into(),
                    };
                    if let Err(e) = write.send(Message::Close(Some(frame))).await {
                        tracing::debug!(error = %e, "Close frame not sent");
                    }
                    return SessionEnd::Manual;
                }
                next = read.next() => match next {
                    Some(Ok(Message::Text(text))) => self.on_text(text.as_str()),
                    Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                        Ok(text) => self.on_text(text),
                        Err(e) => {
                            self.counters.malformed_frame();
                            tracing::warn!(error = %e, "Dropping non-UTF-8 binary frame");
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame
                            .map(|f| u16::from(f.code))
                            .unwrap_or(NO_STATUS_CODE);
                        // Send the queued close reply before the socket is dropped
                        if let Err(e) = write.flush().await {
                            tracing::debug!(error = %e, "Close reply not sent");
                        }
                        return SessionEnd::Closed(code);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "WebSocket error");
                        self.on_error();
                        return SessionEnd::Closed(ABNORMAL_CLOSE_CODE);
                    }
                    None => return SessionEnd::Closed(ABNORMAL_CLOSE_CODE),
                }
            }
        }
    }

    fn on_open(&self) {
        let opened = self.if_current(|| {
            self.state.set_connected(true);
            self.state.set_connection_error(None);
        });
        if opened {
            tracing::info!("WebSocket connected");
        }
    }

    fn on_error(&self) {
        self.if_current(|| self.state.set_connection_error(Some(CONNECTION_FAILED)));
    }

    /// Record the close and decide whether to reconnect
    fn on_close(&self, code: u16) -> bool {
        if !self.if_current(|| self.state.set_connected(false)) {
            return false;
        }
        tracing::info!(code, "WebSocket closed");

        code != MANUAL_CLOSE_CODE && self.target.is_configured()
    }

    fn on_text(&self, text: &str) {
        self.counters.frame_received();

        match RollFrame::parse(text) {
            Ok(Some(frame)) => {
                match &frame {
                    RollFrame::Roll(event) => {
                        tracing::debug!(roll_id = %event.id, status = ?event.status, "Roll frame")
                    }
                    RollFrame::Clear => tracing::debug!("Clear frame"),
                }
                self.if_current(|| self.state.set_roll(frame.into_slot()));
            }
            Ok(None) => tracing::debug!("Ignoring unrecognized frame"),
            Err(e) => {
                self.counters.malformed_frame();
                tracing::warn!(error = %e, "Dropping malformed frame");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::net::TcpListener;
    use tokio::sync::Notify;
    use tokio_tungstenite::accept_async;

    use super::*;
    use crate::network::Endpoints;
    use crate::roll::RollSlot;

    type ServerSocket = WebSocketStream<TcpStream>;

    /// Serve every connection with `script`; counts accepted connections
    async fn scripted_server<F, Fut>(script: F) -> (ServerTarget, Arc<AtomicUsize>)
    where
        F: Fn(ServerSocket) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);
        let script = Arc::new(script);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let script = Arc::clone(&script);
                tokio::spawn(async move {
                    if let Ok(ws) = accept_async(stream).await {
                        script(ws).await;
                    }
                });
            }
        });

        let target = ServerTarget::new();
        target.set(Endpoints::from_server_url(&format!("http://{}/detect", addr)).unwrap());
        (target, accepted)
    }

    async fn close_with(mut ws: ServerSocket, code: CloseCode) {
        let _ = ws
            .close(Some(CloseFrame {
                code,
                reason: "scripted".into(),
            }))
            .await;
        while let Some(Ok(_)) = ws.next().await {}
    }

    async fn hold_open(mut ws: ServerSocket) {
        while let Some(Ok(_)) = ws.next().await {}
    }

    fn subscriber(target: ServerTarget, delay_ms: u64) -> (RollSubscriber, Arc<RollState>, Arc<BroadcastCounters>) {
        let state = Arc::new(RollState::new());
        let counters = Arc::new(BroadcastCounters::new());
        let config = NetworkConfig::default().reconnect_delay(Duration::from_millis(delay_ms));
        let subscriber = RollSubscriber::new(config, target, Arc::clone(&state), Arc::clone(&counters));
        (subscriber, state, counters)
    }

    async fn wait_until<F: Fn() -> bool>(condition: F) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_frames_drive_current_roll() {
        let send_clear = Arc::new(Notify::new());
        let gate = Arc::clone(&send_clear);
        let (target, _) = scripted_server(move |mut ws: ServerSocket| {
            let gate = Arc::clone(&gate);
            async move {
                let roll = r#"{"type":"roll","data":{"id":"roll_1","status":"rolling","playerName":"Aria","modifier":2}}"#;
                ws.send(Message::Text(roll.into())).await.unwrap();
                ws.send(Message::Text("{broken".into())).await.unwrap();
                ws.send(Message::Text(r#"{"type":"dice-detected","data":{}}"#.into())).await.unwrap();
                gate.notified().await;
                ws.send(Message::Text(r#"{"type":"clear"}"#.into())).await.unwrap();
                hold_open(ws).await;
            }
        })
        .await;
        let (subscriber, state, counters) = subscriber(target, 2_000);
        let mut roll_rx = state.watch_roll();

        subscriber.connect();

        roll_rx.changed().await.unwrap();
        let slot = roll_rx.borrow_and_update().clone();
        let event = slot.event().expect("roll frame applied");
        assert_eq!(event.player_name, "Aria");
        assert_eq!(event.modifier, 2);

        // Malformed and unknown frames are counted but leave the slot alone
        wait_until(|| counters.snapshot().frames_received == 3).await;
        assert!(!roll_rx.has_changed().unwrap());
        assert_eq!(counters.snapshot().malformed_frames, 1);

        send_clear.notify_one();
        roll_rx.changed().await.unwrap();
        assert_eq!(*roll_rx.borrow_and_update(), RollSlot::Cleared);

        assert!(state.is_connected());
        assert_eq!(state.connection_error(), None);
        assert_eq!(counters.snapshot().frames_received, 4);

        subscriber.disconnect();
    }

    #[tokio::test]
    async fn test_stale_task_cannot_mark_connected() {
        let state = Arc::new(RollState::new());
        let task = SubscriptionTask {
            config: NetworkConfig::default(),
            target: ServerTarget::new(),
            state: Arc::clone(&state),
            counters: Arc::new(BroadcastCounters::new()),
            current: Arc::new(Mutex::new(2)),
            generation: 1,
        };

        task.on_open();
        task.on_text(r#"{"type":"clear"}"#);

        assert!(!state.is_connected());
        assert_eq!(state.roll(), RollSlot::Empty);
        assert!(!task.on_close(1006));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_disconnect_during_handshake_stays_disconnected() {
        let (target, _) = scripted_server(hold_open).await;
        let (subscriber, state, _counters) = subscriber(target, 20);

        for _ in 0..20 {
            subscriber.connect();
            tokio::task::yield_now().await;
            subscriber.disconnect();
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(!state.is_connected());
        assert!(!subscriber.is_active());
    }

    #[tokio::test]
    async fn test_server_close_is_acknowledged() {
        let (ack_tx, ack_rx) = oneshot::channel::<bool>();
        let ack_tx = Arc::new(Mutex::new(Some(ack_tx)));
        let (target, _) = scripted_server(move |mut ws: ServerSocket| {
            let ack_tx = Arc::clone(&ack_tx);
            async move {
                let _ = ws
                    .close(Some(CloseFrame {
                        code: CloseCode::Normal,
                        reason: "done".into(),
                    }))
                    .await;
                let mut acknowledged = false;
                while let Some(Ok(msg)) = ws.next().await {
                    if let Message::Close(_) = msg {
                        acknowledged = true;
                    }
                }
                if let Some(tx) = ack_tx.lock().unwrap().take() {
                    let _ = tx.send(acknowledged);
                }
            }
        })
        .await;
        let (subscriber, _state, _counters) = subscriber(target, 20);

        subscriber.connect();

        let acknowledged = tokio::time::timeout(Duration::from_secs(5), ack_rx)
            .await
            .unwrap()
            .unwrap();
        assert!(acknowledged);
    }

    #[tokio::test]
    async fn test_abnormal_close_reconnects() {
        let (target, accepted) =
            scripted_server(|ws: ServerSocket| close_with(ws, CloseCode::Error)).await;
        let (subscriber, _state, counters) = subscriber(target, 50);

        subscriber.connect();
        wait_until(|| accepted.load(Ordering::SeqCst) >= 3).await;
        subscriber.disconnect();

        assert!(counters.snapshot().reconnects_scheduled >= 2);
    }

    #[tokio::test]
    async fn test_disconnect_cancels_pending_reconnect() {
        let (target, accepted) =
            scripted_server(|ws: ServerSocket| close_with(ws, CloseCode::Away)).await;
        let (subscriber, state, counters) = subscriber(target, 300);

        subscriber.connect();
        wait_until(|| counters.snapshot().reconnects_scheduled == 1).await;
        assert!(!state.is_connected());

        subscriber.disconnect();
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(accepted.load(Ordering::SeqCst), 1);
        assert_eq!(counters.snapshot().connect_attempts, 1);
        assert!(!subscriber.is_active());
    }

    #[tokio::test]
    async fn test_normal_close_from_server_does_not_reconnect() {
        let (target, accepted) =
            scripted_server(|ws: ServerSocket| close_with(ws, CloseCode::Normal)).await;
        let (subscriber, state, counters) = subscriber(target, 20);
        let mut connected_rx = state.watch_connected();

        subscriber.connect();
        connected_rx.wait_for(|c| *c).await.unwrap();
        connected_rx.wait_for(|c| !*c).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(accepted.load(Ordering::SeqCst), 1);
        assert_eq!(counters.snapshot().reconnects_scheduled, 0);
    }

    #[tokio::test]
    async fn test_close_after_url_cleared_does_not_reconnect() {
        let (target, accepted) = scripted_server(|ws: ServerSocket| async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            close_with(ws, CloseCode::Error).await;
        })
        .await;
        let (subscriber, state, counters) = subscriber(target.clone(), 20);
        let mut connected_rx = state.watch_connected();

        subscriber.connect();
        connected_rx.wait_for(|c| *c).await.unwrap();
        target.set(None);
        connected_rx.wait_for(|c| !*c).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(accepted.load(Ordering::SeqCst), 1);
        assert_eq!(counters.snapshot().reconnects_scheduled, 0);
    }

    #[tokio::test]
    async fn test_manual_disconnect_sends_normal_close() {
        let (code_tx, code_rx) = oneshot::channel::<(u16, String)>();
        let code_tx = Arc::new(Mutex::new(Some(code_tx)));
        let (target, _) = scripted_server(move |mut ws: ServerSocket| {
            let code_tx = Arc::clone(&code_tx);
            async move {
                while let Some(Ok(msg)) = ws.next().await {
                    if let Message::Close(Some(frame)) = msg {
                        if let Some(tx) = code_tx.lock().unwrap().take() {
                            let _ = tx.send((u16::from(frame.code), frame.reason.as_str().to_owned()));
                        }
                        break;
                    }
                }
            }
        })
        .await;
        let (subscriber, state, counters) = subscriber(target, 20);
        let mut connected_rx = state.watch_connected();

        subscriber.connect();
        connected_rx.wait_for(|c| *c).await.unwrap();
        subscriber.disconnect();

        let (code, reason) = code_rx.await.unwrap();
        assert_eq!(code, 1000);
        assert_eq!(reason, "Manual disconnect");
        assert!(!state.is_connected());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counters.snapshot().connect_attempts, 1);
    }

    #[tokio::test]
    async fn test_reconnect_replaces_previous_connection() {
        let (target, accepted) = scripted_server(hold_open).await;
        let (subscriber, state, counters) = subscriber(target, 20);
        let mut connected_rx = state.watch_connected();

        subscriber.connect();
        connected_rx.wait_for(|c| *c).await.unwrap();
        subscriber.connect();
        wait_until(|| accepted.load(Ordering::SeqCst) == 2).await;
        connected_rx.wait_for(|c| *c).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
        assert_eq!(counters.snapshot().reconnects_scheduled, 0);
        subscriber.disconnect();
    }

    #[tokio::test]
    async fn test_connect_without_url() {
        let (subscriber, state, counters) = subscriber(ServerTarget::new(), 20);

        subscriber.connect();

        assert_eq!(state.connection_error().as_deref(), Some("No server URL"));
        assert!(!subscriber.is_active());
        assert_eq!(counters.snapshot().connect_attempts, 0);
    }

    #[tokio::test]
    async fn test_refused_connection_retries() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let target = ServerTarget::new();
        target.set(Endpoints::from_server_url(&format!("http://{}", addr)).unwrap());
        let (subscriber, state, counters) = subscriber(target, 20);

        subscriber.connect();
        wait_until(|| counters.snapshot().connect_attempts >= 2).await;
        subscriber.disconnect();

        assert_eq!(state.connection_error().as_deref(), Some("Connection failed"));
        assert!(!state.is_connected());
    }
}
