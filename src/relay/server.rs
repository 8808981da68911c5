//! Roll relay server
//!
//! HTTP and WebSocket endpoints carrying rolls from the master screen to
//! remote player screens:
//!
//! | Route           | Effect                                          |
//! |-----------------|-------------------------------------------------|
//! | `POST /roll`    | replace the current roll and broadcast it (204) |
//! | `DELETE /roll`  | clear the current roll and broadcast it (204)   |
//! | `GET /roll`     | current roll as JSON, or 204 when none          |
//! | `GET /ws/roll`  | subscribe to frames, current roll sent first    |

use std::future::Future;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;

use crate::error::Result;
use crate::network::RollFrame;
use crate::roll::RollEvent;

use super::config::RelayConfig;
use super::hub::RelayHub;

/// Roll relay
pub struct RollRelay {
    config: RelayConfig,
    hub: Arc<RelayHub>,
}

impl RollRelay {
    pub fn new(config: RelayConfig) -> Self {
        let hub = Arc::new(RelayHub::new(&config));
        Self { config, hub }
    }

    /// Get a reference to the hub
    pub fn hub(&self) -> &Arc<RelayHub> {
        &self.hub
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Build the router, for mounting into a larger app
    pub fn router(&self) -> Router {
        Router::new()
            .route("/roll", get(get_roll).post(post_roll).delete(delete_roll))
            .route("/ws/roll", get(ws_roll))
            .with_state(Arc::clone(&self.hub))
    }

    /// Run the relay
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Run the relay with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_until(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        tracing::info!(addr = %listener.local_addr()?, "Roll relay listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve_until<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(addr = %listener.local_addr()?, "Roll relay listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
            })
            .await?;
        Ok(())
    }
}

impl Default for RollRelay {
    fn default() -> Self {
        Self::new(RelayConfig::default())
    }
}

async fn get_roll(State(hub): State<Arc<RelayHub>>) -> Response {
    match hub.current().await {
        Some(event) => Json(event).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn post_roll(State(hub): State<Arc<RelayHub>>, body: Bytes) -> StatusCode {
    match serde_json::from_slice::<RollEvent>(&body) {
        Ok(event) if !event.id.is_empty() => {
            hub.publish(event).await;
            StatusCode::NO_CONTENT
        }
        Ok(_) => {
            tracing::warn!("Rejected roll without id");
            StatusCode::BAD_REQUEST
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected malformed roll");
            StatusCode::BAD_REQUEST
        }
    }
}

async fn delete_roll(State(hub): State<Arc<RelayHub>>) -> StatusCode {
    hub.clear().await;
    StatusCode::NO_CONTENT
}

async fn ws_roll(ws: WebSocketUpgrade, State(hub): State<Arc<RelayHub>>) -> Response {
    ws.on_upgrade(move |socket| relay_socket(socket, hub))
}

async fn relay_socket(mut socket: WebSocket, hub: Arc<RelayHub>) {
    let (mut rx, catchup) = hub.subscribe().await;

    let delivered = match catchup {
        Some(event) => send_frame(&mut socket, &RollFrame::Roll(event)).await,
        None => true,
    };

    if delivered {
        loop {
            tokio::select! {
                frame = rx.recv() => {
                    let frame = match frame {
                        Ok(frame) => frame,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped = skipped, "Subscriber lagged, resending current roll");
                            hub.current_frame().await
                        }
                        Err(RecvError::Closed) => break,
                    };

                    if !send_frame(&mut socket, &frame).await {
                        break;
                    }
                }
                msg = socket.recv() => match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Inbound frames are ignored
                    Some(Ok(_)) => {}
                },
            }
        }
    }

    hub.unsubscribe();
}

/// Returns false once the socket is gone
async fn send_frame(socket: &mut WebSocket, frame: &RollFrame) -> bool {
    let text = match frame.to_json() {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode frame");
            return true;
        }
    };

    socket.send(Message::Text(text.into())).await.is_ok()
}
