//! Reload endpoint browsers keep open while a page is displayed.
//!
//! Each connection registers its write half with the shared registry and then
//! reads until the browser goes away.

use crate::error::Result;
use crate::registry::{ClientRegistry, ReloadClient};
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Response},
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Path browsers connect to for reload notifications
pub const RELOAD_PATH: &str = "/ws";

/// Registry shared between the socket handler and the file watcher
pub type SharedRegistry = Arc<ClientRegistry<SocketClient>>;

/// Write half of a browser's reload socket
pub struct SocketClient {
    sink: SplitSink<WebSocket, Message>,
}

impl ReloadClient for SocketClient {
    async fn send(&mut self, message: &str) -> Result<()> {
        self.sink.send(Message::Text(message.to_owned())).await?;
        Ok(())
    }

    async fn close(mut self) {
        if let Err(e) = self.sink.close().await {
            debug!("Error closing reload socket: {e}");
        }
    }
}

/// Upgrade the request to a reload socket.
///
/// Requests that are not valid WebSocket upgrades are logged and rejected.
pub async fn reload_socket(
    upgrade: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(registry): State<SharedRegistry>,
) -> Response {
    match upgrade {
        Ok(ws) => ws
            .on_failed_upgrade(|e| warn!("WebSocket upgrade error: {e}"))
            .on_upgrade(move |socket| handle_socket(socket, registry))
            .into_response(),
        Err(rejection) => {
            warn!("WebSocket upgrade error: {rejection}");
            rejection.into_response()
        }
    }
}

/// Keep the client registered until the browser goes away.
///
/// Inbound messages carry no meaning; reading only detects the disconnect.
async fn handle_socket(socket: WebSocket, registry: SharedRegistry) {
    let (sink, mut stream) = socket.split();
    let id = registry.register(SocketClient { sink }).await;

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    if let Some(client) = registry.unregister(id).await {
        client.close().await;
    }
}
