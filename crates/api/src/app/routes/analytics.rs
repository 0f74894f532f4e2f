//! Dashboard endpoints: the on-demand snapshot and the live WebSocket feed.
//!
//! A WebSocket connection is one hub subscriber. Snapshots flow
//! hub -> [`ChannelSink`] -> writer task -> socket; the reader task only watches for
//! the client going away. Whichever task finishes first ends the connection.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use shopdesk_infra::{ChannelSink, Subscriber};

use crate::app::errors;
use crate::app::services::AppServices;

/// Snapshots buffered per connection before sends start waiting.
const CONNECTION_BUFFER: usize = 8;

pub fn router() -> Router {
    Router::new()
        .route("/snapshot", get(get_snapshot))
        .route("/ws/dashboard", get(dashboard_ws))
}

pub async fn get_snapshot(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.hub.snapshot_at(Utc::now()).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => errors::data_access_error_to_response(e),
    }
}

pub async fn dashboard_ws(
    ws: WebSocketUpgrade,
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    ws.on_upgrade(move |socket| handle_dashboard_socket(socket, services))
}

async fn handle_dashboard_socket(socket: WebSocket, services: Arc<AppServices>) {
    let (mut sender, mut receiver) = socket.split();
    let (sink, mut snapshots) = ChannelSink::channel(CONNECTION_BUFFER, services.send_timeout);

    let mut writer = tokio::spawn(async move {
        while let Some(snapshot) = snapshots.recv().await {
            let text = match serde_json::to_string(snapshot.as_ref()) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "failed to encode dashboard snapshot");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let subscriber = Subscriber::new(Arc::new(sink));
    let id = match services.hub.subscribe(subscriber).await {
        Ok(id) => id,
        Err(_) => {
            // The hub already dropped the sink, so the writer drains and closes.
            let _ = writer.await;
            return;
        }
    };

    let mut reader = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Close(_)) | Err(_) => break,
                // Keep-alive pings from the client carry no meaning.
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    services.hub.unsubscribe(id);
    debug!(subscriber = %id, "dashboard socket closed");
}
