use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, error};

use crate::modules::extractors::session::SignedIn;
use crate::state::AppState;
use crate::utils::session::Workspace;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(live_handler))
}

async fn live_handler(ws: WebSocketUpgrade, SignedIn(workspace): SignedIn) -> Response {
    ws.on_upgrade(move |socket| live_socket(socket, workspace))
}

/// Pushes the whole view state on connect and after every change. Incoming
/// frames other than close only trigger a resend.
pub async fn live_socket(stream: WebSocket, workspace: Arc<Workspace>) {
    let (mut sender, mut receiver) = stream.split();
    let mut changes = workspace.watch();

    loop {
        let Ok(view) = workspace.view() else {
            debug!("Live view of {} ended by sign-out", workspace.uid());
            break;
        };
        let text = match serde_json::to_string(&view) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to encode view state: {e}");
                break;
            }
        };
        if sender.send(Message::Text(text)).await.is_err() {
            break;
        }

        tokio::select! {
            changed = changes.changed() => if !changed {
                break;
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = sender.close().await;
    debug!("Live socket of {} closed", workspace.uid());
}
