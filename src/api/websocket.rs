use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

use crate::api::rest::{within, AppState};
use crate::models::HolderProgress;

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// GET /ws/holders/:address
pub async fn holders_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, address))
}

async fn send_frame(sender: &mut SplitSink<WebSocket, Message>, frame: serde_json::Value) -> bool {
    matches!(
        timeout(SEND_TIMEOUT, sender.send(Message::Text(frame.to_string()))).await,
        Ok(Ok(_))
    )
}

fn progress_frame(progress: HolderProgress) -> serde_json::Value {
    json!({
        "type": "progress",
        "processed": progress.processed,
        "target": progress.target,
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, address: String) {
    let (mut sender, mut receiver) = socket.split();
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let scan = within(
        state.scanner.holder_deadline(),
        &cancel,
        state.scanner.holders.scan(&address, Some(&progress_tx), &cancel),
    );
    tokio::pin!(scan);

    let outcome = loop {
        tokio::select! {
            result = &mut scan => break result,

            Some(progress) = progress_rx.recv() => {
                if !send_frame(&mut sender, progress_frame(progress)).await {
                    cancel.cancel();
                    return;
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                        tracing::debug!(
                            "Holder stream for {} closed by client, cancelling",
                            address
                        );
                        cancel.cancel();
                        return;
                    }
                    _ => {}
                }
            }
        }
    };

    // Progress emitted just before completion is still queued.
    while let Ok(progress) = progress_rx.try_recv() {
        if !send_frame(&mut sender, progress_frame(progress)).await {
            return;
        }
    }

    let frame = match outcome {
        Ok(result) => json!({ "type": "result", "data": result }),
        Err(e) => {
            tracing::warn!("Holder stream for {} failed: {}", address, e);
            json!({ "type": "error", "message": e.user_message() })
        }
    };
    if send_frame(&mut sender, frame).await {
        let _ = sender.send(Message::Close(None)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_frame_shape() {
        let frame = progress_frame(HolderProgress { processed: 3, target: 200 });
        assert_eq!(frame, json!({ "type": "progress", "processed": 3, "target": 200 }));
    }
}
