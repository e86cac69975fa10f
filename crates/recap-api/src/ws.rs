//! WebSocket summarize endpoint with backpressure support.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::time::interval;
use tracing::{debug, info, warn};

use recap_models::{StreamMessage, SummarizeRequest};
use recap_pipeline::{ProgressSink, SubmitOutcome, JOB_FAILED_MESSAGE};

use crate::metrics;
use crate::state::AppState;

const ENDPOINT: &str = "summarize";

/// Global counter for active WebSocket connections.
static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

const WS_SEND_BUFFER_SIZE: usize = 32;
const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

fn encode(message: &StreamMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Message::Text(json)),
        Err(e) => {
            warn!("Failed to encode stream message: {}", e);
            None
        }
    }
}

/// Send a frame, blocking when the writer is behind.
async fn send_ws_message(tx: &mpsc::Sender<Message>, message: &StreamMessage) -> bool {
    let Some(frame) = encode(message) else {
        return true;
    };
    match tx.try_send(frame) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(frame)) => {
            debug!("WebSocket send buffer full, applying backpressure");
            tx.send(frame).await.is_ok()
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

/// WebSocket summarize endpoint.
pub async fn ws_summarize(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_ws_active_connections(count);
    metrics::record_ws_connection(ENDPOINT);

    ws.on_upgrade(|socket| async move {
        scopeguard::defer! {
            let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
            metrics::set_ws_active_connections(count);
        }
        handle_summarize_socket(socket, state).await;
    })
}

/// One request per connection: read the first frame, run the job and
/// forward its messages until the terminal one.
async fn handle_summarize_socket(socket: WebSocket, state: AppState) {
    let (ws_sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(WS_SEND_BUFFER_SIZE);

    let send_task = tokio::spawn(async move {
        let mut ws_sender = ws_sender;
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(frame).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    let first = tokio::time::timeout(state.config.ws_client_timeout, receiver.next()).await;
    let request: SummarizeRequest = match first {
        Ok(Some(Ok(Message::Text(text)))) => {
            metrics::record_ws_message_received(ENDPOINT);
            match serde_json::from_str(&text) {
                Ok(request) => request,
                Err(e) => {
                    send_ws_message(&tx, &StreamMessage::error(format!("Invalid request: {}", e))).await;
                    drop(tx);
                    let _ = send_task.await;
                    return;
                }
            }
        }
        Ok(_) | Err(_) => {
            send_ws_message(&tx, &StreamMessage::error("Expected JSON message or connection timeout")).await;
            drop(tx);
            let _ = send_task.await;
            return;
        }
    };

    info!(subjects = request.subjects.len(), "Summarize request received");

    let (sink, mut progress) = ProgressSink::channel(WS_SEND_BUFFER_SIZE);
    let coordinator = state.coordinator.clone();
    let job = tokio::spawn(async move { coordinator.submit(request, &sink).await });

    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            message = progress.recv() => {
                let Some(message) = message else {
                    break;
                };
                last_activity = Instant::now();
                metrics::record_ws_message_sent(ENDPOINT, message.message_type().as_str());
                if !send_ws_message(&tx, &message).await {
                    warn!("WebSocket send failed, client disconnected");
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if last_activity.elapsed() > WS_HEARTBEAT_INTERVAL / 2
                    && tx.send(Message::Ping(Vec::new())).await.is_err()
                {
                    warn!("Heartbeat failed, client disconnected");
                    break;
                }
            }
            client_msg = receiver.next() => {
                match client_msg {
                    Some(Ok(Message::Pong(_))) => last_activity = Instant::now(),
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        info!("Client closed connection");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // A dropped receiver is how the job learns the caller left
    drop(progress);
    finish_job(job.await, &tx).await;

    drop(tx);
    let _ = send_task.await;
}

/// Log how the job ended; a job task that died still owes the caller a
/// terminal frame.
async fn finish_job(joined: Result<SubmitOutcome, JoinError>, tx: &mpsc::Sender<Message>) {
    match joined {
        Ok(SubmitOutcome::Disconnected) => debug!("Job ended after client disconnect"),
        Ok(outcome) => debug!(?outcome, "Job finished"),
        Err(e) => {
            if e.is_panic() {
                warn!(error = ?e, "Job task panicked");
            } else {
                warn!(error = ?e, "Job task cancelled");
            }
            send_ws_message(tx, &StreamMessage::error(JOB_FAILED_MESSAGE)).await;
        }
    }
}
