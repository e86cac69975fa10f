//! Queue depth handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueDepthResponse {
    pub pending_work_size: f64,
}

/// Total work units waiting in (or running from) the ledger.
pub async fn queue_depth(State(state): State<AppState>) -> Json<QueueDepthResponse> {
    Json(QueueDepthResponse {
        pending_work_size: state.ledger().pending_work() as f64,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatusResponse {
    pub busy: bool,
    pub pending_jobs: usize,
    pub pending_work_size: f64,
}

pub async fn queue_status(State(state): State<AppState>) -> Json<QueueStatusResponse> {
    let snapshot = state.ledger().snapshot();
    Json(QueueStatusResponse {
        busy: snapshot.busy,
        pending_jobs: snapshot.pending_jobs,
        pending_work_size: snapshot.pending_work as f64,
    })
}
