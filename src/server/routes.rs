use crate::desk::clock::StepCommand;
use crate::desk::registry::AddContractForm;
use crate::errors::{DeskError, DeskResult};
use crate::state::{AppState, DeskEvent, DeskSnapshot};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use std::sync::Arc;
use tokio::sync::oneshot;

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct StepRequest {
    pub percent_change: Option<f64>,
    pub command: Option<StepCommand>,
}

/// GET /api/state -- current desk snapshot (from watch channel, no lock)
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<DeskSnapshot> {
    let snapshot = state.snapshot_rx.borrow().clone();
    Json(snapshot)
}

/// GET /api/history -- price path only
pub async fn get_history(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = state.snapshot_rx.borrow();
    Json(serde_json::json!({
        "symbol": snapshot.symbol,
        "history": snapshot.price_history,
    }))
}

/// GET /api/counters -- performance counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(state.counters.to_json())
}

/// POST /api/step -- either a named command or an explicit percent change
pub async fn post_step(State(state): State<Arc<AppState>>, Json(req): Json<StepRequest>) -> Response {
    let percent_change = match (req.command, req.percent_change) {
        (Some(cmd), _) => cmd.percent_change(),
        (None, Some(pct)) => pct,
        (None, None) => {
            return error_response(DeskError::InvalidInput("need `command` or `percent_change`".into()))
        }
    };

    match dispatch(&state, |reply| DeskEvent::Step { percent_change, reply }).await {
        Ok(Ok(step)) => Json(step).into_response(),
        Ok(Err(e)) | Err(e) => error_response(e),
    }
}

/// POST /api/contracts -- add a contract from form input
pub async fn post_contract(State(state): State<Arc<AppState>>, Json(form): Json<AddContractForm>) -> Response {
    match dispatch(&state, |reply| DeskEvent::AddContract { form, reply }).await {
        Ok(Ok(contract)) => (StatusCode::CREATED, Json(contract)).into_response(),
        Ok(Err(e)) | Err(e) => error_response(e),
    }
}

/// DELETE /api/contracts/{id} -- unknown ids are not an error
pub async fn delete_contract(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match dispatch(&state, |reply| DeskEvent::RemoveContract { id, reply }).await {
        Ok(removed) => Json(serde_json::json!({ "removed": removed })).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/reset -- restart the simulation with the default book
pub async fn post_reset(State(state): State<Arc<AppState>>) -> Response {
    match dispatch(&state, |reply| DeskEvent::Reset { reply }).await {
        Ok(Ok(())) => {
            let snapshot = state.snapshot_rx.borrow().clone();
            Json(snapshot).into_response()
        }
        Ok(Err(e)) | Err(e) => error_response(e),
    }
}

/// Send an event to the desk engine and wait for its reply.
async fn dispatch<T>(
    state: &AppState,
    make_event: impl FnOnce(oneshot::Sender<T>) -> DeskEvent,
) -> DeskResult<T> {
    let (reply_tx, reply_rx) = oneshot::channel();
    state
        .engine_tx
        .send(make_event(reply_tx))
        .await
        .map_err(|_| DeskError::ChannelClosed("desk engine".into()))?;
    reply_rx
        .await
        .map_err(|_| DeskError::ChannelClosed("desk engine dropped reply".into()))
}

fn error_response(e: DeskError) -> Response {
    let status = match e {
        DeskError::InvalidInput(_) | DeskError::Parse(_) => StatusCode::BAD_REQUEST,
        DeskError::ChannelClosed(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
}
