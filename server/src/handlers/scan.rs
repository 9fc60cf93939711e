use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use gatepass_core::{SyncRequest, SyncResponse, ValidateRequest};
use tracing::info;

use crate::services::{authorize_scanner, export_snapshot, scan_history, sync_offline_scans};
use crate::state::AppState;
use crate::store::TicketStore;
use crate::utils::auth::ActorIdentity;
use crate::utils::error::AppError;
use crate::utils::response::success;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::ValidationError(rejection.body_text()))
}

/// `POST /scan/validate`
pub async fn validate_scan<S: TicketStore>(
    State(state): State<AppState<S>>,
    actor: ActorIdentity,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let request = body(payload)?;
    let qr_code = request.qr_code.trim();
    if qr_code.is_empty() {
        return Err(AppError::ValidationError("qr_code is required".to_string()));
    }

    let (event, scan_actor) = authorize_scanner(&*state.store, actor, request.event_id).await?;
    let verdict = state.gate.validate(qr_code, event.id, scan_actor).await?;
    let outcome = verdict.into_outcome();
    let message = outcome.message.clone();

    Ok(success(outcome, message))
}

/// `GET /scan/{event_id}/history`
pub async fn scan_history_handler<S: TicketStore>(
    State(state): State<AppState<S>>,
    actor: ActorIdentity,
    Path(event_id): Path<i64>,
) -> Result<Response, AppError> {
    let (event, _) = authorize_scanner(&*state.store, actor, event_id).await?;
    let history = scan_history(&*state.store, event.id).await?;
    Ok(success(history, "Scan history retrieved"))
}

/// `GET /scan/{event_id}/offline-data`
pub async fn offline_data<S: TicketStore>(
    State(state): State<AppState<S>>,
    actor: ActorIdentity,
    Path(event_id): Path<i64>,
) -> Result<Response, AppError> {
    let (event, _) = authorize_scanner(&*state.store, actor, event_id).await?;
    let export = export_snapshot(&*state.store, &event, Utc::now()).await?;
    Ok(success(export, "Offline data generated"))
}

/// `POST /scan/{event_id}/sync`
pub async fn sync_scans<S: TicketStore>(
    State(state): State<AppState<S>>,
    actor: ActorIdentity,
    Path(event_id): Path<i64>,
    payload: Result<Json<SyncRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let request = body(payload)?;
    let (event, scan_actor) = authorize_scanner(&*state.store, actor, event_id).await?;

    let synced = sync_offline_scans(&*state.store, event.id, scan_actor, &request.scans).await?;
    info!(event_id = event.id, user_id = actor.user_id, synced, "Offline sync completed");

    let message = format!("{synced} scan(s) synced");
    Ok(success(
        SyncResponse {
            synced,
            message: message.clone(),
        },
        message,
    ))
}
