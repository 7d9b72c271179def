use super::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use sessionstat_engine::StatKind;
use sessionstat_runtime::PublishError;
use sessionstat_types::{SessionEvent, SessionEventKind};

#[derive(Debug, Default, Deserialize)]
pub(super) struct StatParams {
    #[serde(default)]
    user_id: String,
}

pub(super) async fn session_started(State(state): State<AppState>, body: Bytes) -> Response {
    ingest(&state, SessionEventKind::Started, &body)
}

pub(super) async fn session_ended(State(state): State<AppState>, body: Bytes) -> Response {
    ingest(&state, SessionEventKind::Ended, &body)
}

pub(super) async fn mean_time(
    State(state): State<AppState>,
    Query(params): Query<StatParams>,
) -> Response {
    statistic(state, StatKind::Mean, params.user_id).await
}

pub(super) async fn median_time(
    State(state): State<AppState>,
    Query(params): Query<StatParams>,
) -> Response {
    statistic(state, StatKind::Median, params.user_id).await
}

pub(super) async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "sessionstat",
        "version": env!("CARGO_PKG_VERSION"),
        "pending_sessions": state.registrar.pending(),
        "stats": state.events.stats(),
    }))
}

fn ingest(state: &AppState, kind: SessionEventKind, body: &[u8]) -> Response {
    let event = match SessionEvent::from_json(body) {
        Ok(event) => event,
        Err(err) => {
            tracing::debug!(%kind, error = %err, "rejecting malformed event");
            return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
        }
    };

    let result = state.events.publish(kind, event);
    let status = ingest_status(&result);
    match result {
        Ok(()) => status.into_response(),
        Err(err) => {
            tracing::warn!(%kind, error = %err, "event not accepted");
            (status, err.to_string()).into_response()
        }
    }
}

/// Status returned for a publish attempt.
pub fn ingest_status(result: &Result<(), PublishError>) -> StatusCode {
    match result {
        Ok(()) => StatusCode::ACCEPTED,
        Err(PublishError::Full) => StatusCode::SERVICE_UNAVAILABLE,
        Err(PublishError::Closed) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Status returned for a duration query.
pub fn query_status(result: &sessionstat_runtime::Result<Vec<i64>>) -> StatusCode {
    match result {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn statistic(state: AppState, kind: StatKind, user_id: String) -> Response {
    let registrar = state.registrar.clone();
    let joined = tokio::task::spawn_blocking(move || registrar.query(&user_id)).await;

    let result = match joined {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(error = %err, "duration query task failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let status = query_status(&result);
    match result {
        Ok(durations) => (status, kind.apply(&durations).to_string()).into_response(),
        Err(err) => {
            tracing::error!(statistic = kind.name(), error = %err, "duration query failed");
            (status, err.to_string()).into_response()
        }
    }
}
