//! Request handlers for the management endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::cache::Fingerprint;
use crate::http::server::AppState;
use crate::security::AuthClaims;

/// How many log records the state report returns.
const RECENT_LOGS_LIMIT: usize = 100;

/// Connectivity check, open to anyone.
pub async fn health() -> &'static str {
    "Connectivity OK"
}

/// Smoke-test endpoint for the auth gateway.
pub async fn secure(Extension(claims): Extension<AuthClaims>) -> String {
    tracing::info!(userid = ?claims.userid(), roles = ?claims.roles(), "secure access");
    "Secure access OK".to_string()
}

/// Start a new processing job.
pub async fn submit_job(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let Some(action) = body.get("action").and_then(Value::as_str) else {
        return (
            StatusCode::BAD_REQUEST,
            "Job start failed: missing action".to_string(),
        )
            .into_response();
    };

    match state.jobs.publish_job(action, &body) {
        Ok(msg) => Json(msg["header"].clone()).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, format!("Job start failed: {e}")).into_response(),
    }
}

/// Remove a job by id.
pub async fn remove_job(State(state): State<AppState>, Path(job_id): Path<i64>) -> Response {
    if state.store.remove_job(job_id) {
        Json(json!({ "job_id": job_id })).into_response()
    } else {
        (StatusCode::NOT_FOUND, "Job not found").into_response()
    }
}

/// Catalog names with their collections.
pub async fn catalogs(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.store.catalogs()))
}

/// Queues on the message broker, passed through with the broker's status.
pub async fn queues(State(state): State<AppState>) -> Response {
    match state.broker.get_queues().await {
        Ok((body, status)) => broker_response(body, status),
        Err(e) => {
            tracing::error!(error = %e, "queue listing failed");
            (StatusCode::BAD_GATEWAY, "Message broker unreachable").into_response()
        }
    }
}

/// Purge a queue on the message broker.
pub async fn purge_queue(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.broker.purge_queue(&name).await {
        Ok((body, status)) => broker_response(body, status),
        Err(e) => {
            tracing::error!(queue = %name, error = %e, "queue purge failed");
            (StatusCode::BAD_GATEWAY, "Message broker unreachable").into_response()
        }
    }
}

fn broker_response(body: Value, status: reqwest::StatusCode) -> Response {
    let status = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(body)).into_response()
}

/// Recent log records, served through the freshness cache: recomputed only
/// when the last logid has advanced.
pub async fn state_logs(State(state): State<AppState>) -> Json<Value> {
    let fingerprint = Fingerprint::from(state.store.last_logid());
    let query = format!("recent_logs limit {RECENT_LOGS_LIMIT}");
    let store = state.store.clone();
    let value = state.cache.resolve("logs", fingerprint, &query, move || {
        serde_json::to_value(store.recent_logs(RECENT_LOGS_LIMIT)).unwrap_or(Value::Null)
    });
    Json(value)
}

/// Last known service heartbeat.
pub async fn state_services(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "last_timestamp": state.store.last_service_timestamp() }))
}
