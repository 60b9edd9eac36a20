use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::handlers::AppState;

fn component_status(healthy: bool) -> &'static str {
    if healthy {
        "UP"
    } else {
        "DOWN"
    }
}

pub async fn health(State(state): State<AppState>) -> Response {
    let db_healthy = match state.repo.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    let storage_healthy = match state.storage.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Object store health check failed");
            false
        }
    };

    let healthy = db_healthy && storage_healthy;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": component_status(healthy),
            "components": {
                "db": { "status": component_status(db_healthy) },
                "storage": { "status": component_status(storage_healthy) }
            },
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
        .into_response()
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

pub async fn info() -> Json<serde_json::Value> {
    Json(json!({
        "app": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}
