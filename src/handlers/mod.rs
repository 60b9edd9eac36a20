use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::{
    auth::AuthService, config::Config, database::Repository, services::metrics::MetricsService,
    storage::ObjectStore,
};

pub mod actuator;
pub mod auth;
pub mod categories;
pub mod jobs;
pub mod photos;
pub mod upload;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub storage: Arc<dyn ObjectStore>,
    pub config: Arc<Config>,
    pub auth: Arc<AuthService>,
    pub metrics: Arc<MetricsService>,
}

/// `GET /` sends browsers on to the API root.
pub async fn root_redirect() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/api/")]).into_response()
}

/// Response body of the form `{"error": message}`.
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}
