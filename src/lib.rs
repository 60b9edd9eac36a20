pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth::AuthService,
    config::Config,
    errors::{AppError, Result},
    handlers::{actuator, categories, jobs, photos, upload, AppState},
    middleware::{auth_middleware, metrics_middleware},
    services::metrics::MetricsService,
    storage::{ensure_bucket, UPLOADS_BUCKET},
};

/// Connects the database and object store and assembles shared state.
pub async fn build_state(config: Config) -> Result<AppState> {
    let repo = database::connect(&config.database_url).await?;

    let storage = storage::create_store(&config.storage).await?;
    ensure_bucket(storage.as_ref(), UPLOADS_BUCKET).await?;

    let auth = AuthService::new(&config, repo.clone())?;

    Ok(AppState {
        repo,
        storage,
        config: Arc::new(config),
        auth: Arc::new(auth),
        metrics: Arc::new(MetricsService::new()),
    })
}

fn cors_layer(config: &Config) -> Result<CorsLayer> {
    let origin = HeaderValue::from_str(&config.web_url)
        .map_err(|_| AppError::Config(format!("Invalid WEB_URL: {}", config.web_url)))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true))
}

pub fn create_app(state: AppState) -> Result<Router> {
    let cors = cors_layer(&state.config)?;
    let body_limit = state.config.max_upload_size;

    let api = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/protected", get(handlers::auth::protected))
        .route("/categories/create", post(categories::create))
        .route("/categories/name", patch(categories::update_name))
        .route("/categories/colour", patch(categories::update_colour))
        .route("/categories/delete", delete(categories::delete))
        .route("/categories/all", get(categories::all))
        .route("/upload", post(upload::upload))
        .route("/upload/", post(upload::upload))
        .route("/jobs/upload", post(jobs::post))
        .route("/jobs/all", get(jobs::all))
        .route("/photos/:category_id", get(photos::by_category))
        .route("/photos/:category_id/:file_name", get(photos::get_photo))
        .route("/photos/delete/:photo_id", delete(photos::delete_photo))
        .route("/photos/rotate/:photo_id", put(photos::rotate))
        .route("/actuator/health", get(actuator::health))
        .route("/actuator/metrics", get(actuator::metrics))
        .route("/actuator/info", get(actuator::info));

    let app = Router::new()
        .route("/", get(handlers::root_redirect))
        .nest("/api", api)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            metrics_middleware,
        ))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok(app)
}
