use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    errors::Result,
    handlers::{error_response, AppState},
    models::{Job, PostJobParams},
    storage::UPLOADS_BUCKET,
    utils::Params,
};

/// Queues a staged upload for publishing into a category.
pub async fn post(
    State(state): State<AppState>,
    Params(params): Params<PostJobParams>,
) -> Result<Response> {
    let Ok(category) = Uuid::parse_str(&params.category) else {
        return Ok(error_response(
            StatusCode::BAD_REQUEST,
            "Category does not exist. (UUID invalid)",
        ));
    };

    if state.repo.find_category(category).await?.is_none() {
        return Ok(error_response(
            StatusCode::BAD_REQUEST,
            "Category does not exist. (Not found in database)",
        ));
    }

    if let Err(e) = state
        .storage
        .stat_object(UPLOADS_BUCKET, &params.file_name)
        .await
    {
        return Ok(error_response(StatusCode::BAD_REQUEST, e.to_string()));
    }

    let job = Job::new(category, params.file_name);
    state.repo.insert_job(&job).await?;
    tracing::info!(job_id = %job.id, file_name = %job.file_name, "Queued job");

    Ok(Json(json!({ "success": job.id })).into_response())
}

pub async fn all(State(state): State<AppState>) -> Result<Json<Vec<Job>>> {
    Ok(Json(state.repo.list_jobs().await?))
}
