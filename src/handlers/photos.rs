use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::{
    errors::{AppError, Result},
    handlers::AppState,
    models::{PageQuery, PhotoPageResponse},
    services::image_processor::{ImageProcessor, OutputFormat},
    storage::{ObjectStore, StorageError},
};

const MAX_PAGE_SIZE: u32 = 100;

pub async fn by_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Response> {
    let size = query.size.clamp(1, MAX_PAGE_SIZE);
    let page = state
        .repo
        .photos_by_category(category_id, query.page, size)
        .await?;

    if page.photos.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    Ok(Json(PhotoPageResponse::from(page)).into_response())
}

/// Serves a stored photo, re-encoded in the format its name implies.
pub async fn get_photo(
    State(state): State<AppState>,
    Path((category_id, file_name)): Path<(Uuid, String)>,
) -> Result<Response> {
    let data = match state
        .storage
        .get_object(&category_id.to_string(), &file_name)
        .await
    {
        Ok(data) => data,
        Err(StorageError::NotFound(_)) => return Ok(StatusCode::NOT_FOUND.into_response()),
        Err(e) => return Err(e.into()),
    };

    let format = OutputFormat::from_file_name(&file_name);
    let encoded = tokio::task::spawn_blocking(move || ImageProcessor::reencode(&data, format))
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    match encoded {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, format.content_type())], bytes).into_response()),
        Err(AppError::ImageProcessing(e)) => {
            tracing::warn!(file_name = %file_name, error = %e, "Stored object is not a readable image");
            Ok(StatusCode::NOT_FOUND.into_response())
        }
        Err(e) => Err(e),
    }
}

pub async fn delete_photo(
    State(state): State<AppState>,
    Path(photo_id): Path<Uuid>,
) -> Result<Response> {
    let Some(photo) = state.repo.find_photo(photo_id).await? else {
        return Ok((StatusCode::NOT_FOUND, Json(json!({}))).into_response());
    };

    let mut response = Map::new();
    let bucket = photo.category.to_string();
    for name in photo.object_names() {
        if let Err(e) = state.storage.remove_object(&bucket, name).await {
            tracing::error!(photo_id = %photo.id, key = %name, error = %e, "Failed to remove photo object");
            response.insert("minio_remove_error".to_string(), Value::from(e.to_string()));
            break;
        }
    }

    state.repo.delete_photo(photo.id).await?;
    response.insert("success".to_string(), Value::from("true"));

    Ok(Json(Value::Object(response)).into_response())
}

pub async fn rotate(
    State(state): State<AppState>,
    Path(photo_id): Path<Uuid>,
) -> Result<Response> {
    let Some(photo) = state.repo.find_photo(photo_id).await? else {
        return Ok((StatusCode::NOT_FOUND, Json(json!({}))).into_response());
    };

    let bucket = photo.category.to_string();
    for name in photo.object_names() {
        if let Err(e) = rotate_object(state.storage.as_ref(), &bucket, name).await {
            tracing::error!(photo_id = %photo.id, key = %name, error = %e, "Failed to rotate photo");
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "minio_rotate_error": e.to_string() })),
            )
                .into_response());
        }
    }

    Ok(Json(json!({ "success": "true" })).into_response())
}

/// Rotates one object 90° clockwise in place. Objects that do not decode as
/// images are left untouched.
async fn rotate_object(storage: &dyn ObjectStore, bucket: &str, key: &str) -> Result<()> {
    let data = storage.get_object(bucket, key).await?;
    let format = OutputFormat::from_file_name(key);

    let rotated = tokio::task::spawn_blocking(move || {
        match ImageProcessor::decode(&data) {
            Ok(img) => ImageProcessor::encode(&img.rotate90(), format).map(Some),
            Err(_) => Ok(None),
        }
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))??;

    match rotated {
        Some(bytes) => {
            storage
                .put_object(bucket, key, bytes, format.content_type())
                .await?
        }
        None => tracing::warn!(bucket = %bucket, key = %key, "Skipping rotation of unreadable image"),
    }

    Ok(())
}
