use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    errors::AppError,
    handlers::{error_response, AppState},
    services::image_processor::ImageProcessor,
    storage::UPLOADS_BUCKET,
    utils::file,
};

const FILE_FIELD: &str = "imageFile";

fn multipart_error(e: MultipartError) -> Response {
    error_response(e.status(), e.body_text())
}

pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut upload = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return multipart_error(e),
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field.file_name().map(str::to_string);
        match field.bytes().await {
            Ok(data) => upload = Some((original_name, data)),
            Err(e) => return multipart_error(e),
        }
    }

    let Some((original_name, data)) = upload.filter(|(_, data)| !data.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "File is empty.");
    };

    let Some(extension) = original_name
        .as_deref()
        .and_then(file::extension)
        .filter(|ext| file::is_allowed_extension(ext))
    else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid file type. Only PNG, JPEG, and CR2 are allowed.",
        );
    };

    let (bytes, extension) = if extension == file::CR2_EXTENSION {
        match ImageProcessor::convert_cr2(&state.config.dcraw_path, &data).await {
            Ok(jpeg) => (jpeg, "jpg".to_string()),
            Err(AppError::Io(e)) => {
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("File processing error: {}", e),
                )
            }
            Err(e) => {
                tracing::error!(error = %e, "CR2 conversion failed");
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to convert CR2 to JPEG.",
                );
            }
        }
    } else {
        (data.to_vec(), extension)
    };

    let file_name = file::generate_file_name(&extension);
    let size = bytes.len();

    if let Err(e) = state
        .storage
        .put_object(
            UPLOADS_BUCKET,
            &file_name,
            bytes,
            &file::image_content_type(&extension),
        )
        .await
    {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error uploading photo: {}", e),
        );
    }

    state.metrics.record_upload(&extension);
    tracing::info!(file_name = %file_name, size_bytes = size, "Staged upload");

    Json(json!({
        "message": "Photo uploaded successfully",
        "bucket": UPLOADS_BUCKET,
        "fileName": file_name,
    }))
    .into_response()
}
