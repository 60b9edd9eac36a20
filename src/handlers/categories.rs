use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    errors::Result,
    handlers::{error_response, AppState},
    models::{
        is_valid_colour, Category, CategoryIdParams, CreateCategoryParams, UpdateColourParams,
        UpdateNameParams,
    },
    utils::Params,
};

pub async fn create(
    State(state): State<AppState>,
    Params(params): Params<CreateCategoryParams>,
) -> Result<Response> {
    let category = Category::new(params.name);
    state.repo.insert_category(&category).await?;

    // The row is kept even when the bucket cannot be created.
    if let Err(e) = state.storage.make_bucket(&category.bucket()).await {
        tracing::error!(category_id = %category.id, error = %e, "Error creating category bucket");
        return Ok(error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
    }

    tracing::info!(category_id = %category.id, name = %category.name, "Created category");
    Ok(Json(json!({ "id": category.id })).into_response())
}

pub async fn update_name(
    State(state): State<AppState>,
    Params(params): Params<UpdateNameParams>,
) -> Result<Response> {
    let Some(mut category) = state.repo.find_category(params.id).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    category.name = params.name;
    state.repo.update_category(&category).await?;

    Ok(Json(json!({ "success": "true" })).into_response())
}

pub async fn update_colour(
    State(state): State<AppState>,
    Params(params): Params<UpdateColourParams>,
) -> Result<Json<bool>> {
    if !is_valid_colour(&params.colour) {
        return Ok(Json(false));
    }

    let Some(mut category) = state.repo.find_category(params.id).await? else {
        return Ok(Json(false));
    };

    category.colour = params.colour;
    Ok(Json(state.repo.update_category(&category).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Params(params): Params<CategoryIdParams>,
) -> Result<Json<bool>> {
    let deleted = state.repo.delete_category(params.id).await?;
    if deleted {
        tracing::info!(category_id = %params.id, "Deleted category");
    }
    Ok(Json(deleted))
}

pub async fn all(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.repo.list_categories().await?))
}
