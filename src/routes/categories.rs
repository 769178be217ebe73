use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    AppState,
    error::{AppError, Result},
    middleware::AuthUser,
    models::{CategoryJson, CategoryPayload, CategorySearchResponse},
    queries::category_queries,
    search::CategoryFilter,
};

pub async fn search_categories(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<CategorySearchResponse>> {
    let filter = CategoryFilter::from_query(&params);

    let total = category_queries::count_categories(&state.db, &filter).await?;
    let categories = category_queries::page_categories(&state.db, &filter).await?;

    let data = categories
        .into_iter()
        .map(|category| CategoryJson::from(category).project(&filter.fields))
        .collect::<Result<Vec<_>>>()?;

    Ok(Json(CategorySearchResponse {
        data,
        total,
        limit: filter.limit,
        page: filter.page,
    }))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CategoryJson>> {
    let category = category_queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

    Ok(Json(category.into()))
}

pub async fn create_category(
    _auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CategoryPayload>,
) -> Result<impl IntoResponse> {
    let new_category = payload.validate()?;
    let category = category_queries::create_category(&state.db, new_category).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Category created successfully",
            "category": CategoryJson::from(category),
        })),
    ))
}

pub async fn update_category(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<CategoryPayload>,
) -> Result<impl IntoResponse> {
    let new_category = payload.validate()?;

    let category = category_queries::update_category(&state.db, id, new_category)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

    Ok(Json(json!({
        "message": "Category updated successfully",
        "category": CategoryJson::from(category),
    })))
}

pub async fn delete_category(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let deleted = category_queries::delete_category(&state.db, id).await?;

    if !deleted {
        return Err(AppError::NotFound("Category not found".to_string()));
    }

    Ok(Json(json!({ "message": "Category deleted successfully" })))
}
