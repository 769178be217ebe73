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
    models::{CreateProductPayload, ProductSearchResponse, UpdateProductPayload},
    queries::product_queries,
    search::ProductFilter,
};

pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ProductSearchResponse>> {
    let filter = ProductFilter::from_query(&params);

    let total = product_queries::count_products(&state.db, &filter).await?;
    let products = product_queries::page_products(&state.db, &filter).await?;

    let data = products
        .iter()
        .map(|product| product.project(&filter.fields))
        .collect::<Result<Vec<_>>>()?;

    Ok(Json(ProductSearchResponse {
        data,
        total,
        limit: filter.limit,
        page: filter.page,
    }))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let product = product_queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(json!({ "product": product })))
}

pub async fn create_product(
    _auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse> {
    let new_product = payload.validate()?;
    let product = product_queries::create_product(&state.db, new_product).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Product created successfully",
            "product": {
                "id": product.id,
                "name": product.name,
                "slug": product.slug,
            },
        })),
    ))
}

pub async fn update_product(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProductPayload>,
) -> Result<impl IntoResponse> {
    let changes = payload.validate()?;

    product_queries::update_product(&state.db, id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    // Reshaped entity is re-read after the commit.
    let product = product_queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(json!({
        "message": "Product updated successfully",
        "product": product,
    })))
}

pub async fn delete_product(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let deleted = product_queries::delete_product(&state.db, id).await?;

    if !deleted {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    Ok(Json(json!({ "message": "Product deleted successfully" })))
}
