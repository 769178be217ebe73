use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    AppState,
    error::{AppError, Result},
    middleware::AuthUser,
    models::{CreateCustomerRequest, Customer, UpdateCustomerRequest},
    queries::customer_queries,
};

pub async fn list_customers(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Customer>>> {
    let customers = customer_queries::list_customers(&state.db).await?;

    Ok(Json(customers))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Customer>> {
    let customer = customer_queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))?;

    Ok(Json(customer))
}

pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CreateCustomerRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    if customer_queries::find_by_email(&state.db, &payload.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))?;

    let customer = customer_queries::create_customer(&state.db, &payload, &password_hash).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Customer created successfully",
            "customer": customer,
        })),
    ))
}

pub async fn update_customer(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCustomerRequest>,
) -> Result<impl IntoResponse> {
    let customer = customer_queries::update_customer(&state.db, id, payload)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))?;

    Ok(Json(json!({
        "message": "Customer updated successfully",
        "customer": customer,
    })))
}

pub async fn delete_customer(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let deleted = customer_queries::delete_customer(&state.db, id).await?;

    if !deleted {
        return Err(AppError::NotFound("Customer not found".to_string()));
    }

    Ok(Json(json!({ "message": "Customer deleted successfully" })))
}
