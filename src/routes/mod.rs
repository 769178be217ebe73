mod categories;
mod customers;
mod health;
mod login;
mod products;
mod users;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route(
            "/v1/product/search",
            get(products::search_products),
        )
        .route("/v1/product", post(products::create_product))
        .route(
            "/v1/product/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/v1/category/search", get(categories::search_categories))
        .route("/v1/category", post(categories::create_category))
        .route(
            "/v1/category/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/v1/users", post(users::register_user).get(users::list_users))
        .route("/v1/users/login", post(login::login_user))
        .route(
            "/v1/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/v1/customers",
            get(customers::list_customers).post(customers::create_customer),
        )
        .route(
            "/v1/customers/{id}",
            get(customers::get_customer)
                .put(customers::update_customer)
                .delete(customers::delete_customer),
        )
}
