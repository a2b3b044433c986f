use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::{
    api::table::{create_record, delete_record, list_records, restore_backup, update_record},
    auth::{api as auth_api, auth_middleware},
    middleware::request_logging,
    state::AppState,
    stream::random_numbers_ws,
};

/// Create the API router
pub fn build_router(state: AppState) -> Router {
    // Bearer-protected table routes
    let protected_routes = Router::new()
        .route("/csv", get(list_records).post(create_record))
        .route("/csv/:user_id", put(update_record).delete(delete_record))
        .route("/restore", post(restore_backup))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    // The stream authenticates with its own query token after the upgrade
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/token", post(auth_api::login))
        .route("/ws/random-numbers", get(random_numbers_ws))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::very_permissive())
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
