use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::backend::{BackendFactory, UserBackend};
use crate::config::DatabaseConfig;
use crate::error::AppResult;
use crate::logging::logging_middleware;
use crate::resource::{health, probe, user};

/// Build the backend selected by `config` and connect it.
///
/// Any configuration or connection error is returned so the process can
/// refuse to start.
pub async fn connect_backend(config: &DatabaseConfig) -> AppResult<Arc<dyn UserBackend>> {
    let backend = BackendFactory::create(config)?;
    backend.connect().await?;
    tracing::info!("Database connected successfully");
    Ok(backend)
}

/// Assemble all routes around a shared backend.
///
/// CORS is open to any origin, with credentials allowed.
pub fn build_router(backend: Arc<dyn UserBackend>) -> Router {
    Router::new()
        .route("/", get(probe::root))
        .route("/200-only-post-method", post(probe::post_only))
        .route("/200-only-get-method/{id}", get(probe::get_only))
        .route("/200-only-put-method/{id}", put(probe::put_only))
        .route("/200-only-delete-method/{id}", delete(probe::delete_only))
        .route("/health/db", get(health::health_db))
        .route("/create-user", post(user::create_user))
        .route("/get-all-users", get(user::get_all_users))
        .route("/getuser-by-email/{email}", get(user::get_user))
        .route("/update-user/{email}", put(user::update_user))
        .route("/delete-user/{email}", delete(user::delete_user))
        .layer(middleware::from_fn(logging_middleware))
        .layer(CorsLayer::very_permissive())
        .with_state(backend)
}
