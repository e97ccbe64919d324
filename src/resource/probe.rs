//! Fixed-status endpoints used by load balancers and smoke tests.
//! They never touch the backend.

use axum::{extract::Path, http::StatusCode};
use tracing::info;

pub async fn root() -> StatusCode {
    info!("Called GET /");
    StatusCode::OK
}

pub async fn post_only() -> StatusCode {
    info!("Called POST /200-only-post-method");
    StatusCode::CREATED
}

pub async fn get_only(Path(_id): Path<i64>) -> StatusCode {
    info!("Called GET /200-only-get-method/{{id}}");
    StatusCode::OK
}

pub async fn put_only(Path(_id): Path<i64>) -> StatusCode {
    info!("Called PUT /200-only-put-method/{{id}}");
    StatusCode::OK
}

pub async fn delete_only(Path(_id): Path<i64>) -> StatusCode {
    info!("Called DELETE /200-only-delete-method/{{id}}");
    StatusCode::NO_CONTENT
}
