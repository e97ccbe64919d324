use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::AppState;
use crate::error::AppError;
use crate::extractors::ApiJson;
use crate::models::{validate_email_param, NewUser, User, UserUpdate};

type HandlerError = (StatusCode, Json<serde_json::Value>);

fn user_not_found() -> HandlerError {
    AppError::NotFound("User not found".to_string()).to_response()
}

pub async fn create_user(
    State(backend): State<AppState>,
    ApiJson(payload): ApiJson<NewUser>,
) -> Result<(StatusCode, Json<User>), HandlerError> {
    info!("Called POST /create-user");

    payload.validate().map_err(|e| e.to_response())?;

    let created = backend
        .create_user(&payload)
        .await
        .map_err(|e| e.to_response())?;

    info!("User created successfully");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_all_users(State(backend): State<AppState>) -> Result<Json<Vec<User>>, HandlerError> {
    info!("Called GET /get-all-users");

    let users = backend.get_all_users().await.map_err(|e| e.to_response())?;

    info!("Retrieved {} users", users.len());
    Ok(Json(users))
}

pub async fn get_user(
    State(backend): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<User>, HandlerError> {
    info!("Called GET /getuser-by-email/{{email}}");

    validate_email_param(&email).map_err(|e| e.to_response())?;

    match backend.get_user_by_email(&email).await {
        Ok(Some(user)) => {
            info!("User retrieved successfully");
            Ok(Json(user))
        }
        Ok(None) => Err(user_not_found()),
        Err(e) => Err(e.to_response()),
    }
}

pub async fn update_user(
    State(backend): State<AppState>,
    Path(email): Path<String>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> Result<Json<User>, HandlerError> {
    info!("Called PUT /update-user/{{email}}");

    validate_email_param(&email).map_err(|e| e.to_response())?;
    update.validate().map_err(|e| e.to_response())?;

    match backend.update_user(&email, &update).await {
        Ok(Some(user)) => {
            info!("User updated successfully");
            Ok(Json(user))
        }
        Ok(None) => Err(user_not_found()),
        Err(e) => Err(e.to_response()),
    }
}

pub async fn delete_user(
    State(backend): State<AppState>,
    Path(email): Path<String>,
) -> Result<StatusCode, HandlerError> {
    info!("Called DELETE /delete-user/{{email}}");

    validate_email_param(&email).map_err(|e| e.to_response())?;

    match backend.delete_user(&email).await {
        Ok(true) => {
            info!("User deleted successfully");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => Err(user_not_found()),
        Err(e) => Err(e.to_response()),
    }
}
