use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::account::Account;
use crate::models::query::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest};
use crate::services::auth;
use crate::store::StoreError;

/// POST /api/v1/login: Exchange credentials for a bearer token.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    if !state.config.auth_enabled {
        return Err(ApiError::Validation("authentication is disabled".to_string()));
    }

    let Json(request) = payload?;
    request.validate()?;

    let account = state
        .accounts
        .find_by_username(&request.username)
        .await
        .map_err(|e| ApiError::internal("failed to look up account", &e))?;

    // Unknown usernames still pay for a bcrypt check against the decoy.
    let password = request.password;
    let hash = match &account {
        Some(account) => account.password_hash.clone(),
        None => state.decoy_hash.to_string(),
    };
    let verified = tokio::task::spawn_blocking(move || auth::verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::internal("failed to verify password", &e))?;

    let account = match account {
        Some(account) if verified => account,
        _ => {
            tracing::info!(username = %request.username, "Rejected login");
            return Err(ApiError::Unauthorized("invalid credentials"));
        }
    };

    let token = state
        .jwt
        .issue_token(&account)
        .map_err(|e| ApiError::internal("failed to generate token", &e))?;

    Ok(Json(LoginResponse { token }))
}

/// POST /api/v1/register: Create an account.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    if !state.config.auth_enabled {
        return Err(ApiError::Validation("registration is disabled".to_string()));
    }

    let Json(request) = payload?;
    request.validate()?;

    let cost = state.config.password_hash_cost;
    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || auth::hash_password(&password, cost))
        .await
        .map_err(|e| ApiError::internal("failed to hash password", &e))?
        .map_err(|e| ApiError::internal("failed to hash password", &e))?;

    let account = Account::new(request.username, password_hash);
    state
        .accounts
        .create_account(&account)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => ApiError::Conflict("username already taken".to_string()),
            other => ApiError::internal("failed to create user", &other),
        })?;

    tracing::info!(user_id = %account.id, username = %account.username, "Account registered");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "user created successfully".to_string(),
        }),
    ))
}
