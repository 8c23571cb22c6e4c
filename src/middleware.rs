//! Bearer-token authentication and owner resolution.
//!
//! `require_auth` is only layered onto the query/history routes when auth is
//! enabled. Handlers never look at tokens; they take an [`Owner`], which is
//! `Owner(None)` whenever no authenticated user is attached to the request.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::ApiError;

/// Identity attached to a request by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Validate the `Authorization: Bearer <jwt>` header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized("authorization header required"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized("bearer token required"))?;

    let claims = state.jwt.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        ApiError::Unauthorized("invalid token")
    })?;

    tracing::debug!(
        user_id = %claims.user_id,
        username = %claims.username,
        "Authenticated request"
    );
    request.extensions_mut().insert(AuthenticatedUser {
        user_id: claims.user_id,
    });

    Ok(next.run(request).await)
}

/// The submitting principal, if the request is authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner(pub Option<Uuid>);

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Owner(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|user| user.user_id),
        ))
    }
}
