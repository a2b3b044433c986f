//! Authentication Middleware
//! Mission: Protect the table endpoints with bearer token validation

use crate::auth::api::AuthState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

/// Username resolved from a validated token, placed in request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

/// Auth middleware that validates the `Authorization: Bearer` header
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?;

    let token = header_value
        .to_str()
        .ok()
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(AuthError::InvalidFormat)?;

    let username = auth.verify(token)?;
    debug!(user = %username, path = %req.uri().path(), "Authenticated request");

    req.extensions_mut().insert(CurrentUser(username));

    Ok(next.run(req).await)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Not authenticated")]
    MissingToken,
    #[error("Invalid authorization format. Use: Bearer {{token}}")]
    InvalidFormat,
    #[error("Could not validate credentials")]
    InvalidToken,
    #[error("Token has expired")]
    Expired,
    #[error("Token has no subject")]
    MissingSubject,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let mut response = (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": self.to_string() })),
        )
            .into_response();
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            header::HeaderValue::from_static("Bearer"),
        );
        response
    }
}
