//! Authentication API Endpoints
//! Mission: Provide the token login endpoint

use crate::{
    api::error::ApiError,
    auth::{
        jwt::JwtHandler,
        middleware::AuthError,
        models::{LoginForm, TokenResponse},
        session_store::SessionStore,
    },
};
use anyhow::Result;
use axum::{extract::State, Form, Json};
use std::sync::Arc;
use tracing::info;

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub jwt_handler: Arc<JwtHandler>,
    pub sessions: SessionStore,
}

impl AuthState {
    pub fn new(jwt_handler: Arc<JwtHandler>, sessions: SessionStore) -> Self {
        Self {
            jwt_handler,
            sessions,
        }
    }

    /// Mint a token for `username` and record it as that user's latest session
    pub fn issue(&self, username: &str) -> Result<String> {
        let token = self.jwt_handler.generate_token(username)?;
        self.sessions.upsert(username, &token)?;
        Ok(token)
    }

    /// Any correctly signed, unexpired token is accepted, superseded or not.
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        self.jwt_handler.validate_token(token)
    }
}

/// Login endpoint - POST /token
pub async fn login(
    State(state): State<AuthState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.issue(&form.username)?;

    info!("🔐 Token issued: {}", form.username);

    Ok(Json(TokenResponse::bearer(token)))
}
