//! JWT Token Handler
//! Mission: Generate and validate HS256 access tokens

use crate::auth::{middleware::AuthError, models::Claims};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

/// JWT Handler for token operations
pub struct JwtHandler {
    secret: String,
    expiration_days: i64,
}

impl JwtHandler {
    pub fn new(secret: String, expiration_days: i64) -> Self {
        Self {
            secret,
            expiration_days,
        }
    }

    /// Generate a token for `username`, valid for the configured number of days
    pub fn generate_token(&self, username: &str) -> Result<String> {
        self.generate_token_at(username, Utc::now())
    }

    pub fn generate_token_at(&self, username: &str, now: DateTime<Utc>) -> Result<String> {
        let expiration = now
            .checked_add_signed(Duration::days(self.expiration_days))
            .context("Invalid timestamp")?
            .timestamp() as usize;

        let claims = Claims {
            sub: Some(username.to_string()),
            exp: expiration,
        };

        debug!(
            "Generating JWT for {}, expires in {}d",
            username, self.expiration_days
        );

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to generate JWT")
    }

    /// Validate a token and return the username it was issued to
    pub fn validate_token(&self, token: &str) -> Result<String, AuthError> {
        self.validate_token_at(token, Utc::now())
    }

    /// Expiry is checked against `now` with no leeway.
    pub fn validate_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            debug!("Rejected JWT: {}", e);
            AuthError::InvalidToken
        })?;

        if decoded.claims.exp as i64 <= now.timestamp() {
            return Err(AuthError::Expired);
        }

        let username = decoded.claims.sub.ok_or(AuthError::MissingSubject)?;
        debug!("Validated JWT for {}", username);
        Ok(username)
    }
}
