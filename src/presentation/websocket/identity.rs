//! Connection Identity
//!
//! Establishes which user a connection speaks for, before the upgrade.
//! In `query` mode the `user_id` parameter is taken at face value; in `jwt`
//! mode a signed token is required and its `sub` claim is the user id.

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

use crate::config::{IdentityMode, Settings};
use crate::shared::error::AppError;

/// Query parameters accepted on the chat endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub user_id: Option<String>,
    pub token: Option<String>,
}

/// JWT claims issued by the identity service
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: i64,
}

/// Resolve the user id for an upgrade request.
///
/// `bearer` is the token from an `Authorization: Bearer` header, if any.
/// A `token` query parameter takes precedence since browsers cannot set
/// headers on WebSocket requests.
pub fn resolve_identity(
    settings: &Settings,
    params: &ConnectParams,
    bearer: Option<&str>,
) -> Result<String, AppError> {
    match settings.websocket.identity {
        IdentityMode::Query => params
            .user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("user_id is required".into())),
        IdentityMode::Jwt => {
            let token = params
                .token
                .as_deref()
                .or(bearer)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;
            verify_token(token, &settings.jwt.secret)
        }
    }
}

fn verify_token(token: &str, secret: &str) -> Result<String, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Unauthorized("Token expired".into())
        }
        _ => AppError::Unauthorized("Invalid token".into()),
    })?;

    if token_data.claims.sub.is_empty() {
        return Err(AppError::Unauthorized("Invalid token claims".into()));
    }
    Ok(token_data.claims.sub)
}
