use axum::{
    extract::{FromRequestParts, Path},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::{db, error::AppError, models::Project, routes::AppState};

const ACCESS: &str = "access";
const REFRESH: &str = "refresh";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id
    pub exp: i64,
    pub iat: i64,
    /// "access" or "refresh"; a refresh token is never accepted as a bearer credential
    pub typ: String,
    /// random nonce so two tokens minted in the same second still differ
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingToken)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?;

        let claims = verify_access_token(token, &state.jwt_secret)?;

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}

/// Authorization context for everything under `/projects/{project_id}`.
///
/// Resolves the bearer credential and loads the project only if the caller owns
/// it. Handlers receive the owned project explicitly instead of re-checking
/// ownership themselves. A project owned by someone else is reported exactly
/// like a missing one.
#[derive(Debug, Clone)]
pub struct ProjectAccess {
    pub user_id: String,
    pub project: Project,
}

impl ProjectAccess {
    pub fn project_id(&self) -> &str {
        &self.project.id
    }
}

impl FromRequestParts<AppState> for ProjectAccess {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let project_id = params
            .get("project_id")
            .ok_or_else(|| AppError::NotFound.into_response())?;

        let project = db::get_owned_project(&state.pool, project_id, &user.user_id)
            .await
            .map_err(IntoResponse::into_response)?
            .ok_or_else(|| AppError::NotFound.into_response())?;

        Ok(ProjectAccess {
            user_id: user.user_id,
            project,
        })
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    ExpiredToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AuthError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "missing_token",
                "Authorization token is required",
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Invalid authorization token",
            ),
            AuthError::ExpiredToken => (
                StatusCode::UNAUTHORIZED,
                "expired_token",
                "Authorization token has expired",
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

fn issue_token(
    user_id: &str,
    secret: &str,
    typ: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
        typ: typ.to_string(),
        jti: uuid::Uuid::now_v7().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn create_access_token(
    user_id: &str,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    issue_token(user_id, secret, ACCESS, Duration::minutes(15))
}

pub fn create_refresh_token(
    user_id: &str,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    issue_token(user_id, secret, REFRESH, Duration::days(7))
}

fn verify_token(token: &str, secret: &str, typ: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        _ => AuthError::InvalidToken,
    })?;

    if token_data.claims.typ != typ {
        return Err(AuthError::InvalidToken);
    }

    Ok(token_data.claims)
}

pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    verify_token(token, secret, ACCESS)
}

pub fn verify_refresh_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    verify_token(token, secret, REFRESH)
}

/// SHA-256 hex digest used to store refresh tokens and reset codes.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_round_trips() {
        let token = create_access_token("user-1", "secret").unwrap();
        let claims = verify_access_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_token_is_not_a_bearer_credential() {
        let token = create_refresh_token("user-1", "secret").unwrap();
        assert!(matches!(
            verify_access_token(&token, "secret"),
            Err(AuthError::InvalidToken)
        ));
        assert_eq!(verify_refresh_token(&token, "secret").unwrap().sub, "user-1");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_access_token("user-1", "secret").unwrap();
        assert!(matches!(
            verify_access_token(&token, "other"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn hash_is_stable_hex() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_eq!(hash_token("abc").len(), 64);
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }
}
