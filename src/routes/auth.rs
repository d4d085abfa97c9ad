use crate::{
    db::users as db_users,
    error::AppError,
    middleware::auth::{
        create_access_token, create_refresh_token, hash_token, verify_refresh_token, AuthUser,
    },
    models::*,
    routes::AppState,
    services::mailer,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use rand_core::RngCore;
use serde_json::{json, Value};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";
const RESET_REQUESTED: &str = "If an account exists for that email, a reset code has been sent";
const INVALID_RESET_CODE: &str = "Invalid or expired reset code";
/// Checks allowed per issued code, counting both verify and reset calls.
const MAX_RESET_ATTEMPTS: i64 = 5;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if !(8..=128).contains(&len) {
        return Err(AppError::Validation(
            "Password must be between 8 and 128 characters".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_alphabetic()) {
        return Err(AppError::Validation(
            "Password must contain at least one letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "Password must contain at least one number".to_string(),
        ));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

fn expiry(ttl: Duration) -> String {
    (Utc::now() + ttl).format(TIMESTAMP_FORMAT).to_string()
}

fn is_expired(expires_at: &str) -> Result<bool, AppError> {
    let expires = chrono::NaiveDateTime::parse_from_str(expires_at, TIMESTAMP_FORMAT)
        .map_err(|e| AppError::Internal(format!("Date parse error: {}", e)))?;
    Ok(expires.and_utc() < Utc::now())
}

/// Mints an access/refresh pair and stores the refresh token hash.
async fn issue_session(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let access_token = create_access_token(&user.id, &state.jwt_secret)
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;
    let refresh_token = create_refresh_token(&user.id, &state.jwt_secret)
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

    let token_id = uuid::Uuid::now_v7().to_string();
    let token_hash = hash_token(&refresh_token);
    db_users::store_refresh_token(
        &state.pool,
        &token_id,
        &user.id,
        &token_hash,
        &expiry(Duration::days(7)),
    )
    .await?;

    Ok(AuthResponse {
        user: user.into(),
        access_token,
        refresh_token,
    })
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name cannot be empty".to_string()));
    }
    if name.chars().count() > 100 {
        return Err(AppError::Validation("Name must be at most 100 characters".to_string()));
    }
    let email = normalize_email(&req.email);
    if !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    validate_password(&req.password)?;

    if db_users::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = uuid::Uuid::now_v7().to_string();
    let user = db_users::create_user(&state.pool, &user_id, name, &email, &password_hash).await?;
    tracing::info!(user_id = %user.id, "User registered");

    Ok(Json(issue_session(&state, user).await?))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let user = db_users::find_by_email(&state.pool, &normalize_email(&req.email))
        .await?
        .ok_or_else(invalid)?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::Internal(format!("Password hash parse error: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid())?;

    Ok(Json(issue_session(&state, user).await?))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    verify_refresh_token(&req.refresh_token, &state.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    let token_hash = hash_token(&req.refresh_token);
    let (_token_id, user_id, expires_at) = db_users::find_refresh_token(&state.pool, &token_hash)
        .await?
        .ok_or(AppError::Unauthorized("Refresh token not found or revoked".to_string()))?;

    // Rotation: the presented token is single-use either way.
    db_users::delete_refresh_token(&state.pool, &token_hash).await?;

    if is_expired(&expires_at)? {
        return Err(AppError::Unauthorized("Refresh token expired".to_string()));
    }

    let user = db_users::find_by_id(&state.pool, &user_id)
        .await?
        .ok_or(AppError::Unauthorized("User not found".to_string()))?;

    Ok(Json(issue_session(&state, user).await?))
}

pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Value>, AppError> {
    db_users::delete_user_refresh_tokens(&state.pool, &auth_user.user_id).await?;

    Ok(Json(json!({ "message": "Logged out successfully" })))
}

pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = db_users::find_by_id(&state.pool, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(user.into()))
}

pub async fn update_settings(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = db_users::find_by_id(&state.pool, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut settings: UserSettings = UserResponse::from(user).settings;
    settings.apply(req);
    db_users::update_settings(&state.pool, &auth_user.user_id, &serde_json::to_string(&settings)?)
        .await?;

    let user = db_users::find_by_id(&state.pool, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(user.into()))
}

/// Always answers with the same message so the endpoint can't be used to discover
/// which emails have accounts.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    let email = normalize_email(&req.email);

    if let Some(user) = db_users::find_by_email(&state.pool, &email).await? {
        let code = format!("{:06}", OsRng.next_u32() % 1_000_000);
        let code_id = uuid::Uuid::now_v7().to_string();
        let expires_at = expiry(Duration::minutes(state.reset_code_ttl_minutes));

        db_users::replace_reset_code(&state.pool, &code_id, &user.id, &hash_token(&code), &expires_at)
            .await?;

        let mail = mailer::reset_code_mail(&user.email, &code, state.reset_code_ttl_minutes);
        if let Err(e) = state.mailer.send(mail) {
            tracing::error!(user_id = %user.id, "Failed to send reset code: {}", e);
        }
    } else {
        tracing::debug!("Password reset requested for unknown email");
    }

    Ok(Json(json!({ "message": RESET_REQUESTED })))
}

/// Looks up an unused, unexpired code with attempts left and compares it.
/// `None` covers every failure reason alike.
async fn find_valid_code(
    state: &AppState,
    email: &str,
    code: &str,
) -> Result<Option<(User, String)>, AppError> {
    let Some(user) = db_users::find_by_email(&state.pool, &normalize_email(email)).await? else {
        return Ok(None);
    };
    let Some(stored) = db_users::find_active_reset_code(&state.pool, &user.id).await? else {
        return Ok(None);
    };
    if is_expired(&stored.expires_at)? {
        return Ok(None);
    }
    if !db_users::spend_reset_attempt(&state.pool, &stored.id, MAX_RESET_ATTEMPTS).await? {
        tracing::warn!(user_id = %user.id, "Reset code attempts exhausted");
        return Ok(None);
    }
    if stored.code_hash != hash_token(code.trim()) {
        return Ok(None);
    }
    Ok(Some((user, stored.id)))
}

pub async fn verify_reset_code(
    State(state): State<AppState>,
    Json(req): Json<VerifyCodeRequest>,
) -> Result<Json<Value>, AppError> {
    let valid = find_valid_code(&state, &req.email, &req.code).await?.is_some();
    Ok(Json(json!({ "valid": valid })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    validate_password(&req.new_password)?;

    let (user, code_id) = find_valid_code(&state, &req.email, &req.code)
        .await?
        .ok_or_else(|| AppError::Validation(INVALID_RESET_CODE.to_string()))?;

    // Two resets racing with the same code: only the one that consumes it proceeds.
    if !db_users::consume_reset_code(&state.pool, &code_id).await? {
        return Err(AppError::Validation(INVALID_RESET_CODE.to_string()));
    }

    let password_hash = hash_password(&req.new_password)?;
    db_users::update_password(&state.pool, &user.id, &password_hash).await?;
    db_users::delete_user_refresh_tokens(&state.pool, &user.id).await?;
    tracing::info!(user_id = %user.id, "Password reset");

    Ok(Json(json!({ "message": "Password has been reset" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_rules() {
        assert!(validate_password("SecurePass123").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("lettersonly").is_err());
        assert!(validate_password("1234567890").is_err());
    }

    #[test]
    fn emails_are_case_insensitive() {
        assert_eq!(normalize_email("  Cataly@Example.COM "), "cataly@example.com");
    }

    #[test]
    fn expiry_parses_back() {
        assert!(!is_expired(&expiry(Duration::minutes(5))).unwrap());
        assert!(is_expired(&expiry(Duration::minutes(-5))).unwrap());
    }
}
