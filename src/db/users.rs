use crate::error::AppError;
use crate::models::*;
use sqlx::SqlitePool;

const USER_COLUMNS: &str = "id, name, email, password_hash, settings, created_at, updated_at";

pub async fn create_user(
    pool: &SqlitePool,
    id: &str,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, AppError> {
    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, password_hash)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created user".to_string()))
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, AppError> {
    let user =
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(pool)
            .await?;

    Ok(user)
}

pub async fn update_settings(pool: &SqlitePool, id: &str, settings_json: &str) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE users SET settings = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?",
    )
    .bind(settings_json)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn update_password(pool: &SqlitePool, id: &str, password_hash: &str) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE users SET password_hash = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?",
    )
    .bind(password_hash)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn store_refresh_token(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
    token_hash: &str,
    expires_at: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns `(id, user_id, expires_at)` for a stored refresh token hash.
pub async fn find_refresh_token(
    pool: &SqlitePool,
    token_hash: &str,
) -> Result<Option<(String, String, String)>, AppError> {
    let row = sqlx::query_as::<_, (String, String, String)>(
        r#"
        SELECT id, user_id, expires_at
        FROM refresh_tokens
        WHERE token_hash = ?
        "#,
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn delete_refresh_token(pool: &SqlitePool, token_hash: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = ?")
        .bind(token_hash)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn delete_user_refresh_tokens(pool: &SqlitePool, user_id: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Issuing a new reset code invalidates any earlier ones for the same user.
pub async fn replace_reset_code(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
    code_hash: &str,
    expires_at: &str,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM password_reset_codes WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO password_reset_codes (id, user_id, code_hash, expires_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(code_hash)
    .bind(expires_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// The user's current unused reset code, if any. Issuing a code replaces older ones,
/// so there is at most one.
pub async fn find_active_reset_code(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<PasswordResetCode>, AppError> {
    let code = sqlx::query_as::<_, PasswordResetCode>(
        r#"
        SELECT id, code_hash, expires_at, attempts
        FROM password_reset_codes
        WHERE user_id = ? AND used = 0
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(code)
}

/// Spends one attempt on the code. Returns `false` once `max_attempts` have been used
/// (or the code is already consumed), in which case the caller must not compare it.
pub async fn spend_reset_attempt(
    pool: &SqlitePool,
    id: &str,
    max_attempts: i64,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        "UPDATE password_reset_codes SET attempts = attempts + 1 WHERE id = ? AND used = 0 AND attempts < ?",
    )
    .bind(id)
    .bind(max_attempts)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Marks the code used. Only the first caller gets `true`.
pub async fn consume_reset_code(pool: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("UPDATE password_reset_codes SET used = 1 WHERE id = ? AND used = 0")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn with_code() -> (SqlitePool, String) {
        let pool = db::test_pool().await;
        create_user(&pool, "u1", "Writer", "writer@example.com", "hash").await.unwrap();
        replace_reset_code(&pool, "c1", "u1", "code-hash", "2999-01-01T00:00:00.000Z")
            .await
            .unwrap();
        (pool, "c1".to_string())
    }

    #[tokio::test]
    async fn code_is_consumed_once() {
        let (pool, id) = with_code().await;
        assert!(consume_reset_code(&pool, &id).await.unwrap());
        assert!(!consume_reset_code(&pool, &id).await.unwrap());
        assert!(find_active_reset_code(&pool, "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn attempts_run_out() {
        let (pool, id) = with_code().await;
        for _ in 0..3 {
            assert!(spend_reset_attempt(&pool, &id, 3).await.unwrap());
        }
        assert!(!spend_reset_attempt(&pool, &id, 3).await.unwrap());

        let code = find_active_reset_code(&pool, "u1").await.unwrap().unwrap();
        assert_eq!(code.attempts, 3);
    }

    #[tokio::test]
    async fn new_code_replaces_old_one() {
        let (pool, _) = with_code().await;
        replace_reset_code(&pool, "c2", "u1", "other-hash", "2999-01-01T00:00:00.000Z")
            .await
            .unwrap();

        let code = find_active_reset_code(&pool, "u1").await.unwrap().unwrap();
        assert_eq!(code.id, "c2");
        assert_eq!(code.attempts, 0);
    }
}
