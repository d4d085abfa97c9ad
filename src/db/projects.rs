//! # 프로젝트 데이터베이스 쿼리 모듈
//!
//! `projects` 테이블에 대한 CRUD 함수들입니다.
//! 모든 조회는 `user_id`까지 함께 걸러서, 다른 사용자의 프로젝트는
//! "존재하지 않음"과 똑같이 `None`으로 보이게 합니다.

use crate::error::AppError;
use crate::models::*;
use sqlx::SqlitePool;

const PROJECT_COLUMNS: &str = "id, user_id, name, cover_image_url, pinned, created_at, updated_at";

/// 사용자의 프로젝트 목록. 고정된 프로젝트가 먼저, 그 안에서는 최근 수정순입니다.
pub async fn list_projects(pool: &SqlitePool, user_id: &str) -> Result<Vec<Project>, AppError> {
    let projects = sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE user_id = ? ORDER BY pinned DESC, updated_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(projects)
}

/// 소유자가 일치할 때만 프로젝트를 반환합니다.
///
/// # 반환값
/// - `Ok(Some(Project))`: 존재하고 `user_id`가 소유한 경우
/// - `Ok(None)`: 없거나 다른 사용자의 프로젝트인 경우
pub async fn get_owned_project(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
) -> Result<Option<Project>, AppError> {
    let project = sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ? AND user_id = ?"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(project)
}

pub async fn create_project(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
    name: &str,
    cover_image_url: Option<&str>,
) -> Result<Project, AppError> {
    sqlx::query(
        r#"
        INSERT INTO projects (id, user_id, name, cover_image_url)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(name)
    .bind(cover_image_url)
    .execute(pool)
    .await?;

    get_owned_project(pool, id, user_id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created project".to_string()))
}

/// 프로젝트를 부분 수정합니다 (PATCH).
///
/// `None`인 필드는 SQL에 넣지 않고, `updated_at`은 항상 갱신합니다.
/// 이름은 호출 전에 공백 제거/검증이 끝나 있어야 합니다.
///
/// 새로 고정(`pinned = true`)할 때는 같은 UPDATE 문 안에서 고정 개수를 세어
/// `MAX_PINNED_PROJECTS`를 넘으면 아무것도 바꾸지 않고 `Validation`을 반환합니다.
pub async fn update_project(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
    name: Option<&str>,
    cover_image_url: Option<&str>,
    pinned: Option<bool>,
) -> Result<Option<Project>, AppError> {
    let mut query =
        String::from("UPDATE projects SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')");
    let mut bindings = Vec::new();

    if let Some(name) = name {
        query.push_str(", name = ?");
        bindings.push(name);
    }
    if let Some(url) = cover_image_url {
        query.push_str(", cover_image_url = ?");
        bindings.push(url);
    }
    match pinned {
        Some(true) => query.push_str(", pinned = 1"),
        Some(false) => query.push_str(", pinned = 0"),
        None => {}
    }

    query.push_str(" WHERE id = ? AND user_id = ?");
    bindings.push(id);
    bindings.push(user_id);

    if pinned == Some(true) {
        query.push_str(&format!(
            " AND (pinned = 1 OR (SELECT COUNT(*) FROM projects WHERE user_id = ? AND pinned = 1) < {MAX_PINNED_PROJECTS})"
        ));
        bindings.push(user_id);
    }

    let mut query_builder = sqlx::query(&query);
    for binding in bindings {
        query_builder = query_builder.bind(binding);
    }

    let result = query_builder.execute(pool).await?;
    if result.rows_affected() == 0 {
        return match (pinned, get_owned_project(pool, id, user_id).await?) {
            (Some(true), Some(_)) => Err(AppError::Validation(format!(
                "At most {} projects can be pinned",
                MAX_PINNED_PROJECTS
            ))),
            _ => Ok(None),
        };
    }

    get_owned_project(pool, id, user_id).await
}

/// 프로젝트와 그 안의 모든 항목(문서/폴더)을 한 트랜잭션으로 삭제합니다.
///
/// # 반환값
/// - `Ok(Some(n))`: 삭제 성공, `n`은 함께 지워진 항목 수
/// - `Ok(None)`: 없거나 소유하지 않은 프로젝트
pub async fn delete_project(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
) -> Result<Option<u64>, AppError> {
    let mut tx = pool.begin().await?;

    let owned = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM projects WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
    if owned == 0 {
        return Ok(None);
    }

    let items = sqlx::query("DELETE FROM documents WHERE project_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(items))
}
