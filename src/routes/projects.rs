//! # 프로젝트(Project) 라우트 핸들러
//!
//! ## 엔드포인트
//! - `GET    /api/v1/projects`              → 내 프로젝트 목록 (고정된 것이 먼저)
//! - `POST   /api/v1/projects`              → 새 프로젝트
//! - `GET    /api/v1/projects/{project_id}` → 단일 프로젝트
//! - `PATCH  /api/v1/projects/{project_id}` → 부분 수정 (null 필드는 무시, `pinned`는 최대 3개)
//! - `DELETE /api/v1/projects/{project_id}` → 프로젝트와 그 안의 모든 항목 삭제
//!
//! 다른 사용자의 프로젝트는 항상 404로 응답합니다.

use crate::{
    db,
    error::AppError,
    middleware::auth::{AuthUser, ProjectAccess},
    models::*,
    routes::AppState,
};
use axum::{extract::State, Json};
use serde_json::{json, Value};

fn normalize_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Project name is required".to_string()));
    }
    Ok(trimmed.to_string())
}

/// `GET /projects`: 로그인한 사용자의 프로젝트만 반환합니다.
pub async fn list_projects(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let projects = db::list_projects(&state.pool, &auth_user.user_id).await?;
    Ok(Json(json!({ "projects": projects })))
}

/// `POST /projects`: 이름은 앞뒤 공백을 제거하며 비어 있으면 422입니다.
pub async fn create_project(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<CreateProjectRequest>,
) -> Result<Json<Project>, AppError> {
    let name = normalize_name(&req.name)?;
    let id = uuid::Uuid::now_v7().to_string();

    let project = db::create_project(
        &state.pool,
        &id,
        &auth_user.user_id,
        &name,
        req.cover_image_url.as_deref(),
    )
    .await?;
    tracing::debug!(project_id = %project.id, "Project created");

    Ok(Json(project))
}

/// `GET /projects/{project_id}`: 소유권 확인은 `ProjectAccess`가 끝냈습니다.
pub async fn get_project(access: ProjectAccess) -> Json<Project> {
    Json(access.project)
}

/// `PATCH /projects/{project_id}`
pub async fn update_project(
    State(state): State<AppState>,
    access: ProjectAccess,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, AppError> {
    let name = req.name.as_deref().map(normalize_name).transpose()?;

    let project = db::update_project(
        &state.pool,
        access.project_id(),
        &access.user_id,
        name.as_deref(),
        req.cover_image_url.as_deref(),
        req.pinned,
    )
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(Json(project))
}

/// `DELETE /projects/{project_id}`: 응답: `{ "deleted_items": n }`
pub async fn delete_project(
    State(state): State<AppState>,
    access: ProjectAccess,
) -> Result<Json<Value>, AppError> {
    let removed = db::delete_project(&state.pool, access.project_id(), &access.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    tracing::info!(project_id = %access.project_id(), removed, "Project deleted");

    Ok(Json(json!({ "deleted_items": removed })))
}
