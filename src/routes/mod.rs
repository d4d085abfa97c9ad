//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들을 모아둔 모듈입니다.
//!
//! 각 하위 모듈:
//! - `auth`: 회원가입, 로그인, 토큰 갱신, 로그아웃, 설정, 비밀번호 재설정
//! - `projects`: 프로젝트 CRUD
//! - `items`: 프로젝트 안의 문서/폴더 트리, 문서 개요(outline)
//! - `chapters`: 문서에 내장된 챕터 추가/이름 변경/삭제/재정렬
//! - `scenes`: 씬 추가/조회/이름 변경/삭제/재정렬/자동 저장
//! - `health`: 서버 상태 확인
//!
//! `/projects/{project_id}` 아래의 모든 핸들러는 `ProjectAccess` 추출기를 받아
//! 소유권이 확인된 프로젝트만 다룹니다.

pub mod auth;
pub mod chapters;
pub mod health;
pub mod items;
pub mod projects;
pub mod scenes;


use crate::services::mailer::Mailer;
use axum::{
    routing::{get, patch, post, put},
    Router,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// 애플리케이션 공유 상태
///
/// 모든 요청 핸들러가 `State(state): State<AppState>`로 접근합니다.
/// `SqlitePool`과 `Arc`는 clone해도 같은 대상을 가리킵니다.
#[derive(Clone)]
pub struct AppState {
    /// SQLite 연결 풀
    pub pool: SqlitePool,
    /// JWT 토큰 서명용 비밀키
    pub jwt_secret: String,
    /// 비밀번호 재설정 코드 유효 시간(분)
    pub reset_code_ttl_minutes: i64,
    /// 계정 메일 전송기
    pub mailer: Arc<dyn Mailer>,
}

/// `/api/v1` 아래에 붙는 API 라우터를 만듭니다.
pub fn api_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/me/settings", patch(auth::update_settings))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/verify-reset-code", post(auth::verify_reset_code))
        .route(
            "/auth/reset-password",
            post(auth::reset_password).patch(auth::reset_password),
        );

    let project_routes = Router::new()
        .route("/projects", get(projects::list_projects).post(projects::create_project))
        .route(
            "/projects/{project_id}",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        );

    // 문서 경로 접두사
    const DOC: &str = "/projects/{project_id}/documents/{document_id}";

    let tree_routes = Router::new()
        .route(
            "/projects/{project_id}/documents",
            get(items::list_items).post(items::create_item),
        )
        .route(
            DOC,
            get(items::get_item)
                .patch(items::update_item)
                .delete(items::delete_item),
        )
        .route(&format!("{DOC}/outline"), get(items::get_outline))
        .route(
            &format!("{DOC}/chapters"),
            get(chapters::list_chapters).post(chapters::create_chapter),
        )
        .route(&format!("{DOC}/chapters/order"), put(chapters::reorder_chapters))
        .route(
            &format!("{DOC}/chapters/{{chapter_id}}"),
            patch(chapters::rename_chapter).delete(chapters::delete_chapter),
        )
        .route(
            &format!("{DOC}/chapters/{{chapter_id}}/scenes"),
            post(scenes::create_scene),
        )
        .route(
            &format!("{DOC}/chapters/{{chapter_id}}/scenes/order"),
            put(scenes::reorder_scenes),
        )
        .route(
            &format!("{DOC}/chapters/{{chapter_id}}/scenes/{{scene_id}}"),
            get(scenes::get_scene)
                .patch(scenes::rename_scene)
                .delete(scenes::delete_scene),
        )
        .route(
            &format!("{DOC}/chapters/{{chapter_id}}/scenes/{{scene_id}}/content"),
            put(scenes::autosave_scene),
        );

    Router::new()
        .merge(auth_routes)
        .merge(project_routes)
        .merge(tree_routes)
        .route("/health", get(health::health_check))
        .with_state(state)
}
