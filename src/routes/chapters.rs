//! # 챕터 라우트 핸들러
//!
//! 챕터는 문서 행 안의 `chapters` JSON에 들어 있습니다. 모든 변경은
//! 문서를 읽고, `services::tree`로 수정하고, 리비전을 확인하며 다시 저장합니다.

use crate::{
    error::AppError,
    middleware::auth::ProjectAccess,
    models::*,
    routes::{
        items::{load_document, outline_response, persist_tree, DocumentPath},
        AppState,
    },
    services::tree,
};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct ChapterPath {
    pub document_id: String,
    pub chapter_id: String,
}

/// `GET /chapters`: 응답: `{ "chapters": [...] }` (order 순, 씬 요약 포함)
pub async fn list_chapters(
    State(state): State<AppState>,
    access: ProjectAccess,
    Path(path): Path<DocumentPath>,
) -> Result<Json<Value>, AppError> {
    let doc = load_document(&state, &access, &path.document_id).await?;
    Ok(Json(json!({ "chapters": tree::outline(&doc.chapters) })))
}

/// `POST /chapters`: 맨 뒤에 추가합니다. 폴더에는 만들 수 없습니다.
pub async fn create_chapter(
    State(state): State<AppState>,
    access: ProjectAccess,
    Path(path): Path<DocumentPath>,
    Json(req): Json<CreateChapterRequest>,
) -> Result<Json<ChapterOutline>, AppError> {
    let mut doc = load_document(&state, &access, &path.document_id).await?;
    let chapter = tree::append_chapter(&mut doc.chapters, req.title.as_deref())?;
    persist_tree(&state, &mut doc).await?;
    tracing::debug!(document_id = %doc.id, chapter_id = %chapter.id, order = chapter.order, "Chapter created");

    Ok(Json(tree::chapter_outline(&chapter)))
}

/// `PATCH /chapters/{chapter_id}`: `title`이 없으면 아무것도 바꾸지 않습니다.
pub async fn rename_chapter(
    State(state): State<AppState>,
    access: ProjectAccess,
    Path(path): Path<ChapterPath>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<ChapterOutline>, AppError> {
    let mut doc = load_document(&state, &access, &path.document_id).await?;

    let Some(title) = req.title.as_deref() else {
        let chapter = tree::find_chapter(&doc.chapters, &path.chapter_id)?;
        return Ok(Json(tree::chapter_outline(chapter)));
    };

    let chapter = tree::rename_chapter(&mut doc.chapters, &path.chapter_id, title)?;
    persist_tree(&state, &mut doc).await?;
    Ok(Json(tree::chapter_outline(&chapter)))
}

/// `DELETE /chapters/{chapter_id}`: 남은 챕터의 순서를 다시 매기고 개요를 돌려줍니다.
pub async fn delete_chapter(
    State(state): State<AppState>,
    access: ProjectAccess,
    Path(path): Path<ChapterPath>,
) -> Result<Json<OutlineResponse>, AppError> {
    let mut doc = load_document(&state, &access, &path.document_id).await?;
    tree::remove_chapter(&mut doc.chapters, &path.chapter_id)?;
    persist_tree(&state, &mut doc).await?;
    tracing::debug!(document_id = %doc.id, chapter_id = %path.chapter_id, "Chapter deleted");

    Ok(Json(outline_response(&doc)))
}

/// `PUT /chapters/order`: 요청: `{ "ids": [...] }` (현재 챕터 ID 전체의 새 순서)
pub async fn reorder_chapters(
    State(state): State<AppState>,
    access: ProjectAccess,
    Path(path): Path<DocumentPath>,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<OutlineResponse>, AppError> {
    let mut doc = load_document(&state, &access, &path.document_id).await?;
    tree::reorder_chapters(&mut doc.chapters, &req.ids)?;
    persist_tree(&state, &mut doc).await?;

    Ok(Json(outline_response(&doc)))
}
