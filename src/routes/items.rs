//! # 항목(Item) 라우트 핸들러
//!
//! 프로젝트 안의 문서/폴더 트리를 다룹니다.
//!
//! ## 엔드포인트
//! - `GET    /projects/{project_id}/documents?parent_id=` → 한 단계 아래 자식 목록
//! - `POST   /projects/{project_id}/documents`            → 문서 또는 폴더 생성
//! - `GET    /projects/{project_id}/documents/{document_id}` → 단건 조회
//! - `PATCH  /projects/{project_id}/documents/{document_id}` → 제목 변경/이동
//! - `DELETE /projects/{project_id}/documents/{document_id}` → 하위 항목까지 삭제
//! - `GET    /projects/{project_id}/documents/{document_id}/outline` → 정렬된 챕터·씬 개요
//!
//! 챕터/씬 핸들러(`chapters`, `scenes`)도 여기의 `load_document()`와
//! `persist_tree()`로 "읽기 → 수정 → 리비전 확인 후 저장"을 수행합니다.

use crate::{
    db,
    error::AppError,
    middleware::auth::ProjectAccess,
    models::*,
    routes::AppState,
    services::tree,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct DocumentPath {
    pub document_id: String,
}

/// 프로젝트 안의 **문서**를 읽어옵니다. 없거나 폴더면 `NotFound`입니다.
pub(crate) async fn load_document(
    state: &AppState,
    access: &ProjectAccess,
    document_id: &str,
) -> Result<Item, AppError> {
    db::get_item(&state.pool, access.project_id(), document_id)
        .await?
        .ok_or(AppError::NotFound)?
        .into_document()
}

/// 단어 수를 전부 다시 계산하고 트리 전체를 저장합니다.
///
/// 읽은 뒤 다른 요청이 먼저 저장했다면 `Conflict`입니다.
/// 성공하면 `doc`의 합계와 리비전이 저장된 값으로 갱신됩니다.
pub(crate) async fn persist_tree(state: &AppState, doc: &mut Item) -> Result<(), AppError> {
    let total = tree::recompute_wordcounts(&mut doc.chapters);
    let revision = db::save_tree(&state.pool, &doc.id, doc.revision, &doc.chapters, total).await?;
    doc.total_wordcount = total;
    doc.revision = revision;
    Ok(())
}

pub(crate) fn outline_response(doc: &Item) -> OutlineResponse {
    OutlineResponse {
        document_id: doc.id.clone(),
        title: doc.title.clone(),
        total_wordcount: doc.total_wordcount,
        revision: doc.revision,
        chapters: tree::outline(&doc.chapters),
    }
}

/// 부모로 지정된 항목이 같은 프로젝트의 폴더인지 확인합니다.
async fn check_parent(state: &AppState, project_id: &str, parent_id: &str) -> Result<(), AppError> {
    let parent = db::get_item(&state.pool, project_id, parent_id)
        .await?
        .ok_or_else(|| AppError::Validation(format!("Parent item {} does not exist", parent_id)))?;

    if !parent.is_folder() {
        return Err(AppError::Validation("Parent item must be a folder".to_string()));
    }
    Ok(())
}

/// `GET /documents?parent_id=`: 자식 목록 (재귀하지 않음)
///
/// 응답: `{ "items": [...] }`. 문서에는 `chapter_count`와 `word_count`가 붙습니다.
pub async fn list_items(
    State(state): State<AppState>,
    access: ProjectAccess,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<Value>, AppError> {
    if let Some(parent_id) = query.parent_id.as_deref() {
        db::get_item(&state.pool, access.project_id(), parent_id)
            .await?
            .ok_or(AppError::NotFound)?;
    }

    let items = db::list_items(&state.pool, access.project_id(), query.parent_id.as_deref()).await?;
    let items: Vec<ItemSummary> = items.iter().map(ItemSummary::from).collect();
    Ok(Json(json!({ "items": items })))
}

/// `POST /documents`: 요청: `{ "title": "...", "type": "document" | "folder", "parent_id": null }`
pub async fn create_item(
    State(state): State<AppState>,
    access: ProjectAccess,
    Json(req): Json<CreateItemRequest>,
) -> Result<Json<ItemSummary>, AppError> {
    let title = tree::normalize_title(&req.title)?;
    if let Some(parent_id) = req.parent_id.as_deref() {
        check_parent(&state, access.project_id(), parent_id).await?;
    }

    let id = uuid::Uuid::now_v7().to_string();
    let item = db::create_item(
        &state.pool,
        &id,
        access.project_id(),
        req.parent_id.as_deref(),
        &title,
        req.item_type,
    )
    .await?;
    tracing::debug!(project_id = %access.project_id(), item_id = %item.id, kind = item.item_type.as_str(), "Item created");

    Ok(Json(ItemSummary::from(&item)))
}

/// `GET /documents/{document_id}`: 문서와 폴더 모두 조회할 수 있습니다.
pub async fn get_item(
    State(state): State<AppState>,
    access: ProjectAccess,
    Path(path): Path<DocumentPath>,
) -> Result<Json<ItemSummary>, AppError> {
    let item = db::get_item(&state.pool, access.project_id(), &path.document_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(ItemSummary::from(&item)))
}

/// `PATCH /documents/{document_id}`: 부분 수정
///
/// `null`이거나 빠진 필드는 바꾸지 않습니다. `parent_id`로 옮길 때는
/// 같은 프로젝트의 폴더여야 하고, 자기 자신이나 자손 아래로는 옮길 수 없습니다.
pub async fn update_item(
    State(state): State<AppState>,
    access: ProjectAccess,
    Path(path): Path<DocumentPath>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<ItemSummary>, AppError> {
    let project_id = access.project_id();
    db::get_item(&state.pool, project_id, &path.document_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let title = req.title.as_deref().map(tree::normalize_title).transpose()?;

    // 순환 여부는 db::update_item_fields가 쓰기와 같은 문장 안에서 확인합니다.
    if let Some(parent_id) = req.parent_id.as_deref() {
        check_parent(&state, project_id, parent_id).await?;
    }

    let item = db::update_item_fields(
        &state.pool,
        project_id,
        &path.document_id,
        title.as_deref(),
        req.parent_id.as_deref(),
    )
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(Json(ItemSummary::from(&item)))
}

/// `DELETE /documents/{document_id}`: 항목과 모든 하위 항목을 삭제합니다.
///
/// 응답: `{ "deleted": n }` (자기 자신 포함 삭제된 항목 수)
pub async fn delete_item(
    State(state): State<AppState>,
    access: ProjectAccess,
    Path(path): Path<DocumentPath>,
) -> Result<Json<Value>, AppError> {
    let deleted = db::delete_item_cascade(&state.pool, access.project_id(), &path.document_id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }
    tracing::debug!(project_id = %access.project_id(), item_id = %path.document_id, deleted, "Item deleted");

    Ok(Json(json!({ "deleted": deleted })))
}

/// `GET /documents/{document_id}/outline`: 폴더는 404입니다.
pub async fn get_outline(
    State(state): State<AppState>,
    access: ProjectAccess,
    Path(path): Path<DocumentPath>,
) -> Result<Json<OutlineResponse>, AppError> {
    let doc = load_document(&state, &access, &path.document_id).await?;
    Ok(Json(outline_response(&doc)))
}
