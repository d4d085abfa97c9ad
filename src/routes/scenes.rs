//! # 씬 라우트 핸들러
//!
//! 경로: `/projects/{project_id}/documents/{document_id}/chapters/{chapter_id}/scenes/...`
//!
//! 자동 저장(`PUT .../content`)은 에디터가 주기적으로 호출합니다.
//! 본문을 교체하고 씬 → 챕터 → 문서 순으로 단어 수를 다시 계산해 트리 전체를 저장합니다.

use crate::{
    error::AppError,
    middleware::auth::ProjectAccess,
    models::*,
    routes::{
        chapters::ChapterPath,
        items::{load_document, outline_response, persist_tree},
        AppState,
    },
    services::tree,
};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ScenePath {
    pub document_id: String,
    pub chapter_id: String,
    pub scene_id: String,
}

fn scene_outline(scene: &Scene) -> SceneOutline {
    SceneOutline {
        id: scene.id.clone(),
        title: scene.title.clone(),
        wordcount: scene.wordcount,
        order: scene.order,
    }
}

/// `POST /scenes`: 챕터 맨 뒤에 추가합니다.
pub async fn create_scene(
    State(state): State<AppState>,
    access: ProjectAccess,
    Path(path): Path<ChapterPath>,
    Json(req): Json<CreateSceneRequest>,
) -> Result<Json<SceneOutline>, AppError> {
    let mut doc = load_document(&state, &access, &path.document_id).await?;
    let scene = tree::append_scene(&mut doc.chapters, &path.chapter_id, req.title.as_deref())?;
    persist_tree(&state, &mut doc).await?;
    tracing::debug!(document_id = %doc.id, chapter_id = %path.chapter_id, scene_id = %scene.id, "Scene created");

    Ok(Json(scene_outline(&scene)))
}

/// `GET /scenes/{scene_id}`: 본문과 씬/챕터/문서 단어 수
pub async fn get_scene(
    State(state): State<AppState>,
    access: ProjectAccess,
    Path(path): Path<ScenePath>,
) -> Result<Json<SceneDetail>, AppError> {
    let doc = load_document(&state, &access, &path.document_id).await?;
    let (chapter, scene) = tree::find_scene(&doc.chapters, &path.chapter_id, &path.scene_id)?;

    Ok(Json(SceneDetail {
        scene_id: scene.id.clone(),
        chapter_id: chapter.id.clone(),
        title: scene.title.clone(),
        order: scene.order,
        content: scene.content.clone(),
        scene_wordcount: scene.wordcount,
        chapter_wordcount: chapter.wordcount,
        document_wordcount: doc.total_wordcount,
        revision: doc.revision,
    }))
}

/// `PATCH /scenes/{scene_id}`: `title`이 없으면 아무것도 바꾸지 않습니다.
pub async fn rename_scene(
    State(state): State<AppState>,
    access: ProjectAccess,
    Path(path): Path<ScenePath>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<SceneOutline>, AppError> {
    let mut doc = load_document(&state, &access, &path.document_id).await?;

    let Some(title) = req.title.as_deref() else {
        let (_, scene) = tree::find_scene(&doc.chapters, &path.chapter_id, &path.scene_id)?;
        return Ok(Json(scene_outline(scene)));
    };

    let scene = tree::rename_scene(&mut doc.chapters, &path.chapter_id, &path.scene_id, title)?;
    persist_tree(&state, &mut doc).await?;
    Ok(Json(scene_outline(&scene)))
}

/// `DELETE /scenes/{scene_id}`: 챕터와 문서 단어 수가 함께 줄어듭니다.
pub async fn delete_scene(
    State(state): State<AppState>,
    access: ProjectAccess,
    Path(path): Path<ScenePath>,
) -> Result<Json<OutlineResponse>, AppError> {
    let mut doc = load_document(&state, &access, &path.document_id).await?;
    tree::remove_scene(&mut doc.chapters, &path.chapter_id, &path.scene_id)?;
    persist_tree(&state, &mut doc).await?;
    tracing::debug!(document_id = %doc.id, scene_id = %path.scene_id, "Scene deleted");

    Ok(Json(outline_response(&doc)))
}

/// `PUT /scenes/order`: 한 챕터 안의 씬 순서를 바꿉니다.
pub async fn reorder_scenes(
    State(state): State<AppState>,
    access: ProjectAccess,
    Path(path): Path<ChapterPath>,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<OutlineResponse>, AppError> {
    let mut doc = load_document(&state, &access, &path.document_id).await?;
    tree::reorder_scenes(&mut doc.chapters, &path.chapter_id, &req.ids)?;
    persist_tree(&state, &mut doc).await?;

    Ok(Json(outline_response(&doc)))
}

/// `PUT /scenes/{scene_id}/content`: 자동 저장
///
/// 요청: `{ "content": "<p>...</p>", "revision": 7 }`. `content`가 null이면 빈 본문으로 저장합니다.
///
/// `revision`은 에디터가 마지막으로 받은 리비전입니다. 주어졌는데 저장된 값과 다르면
/// 다른 탭이나 기기가 먼저 저장한 것이므로 덮어쓰지 않고 409로 응답합니다.
pub async fn autosave_scene(
    State(state): State<AppState>,
    access: ProjectAccess,
    Path(path): Path<ScenePath>,
    Json(req): Json<AutosaveRequest>,
) -> Result<Json<WordCounts>, AppError> {
    let mut doc = load_document(&state, &access, &path.document_id).await?;
    if let Some(seen) = req.revision {
        if seen != doc.revision {
            tracing::warn!(document_id = %doc.id, seen, current = doc.revision, "Autosave from a stale editor");
            return Err(AppError::Conflict(
                "Document was modified elsewhere; reload before saving".to_string(),
            ));
        }
    }

    let counts = tree::autosave_scene(&mut doc.chapters, &path.chapter_id, &path.scene_id, req.content)?;
    persist_tree(&state, &mut doc).await?;

    tracing::debug!(
        document_id = %doc.id,
        scene_id = %path.scene_id,
        scene_wordcount = counts.scene,
        revision = doc.revision,
        "Scene autosaved"
    );

    Ok(Json(WordCounts {
        scene_id: path.scene_id,
        chapter_id: path.chapter_id,
        scene_wordcount: counts.scene,
        chapter_wordcount: counts.chapter,
        document_wordcount: counts.document,
        revision: doc.revision,
    }))
}
