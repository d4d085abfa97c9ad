//! # 항목(Item) 모델 정의
//!
//! 프로젝트 안의 파일시스템 같은 트리를 이루는 항목(문서/폴더)과,
//! 문서 안에 **내장(embedded)**되는 챕터·씬 구조체를 정의합니다.
//!
//! ```text
//! Project ─┬─ Folder ── Document ─┬─ Chapter ─┬─ Scene
//!          │                      │           └─ Scene
//!          └─ Document            └─ Chapter ── Scene
//! ```
//!
//! 챕터와 씬은 별도 테이블이 아니라 `documents.chapters` 컬럼에 JSON 배열로 저장되며,
//! 부모 문서와 생명주기를 함께합니다.

use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// 항목 종류. DB의 `item_type` 컬럼과 JSON의 `type` 필드에 소문자로 저장됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Document,
    Folder,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Document => "document",
            ItemType::Folder => "folder",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "document" => Some(ItemType::Document),
            "folder" => Some(ItemType::Folder),
            _ => None,
        }
    }
}

/// 씬: 실제 본문(HTML)을 담는 가장 작은 단위
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub title: String,
    pub order: i64,
    #[serde(default)]
    pub content: String,
    /// `content`에서 계산된 단어 수 캐시
    #[serde(default)]
    pub wordcount: i64,
}

/// 챕터: 씬들의 순서 있는 목록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub order: i64,
    /// 항상 `Σ scene.wordcount`와 같아야 합니다.
    #[serde(default)]
    pub wordcount: i64,
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

/// `documents` 테이블 한 행을 그대로 읽어온 형태
///
/// `chapters`는 JSON 문자열이므로 `Item`으로 변환할 때 파싱합니다.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemRow {
    pub id: String,
    pub project_id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub item_type: String,
    pub chapters: Option<String>,
    pub total_wordcount: i64,
    pub revision: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// 문서 또는 폴더 항목 (챕터 트리가 파싱된 상태)
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub project_id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub item_type: ItemType,
    /// 폴더는 항상 빈 목록입니다.
    pub chapters: Vec<Chapter>,
    pub total_wordcount: i64,
    /// 쓰기마다 1씩 증가하는 리비전. 비교 후 교체(CAS) 저장에 사용합니다.
    pub revision: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Item {
    pub fn is_folder(&self) -> bool {
        self.item_type == ItemType::Folder
    }

    /// 문서만 통과시킵니다. 폴더는 챕터를 가질 수 없으므로 `NotFound`로 취급합니다.
    pub fn into_document(self) -> Result<Item, AppError> {
        if self.is_folder() {
            return Err(AppError::NotFound);
        }
        Ok(self)
    }
}

impl TryFrom<ItemRow> for Item {
    type Error = AppError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let item_type = ItemType::parse(&row.item_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown item type '{}' on {}", row.item_type, row.id))
        })?;

        let chapters = match (item_type, row.chapters.as_deref()) {
            (ItemType::Document, Some(json)) if !json.is_empty() => serde_json::from_str(json)?,
            _ => Vec::new(),
        };

        Ok(Self {
            id: row.id,
            project_id: row.project_id,
            parent_id: row.parent_id,
            title: row.title,
            item_type,
            chapters,
            total_wordcount: row.total_wordcount,
            revision: row.revision,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// 목록/단건 조회 응답. 챕터 본문은 포함하지 않습니다.
#[derive(Debug, Clone, Serialize)]
pub struct ItemSummary {
    pub id: String,
    pub project_id: String,
    pub parent_id: Option<String>,
    pub title: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub revision: i64,
    pub created_at: String,
    pub updated_at: String,
    /// 문서일 때만 채워집니다.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<i64>,
}

impl From<&Item> for ItemSummary {
    fn from(item: &Item) -> Self {
        let (chapter_count, word_count) = match item.item_type {
            ItemType::Document => (Some(item.chapters.len()), Some(item.total_wordcount)),
            ItemType::Folder => (None, None),
        };
        Self {
            id: item.id.clone(),
            project_id: item.project_id.clone(),
            parent_id: item.parent_id.clone(),
            title: item.title.clone(),
            item_type: item.item_type,
            revision: item.revision,
            created_at: item.created_at.clone(),
            updated_at: item.updated_at.clone(),
            chapter_count,
            word_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub title: String,
    #[serde(rename = "type", default = "default_item_type")]
    pub item_type: ItemType,
    pub parent_id: Option<String>,
}

fn default_item_type() -> ItemType {
    ItemType::Document
}

/// 부분 업데이트 요청. null이거나 빠진 필드는 변경하지 않습니다.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListItemsQuery {
    pub parent_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateChapterRequest {
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateSceneRequest {
    pub title: Option<String>,
}

/// 챕터/씬 제목 변경 요청
#[derive(Debug, Default, Deserialize)]
pub struct RenameRequest {
    pub title: Option<String>,
}

/// 재정렬 요청: 형제 항목 ID의 **완전한** 새 순서
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AutosaveRequest {
    pub content: Option<String>,
    /// 에디터가 마지막으로 본 문서 리비전 (선택)
    #[serde(default)]
    pub revision: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneOutline {
    pub id: String,
    pub title: String,
    pub wordcount: i64,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterOutline {
    pub id: String,
    pub title: String,
    pub wordcount: i64,
    pub order: i64,
    pub scenes: Vec<SceneOutline>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlineResponse {
    pub document_id: String,
    pub title: String,
    pub total_wordcount: i64,
    pub revision: i64,
    pub chapters: Vec<ChapterOutline>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneDetail {
    pub scene_id: String,
    pub chapter_id: String,
    pub title: String,
    pub order: i64,
    pub content: String,
    pub scene_wordcount: i64,
    pub chapter_wordcount: i64,
    pub document_wordcount: i64,
    pub revision: i64,
}

/// 자동 저장 후 클라이언트 표시용 단어 수
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordCounts {
    pub scene_id: String,
    pub chapter_id: String,
    pub scene_wordcount: i64,
    pub chapter_wordcount: i64,
    pub document_wordcount: i64,
    pub revision: i64,
}
