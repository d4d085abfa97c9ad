use serde::{Deserialize, Serialize};

/// 한 사용자가 동시에 고정할 수 있는 프로젝트 수
pub const MAX_PINNED_PROJECTS: i64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub cover_image_url: Option<String>,
    /// 목록 맨 위에 고정
    pub pinned: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub cover_image_url: Option<String>,
}

/// null이거나 빠진 필드는 변경하지 않습니다.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub cover_image_url: Option<String>,
    pub pinned: Option<bool>,
}
