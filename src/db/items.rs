//! # 문서/폴더 항목 데이터베이스 쿼리 모듈
//!
//! `documents` 테이블에는 문서와 폴더가 함께 저장됩니다 (`item_type` 컬럼으로 구분).
//! 문서의 챕터·씬 트리는 `chapters` 컬럼에 JSON으로 통째로 들어갑니다.
//!
//! ## 리비전(revision)과 비교 후 교체(CAS)
//! 트리 수정은 항상 "읽기 → 메모리에서 수정 → 전체 쓰기"입니다.
//! 두 요청이 같은 문서를 동시에 수정하면 나중 쓰기가 앞선 쓰기를 덮어쓸 수 있으므로,
//! 쓰기는 `WHERE id = ? AND revision = ?` 조건으로만 성공하고 리비전을 1 올립니다.
//! 조건이 맞지 않으면(다른 요청이 먼저 썼으면) `AppError::Conflict`를 반환합니다.
//!
//! 모든 조회는 `project_id`로 한정합니다. 프로젝트 소유권은 `ProjectAccess`가 이미 확인했으므로,
//! 다른 프로젝트의 항목 ID를 넣으면 "없음"으로 보입니다.

use crate::error::AppError;
use crate::models::*;
use sqlx::SqlitePool;

const ITEM_COLUMNS: &str = "id, project_id, parent_id, title, item_type, chapters, \
                            total_wordcount, revision, created_at, updated_at";

/// 프로젝트 안의 항목 하나를 조회합니다.
pub async fn get_item(
    pool: &SqlitePool,
    project_id: &str,
    id: &str,
) -> Result<Option<Item>, AppError> {
    let row = sqlx::query_as::<_, ItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM documents WHERE id = ? AND project_id = ?"
    ))
    .bind(id)
    .bind(project_id)
    .fetch_optional(pool)
    .await?;

    row.map(Item::try_from).transpose()
}

/// 부모 바로 아래의 항목들만 조회합니다 (재귀하지 않음).
///
/// `parent_id`가 `None`이면 루트 항목들입니다. 폴더가 먼저, 그 다음 생성순입니다.
pub async fn list_items(
    pool: &SqlitePool,
    project_id: &str,
    parent_id: Option<&str>,
) -> Result<Vec<Item>, AppError> {
    let rows = if let Some(parent_id) = parent_id {
        sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM documents
             WHERE project_id = ? AND parent_id = ?
             ORDER BY item_type = 'folder' DESC, created_at, id"
        ))
        .bind(project_id)
        .bind(parent_id)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM documents
             WHERE project_id = ? AND parent_id IS NULL
             ORDER BY item_type = 'folder' DESC, created_at, id"
        ))
        .bind(project_id)
        .fetch_all(pool)
        .await?
    };

    rows.into_iter().map(Item::try_from).collect()
}

/// 새 항목을 생성합니다. 문서는 빈 챕터 목록(`[]`), 폴더는 `NULL`로 시작합니다.
pub async fn create_item(
    pool: &SqlitePool,
    id: &str,
    project_id: &str,
    parent_id: Option<&str>,
    title: &str,
    item_type: ItemType,
) -> Result<Item, AppError> {
    let chapters = match item_type {
        ItemType::Document => Some("[]"),
        ItemType::Folder => None,
    };

    sqlx::query(
        r#"
        INSERT INTO documents (id, project_id, parent_id, title, item_type, chapters)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(project_id)
    .bind(parent_id)
    .bind(title)
    .bind(item_type.as_str())
    .bind(chapters)
    .execute(pool)
    .await?;

    get_item(pool, project_id, id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created item".to_string()))
}

pub const CYCLE_MESSAGE: &str = "An item cannot be moved into itself or one of its descendants";

/// 항목의 제목/부모를 부분 수정합니다.
///
/// 제공된 필드만 바꾸고, `updated_at`과 `revision`은 항상 갱신합니다.
/// 빈 제목이나 "부모는 폴더" 규칙은 호출하는 쪽에서 끝낸 상태여야 합니다.
///
/// 부모를 바꿀 때의 순환 검사는 같은 UPDATE 문의 `NOT EXISTS` 조건 안에서 합니다.
/// SQLite는 쓰기를 한 번에 하나씩 처리하므로, 동시에 들어온 "a를 b 아래로"와
/// "b를 a 아래로" 중 나중에 실행되는 쪽은 앞선 쓰기를 보고 거부됩니다.
pub async fn update_item_fields(
    pool: &SqlitePool,
    project_id: &str,
    id: &str,
    title: Option<&str>,
    parent_id: Option<&str>,
) -> Result<Option<Item>, AppError> {
    let mut query = String::from(
        "UPDATE documents SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'), revision = revision + 1",
    );
    let mut bindings = Vec::new();

    if let Some(title) = title {
        query.push_str(", title = ?");
        bindings.push(title);
    }
    if let Some(parent_id) = parent_id {
        query.push_str(", parent_id = ?");
        bindings.push(parent_id);
    }

    query.push_str(" WHERE id = ? AND project_id = ?");
    bindings.push(id);
    bindings.push(project_id);

    if let Some(parent_id) = parent_id {
        // 새 부모에서 루트까지의 사슬에 자기 자신이 있으면 순환입니다.
        query.push_str(
            " AND NOT EXISTS (
                WITH RECURSIVE chain(id, parent_id) AS (
                    SELECT id, parent_id FROM documents WHERE id = ?
                    UNION
                    SELECT d.id, d.parent_id FROM documents d JOIN chain c ON d.id = c.parent_id
                )
                SELECT 1 FROM chain WHERE chain.id = ?
            )",
        );
        bindings.push(parent_id);
        bindings.push(id);
    }

    let mut query_builder = sqlx::query(&query);
    for binding in bindings {
        query_builder = query_builder.bind(binding);
    }

    let result = query_builder.execute(pool).await?;
    if result.rows_affected() == 0 {
        return match (parent_id, get_item(pool, project_id, id).await?) {
            (Some(_), Some(_)) => Err(AppError::Validation(CYCLE_MESSAGE.to_string())),
            _ => Ok(None),
        };
    }

    get_item(pool, project_id, id).await
}

/// 문서의 챕터 트리 전체와 총 단어 수를 저장합니다.
///
/// `expected_revision`은 트리를 읽을 때의 리비전입니다.
/// 그 사이 다른 쓰기가 있었다면 0행이 갱신되고 `Conflict`를 반환합니다.
///
/// # 반환값
/// 저장 후의 새 리비전
pub async fn save_tree(
    pool: &SqlitePool,
    id: &str,
    expected_revision: i64,
    chapters: &[Chapter],
    total_wordcount: i64,
) -> Result<i64, AppError> {
    let json = serde_json::to_string(chapters)?;

    let result = sqlx::query(
        r#"
        UPDATE documents
        SET chapters = ?, total_wordcount = ?, revision = revision + 1,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = ? AND revision = ? AND item_type = 'document'
        "#,
    )
    .bind(&json)
    .bind(total_wordcount)
    .bind(id)
    .bind(expected_revision)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        tracing::warn!(document_id = %id, expected_revision, "Document changed since it was read");
        return Err(AppError::Conflict(
            "Document was modified by another request; reload and try again".to_string(),
        ));
    }

    Ok(expected_revision + 1)
}

/// 항목과 그 모든 하위 항목을 삭제합니다.
///
/// 하위 항목 ID를 재귀 CTE로 모은 뒤 한 트랜잭션에서 지웁니다.
/// 고아 항목(없는 `parent_id`를 가리키는 항목)은 남지 않습니다.
/// CTE는 `UNION`이라 부모 사슬이 어떤 이유로 고리를 이루더라도 끝납니다.
///
/// # 반환값
/// 삭제된 항목 수. 0이면 해당 항목이 없었다는 뜻입니다.
pub async fn delete_item_cascade(
    pool: &SqlitePool,
    project_id: &str,
    id: &str,
) -> Result<u64, AppError> {
    let mut tx = pool.begin().await?;

    let subtree: Vec<String> = sqlx::query_scalar(
        r#"
        WITH RECURSIVE subtree(id) AS (
            SELECT id FROM documents WHERE id = ? AND project_id = ?
            UNION
            SELECT d.id FROM documents d JOIN subtree s ON d.parent_id = s.id
        )
        SELECT id FROM subtree
        "#,
    )
    .bind(id)
    .bind(project_id)
    .fetch_all(&mut *tx)
    .await?;

    for item_id in &subtree {
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(subtree.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, users};
    use crate::services::tree;

    async fn seeded() -> (SqlitePool, String) {
        let pool = db::test_pool().await;
        users::create_user(&pool, "u1", "Writer", "writer@example.com", "hash")
            .await
            .unwrap();
        db::create_project(&pool, "p1", "u1", "Novel", None).await.unwrap();
        (pool, "p1".to_string())
    }

    #[tokio::test]
    async fn new_document_starts_empty() {
        let (pool, project) = seeded().await;
        let doc = create_item(&pool, "d1", &project, None, "Draft", ItemType::Document)
            .await
            .unwrap();

        assert_eq!(doc.item_type, ItemType::Document);
        assert!(doc.chapters.is_empty());
        assert_eq!(doc.total_wordcount, 0);
        assert_eq!(doc.revision, 0);
    }

    #[tokio::test]
    async fn lists_only_immediate_children() {
        let (pool, project) = seeded().await;
        create_item(&pool, "f1", &project, None, "Folder", ItemType::Folder).await.unwrap();
        create_item(&pool, "d1", &project, Some("f1"), "Inside", ItemType::Document).await.unwrap();
        create_item(&pool, "f2", &project, Some("f1"), "Nested", ItemType::Folder).await.unwrap();
        create_item(&pool, "d2", &project, Some("f2"), "Deep", ItemType::Document).await.unwrap();
        create_item(&pool, "d3", &project, None, "Root doc", ItemType::Document).await.unwrap();

        let root: Vec<String> = list_items(&pool, &project, None)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(root, vec!["f1", "d3"]);

        let inside: Vec<String> = list_items(&pool, &project, Some("f1"))
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(inside, vec!["f2", "d1"]);
    }

    #[tokio::test]
    async fn save_tree_round_trips_and_bumps_revision() {
        let (pool, project) = seeded().await;
        let doc = create_item(&pool, "d1", &project, None, "Draft", ItemType::Document)
            .await
            .unwrap();

        let mut chapters = doc.chapters.clone();
        let chapter = tree::append_chapter(&mut chapters, Some("One")).unwrap();
        let scene = tree::append_scene(&mut chapters, &chapter.id, None).unwrap();
        let counts =
            tree::autosave_scene(&mut chapters, &chapter.id, &scene.id, Some("<p>a b c</p>".into()))
                .unwrap();

        let revision = save_tree(&pool, &doc.id, doc.revision, &chapters, counts.document)
            .await
            .unwrap();
        assert_eq!(revision, 1);

        let stored = get_item(&pool, &project, "d1").await.unwrap().unwrap();
        assert_eq!(stored.revision, 1);
        assert_eq!(stored.total_wordcount, 3);
        assert_eq!(stored.chapters, chapters);
    }

    #[tokio::test]
    async fn stale_revision_is_a_conflict() {
        let (pool, project) = seeded().await;
        let doc = create_item(&pool, "d1", &project, None, "Draft", ItemType::Document)
            .await
            .unwrap();

        let mut first = doc.chapters.clone();
        tree::append_chapter(&mut first, Some("First writer")).unwrap();
        let mut second = doc.chapters.clone();
        tree::append_chapter(&mut second, Some("Second writer")).unwrap();

        save_tree(&pool, &doc.id, doc.revision, &first, 0).await.unwrap();
        let err = save_tree(&pool, &doc.id, doc.revision, &second, 0).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = get_item(&pool, &project, "d1").await.unwrap().unwrap();
        assert_eq!(stored.chapters.len(), 1);
        assert_eq!(stored.chapters[0].title, "First writer");
    }

    #[tokio::test]
    async fn folders_never_store_a_tree() {
        let (pool, project) = seeded().await;
        let folder = create_item(&pool, "f1", &project, None, "Folder", ItemType::Folder)
            .await
            .unwrap();

        let err = save_tree(&pool, &folder.id, folder.revision, &[], 0).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(get_item(&pool, &project, "f1").await.unwrap().unwrap().into_document().is_err());
    }

    #[tokio::test]
    async fn delete_cascades_to_descendants_only() {
        let (pool, project) = seeded().await;
        create_item(&pool, "f1", &project, None, "Folder", ItemType::Folder).await.unwrap();
        create_item(&pool, "f2", &project, Some("f1"), "Nested", ItemType::Folder).await.unwrap();
        create_item(&pool, "d1", &project, Some("f2"), "Deep", ItemType::Document).await.unwrap();
        create_item(&pool, "d2", &project, None, "Sibling", ItemType::Document).await.unwrap();

        let removed = delete_item_cascade(&pool, &project, "f1").await.unwrap();
        assert_eq!(removed, 3);

        for id in ["f1", "f2", "d1"] {
            assert!(get_item(&pool, &project, id).await.unwrap().is_none());
        }
        assert!(get_item(&pool, &project, "d2").await.unwrap().is_some());
        assert_eq!(delete_item_cascade(&pool, &project, "f1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn moves_under_own_descendant_are_refused() {
        let (pool, project) = seeded().await;
        create_item(&pool, "f1", &project, None, "A", ItemType::Folder).await.unwrap();
        create_item(&pool, "f2", &project, Some("f1"), "B", ItemType::Folder).await.unwrap();
        create_item(&pool, "f3", &project, None, "C", ItemType::Folder).await.unwrap();

        for target in ["f2", "f1"] {
            let err = update_item_fields(&pool, &project, "f1", None, Some(target))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        let f1 = get_item(&pool, &project, "f1").await.unwrap().unwrap();
        assert_eq!(f1.parent_id, None);
        assert_eq!(f1.revision, 0);

        let moved = update_item_fields(&pool, &project, "f1", None, Some("f3"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.parent_id.as_deref(), Some("f3"));
    }

    #[tokio::test]
    async fn crossing_moves_leave_no_cycle() {
        let (pool, project) = seeded().await;
        create_item(&pool, "a", &project, None, "A", ItemType::Folder).await.unwrap();
        create_item(&pool, "b", &project, None, "B", ItemType::Folder).await.unwrap();

        // Both moves were validated against the same snapshot; only the first may land.
        update_item_fields(&pool, &project, "a", None, Some("b")).await.unwrap();
        let err = update_item_fields(&pool, &project, "b", None, Some("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let b = get_item(&pool, &project, "b").await.unwrap().unwrap();
        assert_eq!(b.parent_id, None);
    }

    #[tokio::test]
    async fn delete_finishes_even_on_a_looped_chain() {
        let (pool, project) = seeded().await;
        create_item(&pool, "a", &project, None, "A", ItemType::Folder).await.unwrap();
        create_item(&pool, "b", &project, Some("a"), "B", ItemType::Folder).await.unwrap();
        sqlx::query("UPDATE documents SET parent_id = 'b' WHERE id = 'a'")
            .execute(&pool)
            .await
            .unwrap();

        let removed = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            delete_item_cascade(&pool, &project, "a"),
        )
        .await
        .expect("cascade delete should terminate")
        .unwrap();
        assert_eq!(removed, 2);
        assert!(get_item(&pool, &project, "b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn items_are_scoped_to_their_project() {
        let (pool, project) = seeded().await;
        db::create_project(&pool, "p2", "u1", "Other", None).await.unwrap();
        create_item(&pool, "d1", &project, None, "Draft", ItemType::Document).await.unwrap();

        assert!(get_item(&pool, "p2", "d1").await.unwrap().is_none());
        assert_eq!(delete_item_cascade(&pool, "p2", "d1").await.unwrap(), 0);
        assert!(update_item_fields(&pool, "p2", "d1", Some("x"), None)
            .await
            .unwrap()
            .is_none());
    }
}
