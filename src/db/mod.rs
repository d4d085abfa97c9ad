//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 데이터베이스와 직접 상호작용하는 함수들을 모아둔 모듈입니다.
//! 라우트 핸들러(routes/)에서 이 모듈의 함수를 호출하여 DB 작업을 수행합니다.
//!
//! 각 하위 모듈:
//! - `items`: 문서/폴더 항목과 내장 챕터 트리 저장 (리비전 비교 후 교체)
//! - `projects`: 프로젝트 CRUD와 소유권 조회
//! - `users`: 사용자, 리프레시 토큰, 비밀번호 재설정 코드

pub mod items;
pub mod projects;
pub mod users;

pub use items::*;
pub use projects::*;

use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;

/// 컴파일 타임에 `./migrations`의 SQL 파일들을 포함시킵니다.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// 연결 풀을 만들고 마이그레이션을 적용합니다.
///
/// 데이터베이스 파일이 없으면 새로 만들고, 외래키 제약을 켭니다.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    tracing::info!("Running database migrations...");
    MIGRATOR.run(&pool).await?;

    Ok(pool)
}

/// 테스트용 인메모리 DB.
///
/// `sqlite::memory:`는 연결마다 별도의 DB가 되므로 연결을 하나로 고정하고 닫지 않습니다.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    MIGRATOR.run(&pool).await.unwrap();
    pool
}
