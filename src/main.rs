//! # Lyra 웹 서버 진입점
//!
//! 소설 집필용 API 서버의 시작점입니다.
//!
//! 실행 순서:
//! 1. `.env` 로딩과 로깅(tracing) 초기화
//! 2. 환경변수에서 `Config` 읽기
//! 3. SQLite 연결 풀 생성과 마이그레이션 (`db::connect`)
//! 4. `AppState` 구성 후 `/api/v1` 아래에 API 라우터 장착
//! 5. CORS, 요청 로깅, (있으면) 프론트엔드 정적 파일 서빙
//! 6. HTTP 서버 시작

// ── 모듈 선언 ──
mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;

use anyhow::Result; // main에서는 어떤 에러든 `?`로 올려보냅니다.
use axum::{http::HeaderValue, Router};
use config::Config;
use routes::AppState;
use services::mailer::LogMailer;
use std::{path::Path, sync::Arc};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // .env 파일이 없어도 괜찮습니다. 시스템 환경변수만으로도 실행됩니다.
    dotenvy::dotenv().ok();

    // RUST_LOG가 없으면 lyra, tower_http, axum을 debug 레벨로 출력합니다.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lyra=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting Lyra server on {}:{}", config.host, config.port);

    // 연결 풀 생성 + 마이그레이션 실행
    let pool = db::connect(&config.database_url, config.db_max_connections).await?;

    let state = AppState {
        pool,
        jwt_secret: config.jwt_secret.clone(),
        reset_code_ttl_minutes: config.reset_code_ttl_minutes,
        mailer: Arc::new(LogMailer),
    };

    // ── CORS ──
    // CORS_ORIGIN이 있으면 그 출처만, 없으면 개발용으로 모든 출처를 허용합니다.
    let allow_origin = match config.cors_origin.as_deref() {
        Some(origin) => {
            tracing::info!("CORS restricted to {}", origin);
            AllowOrigin::exact(origin.parse::<HeaderValue>()?)
        }
        None => {
            tracing::warn!("CORS_ORIGIN not set, allowing any origin");
            AllowOrigin::from(Any)
        }
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = routes::api_router(state);

    // ── 프론트엔드 정적 파일 ──
    // SPA이므로 파일을 찾지 못한 경로는 index.html로 돌려보냅니다.
    let frontend_dist = Path::new(&config.frontend_dist);
    let app = if frontend_dist.exists() {
        tracing::info!("Serving frontend static files from {}", config.frontend_dist);
        let serve_dir = ServeDir::new(frontend_dist)
            .not_found_service(ServeFile::new(frontend_dist.join("index.html")));

        Router::new()
            .nest("/api/v1", api)
            .fallback_service(serve_dir)
    } else {
        tracing::warn!("Frontend dist directory not found, serving API only");
        Router::new().nest("/api/v1", api)
    };

    let app = app.layer(cors).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
