//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `DATABASE_URL`: SQLite 데이터베이스 경로 (필수)
//! - `JWT_SECRET`: JWT 토큰 서명에 사용할 비밀키 (필수)
//! - `HOST`, `PORT`: 서버 바인딩 주소와 포트
//! - `CORS_ORIGIN`: 허용할 프론트엔드 출처 (없으면 모두 허용)
//! - `FRONTEND_DIST`: 빌드된 프론트엔드 디렉토리
//! - `RESET_CODE_TTL_MINUTES`: 비밀번호 재설정 코드 유효 시간
//! - `DB_MAX_CONNECTIONS`: 연결 풀 크기

use std::env;

/// 애플리케이션 전체 설정을 담는 구조체
///
/// 서버 시작 시 환경변수에서 한 번 읽어온 후 공유됩니다.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 데이터베이스 URL (예: "sqlite:data/lyra.db?mode=rwc")
    pub database_url: String,
    /// JWT 토큰 서명/검증에 사용하는 비밀키
    pub jwt_secret: String,
    /// 서버가 바인딩할 호스트 주소 (기본값: "0.0.0.0")
    pub host: String,
    /// 서버 포트 번호 (기본값: 8000)
    pub port: u16,
    /// CORS 허용 출처. None이면 모든 출처를 허용합니다 (개발용).
    pub cors_origin: Option<String>,
    /// 정적 프론트엔드 빌드 경로 (기본값: "../frontend/dist")
    pub frontend_dist: String,
    /// 비밀번호 재설정 코드 유효 시간(분)
    pub reset_code_ttl_minutes: i64,
    /// SQLite 연결 풀의 최대 연결 수
    pub db_max_connections: u32,
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `DATABASE_URL`과 `JWT_SECRET`은 필수이며, 없으면 `VarError`를 반환합니다.
    /// 나머지는 기본값이 있고, 숫자 파싱에 실패해도 기본값으로 대체합니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 8000),
            // 빈 문자열은 설정하지 않은 것으로 취급합니다.
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|v| !v.trim().is_empty()),
            frontend_dist: env::var("FRONTEND_DIST")
                .unwrap_or_else(|_| "../frontend/dist".to_string()),
            reset_code_ttl_minutes: parse_or("RESET_CODE_TTL_MINUTES", 15),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 5),
        })
    }
}

/// 환경변수를 `T`로 파싱하고, 없거나 파싱에 실패하면 `default`를 사용합니다.
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
