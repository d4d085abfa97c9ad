//! # 에러 처리 모듈
//!
//! Lyra API에서 발생할 수 있는 모든 에러를 하나의 `AppError` 열거형으로 모읍니다.
//! 핸들러가 `Result<T, AppError>`를 반환하면 Axum이 `IntoResponse`를 통해
//! `{ "error": { "code": ..., "message": ... } }` 형태의 JSON 응답으로 바꿉니다.
//!
//! 에러 종류와 HTTP 상태 코드:
//! - `NotFound` → 404 (존재하지 않거나 **다른 사용자의** 리소스. 둘을 구분하지 않습니다)
//! - `Validation` → 422 (재정렬 목록이 순열이 아님, 빈 제목 등)
//! - `Unauthorized` → 401
//! - `Conflict` → 409 (이메일 중복, 리비전 충돌)
//! - `Internal` / `Database` / `Serde` → 500 (내용은 로그에만 남김)

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
#[derive(Debug, Error)]
pub enum AppError {
    /// 요청한 리소스를 찾을 수 없음 (HTTP 404)
    ///
    /// 소유하지 않은 프로젝트/문서도 이 에러로 응답하여
    /// 다른 사용자의 리소스 존재 여부가 드러나지 않게 합니다.
    #[error("Resource not found")]
    NotFound,

    /// 입력값 검증 실패 (HTTP 422)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// 서버 내부 오류 (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// 데이터베이스 오류 (HTTP 500)
    /// #[from]: sqlx 함수의 에러에 `?`를 쓰면 자동으로 이 variant로 변환됩니다.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// 문서에 내장된 챕터 트리(JSON)의 직렬화/역직렬화 오류 (HTTP 500)
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// 인증 실패 (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 리소스 충돌 (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl AppError {
    /// 응답 본문의 `code` 필드 값
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::Validation(_) => "validation_error",
            AppError::Internal(_) => "internal_error",
            AppError::Database(_) => "database_error",
            AppError::Serde(_) => "serialization_error",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Conflict(_) => "conflict",
        }
    }
}

impl IntoResponse for AppError {
    /// AppError를 HTTP 응답으로 변환합니다.
    ///
    /// 500 계열 에러는 실제 원인을 `tracing::error!`로 기록하고,
    /// 클라이언트에는 일반적인 메시지만 돌려줍니다.
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Validation(ref msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            AppError::Serde(ref e) => {
                tracing::error!("Stored document tree could not be (de)serialized: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Unauthorized(ref msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, msg.clone()),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
