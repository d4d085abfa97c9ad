//! # 데이터 모델 모듈
//!
//! 애플리케이션에서 사용하는 데이터 구조체(struct)들을 정의합니다.
//! - `item`: 문서/폴더 항목과 그 안에 내장된 챕터·씬 트리
//! - `project`: 사용자가 소유하는 프로젝트
//! - `user`: 사용자와 인증 요청/응답
//!
//! `pub use X::*;`로 재공개하여 `crate::models::Chapter`처럼 짧게 접근합니다.

pub mod item;
pub mod project;
pub mod user;

pub use item::*;
pub use project::*;
pub use user::*;
