//! # 비즈니스 로직 서비스 모듈
//!
//! DB나 HTTP와 무관한 순수 로직을 모아둡니다.
//! - `wordcount`: HTML 본문 → 단어 수, 그리고 상향식 합산
//! - `tree`: 문서에 내장된 챕터·씬 트리의 추가/삭제/재정렬/자동저장
//! - `mailer`: 비밀번호 재설정 코드 발송

pub mod mailer;
pub mod tree;
pub mod wordcount;
