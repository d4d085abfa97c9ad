//! 비밀번호 재설정 코드 같은 계정 메일을 내보내는 경계.
//!
//! 실제 메일 전송은 범위 밖이므로 기본 구현(`LogMailer`)은 메시지를 로그로만 남깁니다.
//! 테스트에서는 `RecordingMailer`로 보낸 메시지를 붙잡아 코드를 꺼냅니다.

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub trait Mailer: Send + Sync {
    fn send(&self, mail: OutgoingMail) -> Result<(), AppError>;
}

/// 개발용 전송기. 받는 사람과 제목만 info 레벨로 남기고 본문은 debug 레벨로 남깁니다.
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
        tracing::info!(to = %mail.to, subject = %mail.subject, "Account mail queued");
        tracing::debug!(to = %mail.to, body = %mail.body, "Account mail body");
        Ok(())
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingMailer {
    pub sent: std::sync::Mutex<Vec<OutgoingMail>>,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn last(&self) -> Option<OutgoingMail> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[cfg(test)]
impl Mailer for RecordingMailer {
    fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

pub fn reset_code_mail(to: &str, code: &str, ttl_minutes: i64) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Your Lyra password reset code".to_string(),
        body: format!(
            "Use this code to reset your Lyra password: {}\n\nIt expires in {} minutes.",
            code, ttl_minutes
        ),
    }
}
