use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// JSON-encoded `UserSettings`
    pub settings: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub theme: String,
    pub wordcount_display: String,
    pub default_view: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            wordcount_display: "both".to_string(),
            default_view: "scene".to_string(),
        }
    }
}

impl UserSettings {
    pub fn apply(&mut self, req: UpdateSettingsRequest) {
        if let Some(theme) = req.theme {
            self.theme = theme;
        }
        if let Some(display) = req.wordcount_display {
            self.wordcount_display = display;
        }
        if let Some(view) = req.default_view {
            self.default_view = view;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub settings: UserSettings,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        // A row written before a settings field existed falls back to defaults.
        let settings = serde_json::from_str(&user.settings).unwrap_or_default();
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            settings,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettingsRequest {
    pub theme: Option<String>,
    pub wordcount_display: Option<String>,
    pub default_view: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

/// `password_reset_codes` row needed to check a submitted code
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PasswordResetCode {
    pub id: String,
    pub code_hash: String,
    pub expires_at: String,
    pub attempts: i64,
}
