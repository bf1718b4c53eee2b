//! Terminal login for the delegated session. Inquire prompts driving `AuthService`.

use crate::domain::DomainError;
use crate::ports::LoginRejection;
use crate::usecases::{AuthService, AuthState};
use inquire::ui::{Color, RenderConfig, StyleSheet, Styled};
use inquire::{Password, Text};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::info;

/// Wrong codes or passwords allowed before giving up.
const MAX_ATTEMPTS: usize = 3;

/// Neon prompt theme, applied globally to every inquire prompt.
pub fn apply_theme() {
    let config = RenderConfig::default()
        .with_prompt_prefix(Styled::new("›").with_fg(Color::Rgb {
            r: 0xbc,
            g: 0x13,
            b: 0xfe,
        }))
        .with_answer(StyleSheet::new().with_fg(Color::Rgb {
            r: 0x0f,
            g: 0xf0,
            b: 0xfc,
        }));
    inquire::set_global_render_config(config);
}

fn prompt_error(e: inquire::InquireError) -> DomainError {
    DomainError::Auth(format!("prompt: {}", e))
}

pub struct TuiLogin {
    auth: Arc<AuthService>,
}

impl TuiLogin {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }

    /// Walk the login state machine until `Authorized`. Prompts block, so they run
    /// on the blocking pool.
    pub async fn run(&self) -> Result<(), DomainError> {
        if self.auth.refresh().await? == AuthState::Authorized {
            info!("delegated session already authorized");
            return Ok(());
        }

        self.auth.request_code().await?;
        println!("A login code was sent to your Telegram app.");
        let mut rejections = 0;
        loop {
            let state = match self.auth.state().await {
                AuthState::AwaitingCode | AuthState::Rejected(LoginRejection::InvalidCode) => {
                    let code = prompt_text("Login code:").await?;
                    self.auth.submit_code(&code).await?
                }
                AuthState::AwaitingPassword { hint } => {
                    let label = match hint {
                        Some(h) => format!("Two-factor password (hint: {}):", h),
                        None => "Two-factor password:".to_string(),
                    };
                    let password = prompt_password(label).await?;
                    self.auth.submit_password(&password).await?
                }
                other => other,
            };

            match state {
                AuthState::Authorized => {
                    println!("Logged in.");
                    return Ok(());
                }
                AuthState::Rejected(LoginRejection::SignUpRequired) => {
                    return Err(DomainError::Auth(
                        LoginRejection::SignUpRequired.to_string(),
                    ));
                }
                AuthState::Rejected(reason) => {
                    println!("{}", reason);
                    rejections += 1;
                    if rejections >= MAX_ATTEMPTS {
                        return Err(DomainError::Auth("too many failed login attempts".into()));
                    }
                    if reason == LoginRejection::InvalidPassword {
                        self.auth.request_code().await?;
                        println!("A new login code was sent.");
                    }
                }
                AuthState::Failed(e) => return Err(DomainError::Auth(e)),
                AuthState::Idle => {
                    self.auth.request_code().await?;
                }
                AuthState::AwaitingCode | AuthState::AwaitingPassword { .. } => {}
            }
        }
    }
}

async fn prompt_text(label: &'static str) -> Result<String, DomainError> {
    tokio::task::spawn_blocking(move || Text::new(label).prompt())
        .await
        .map_err(|e| DomainError::Auth(e.to_string()))?
        .map_err(prompt_error)
}

async fn prompt_password(label: String) -> Result<SecretString, DomainError> {
    tokio::task::spawn_blocking(move || Password::new(&label).without_confirmation().prompt())
        .await
        .map_err(|e| DomainError::Auth(e.to_string()))?
        .map(SecretString::new)
        .map_err(prompt_error)
}
