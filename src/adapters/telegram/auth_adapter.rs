//! AuthPort over the grammers login calls.
//!
//! The login token survives a wrong code so the same code request can be retried.
//! The password token is consumed by every check, right or wrong.

use crate::domain::DomainError;
use crate::ports::{AuthPort, LoginRejection, SignInResult};
use async_trait::async_trait;
use grammers_client::Client;
use grammers_client::SignInError;
use grammers_client::client::{LoginToken, PasswordToken};
use tokio::sync::Mutex;
use tracing::debug;

pub struct GrammersAuthAdapter {
    client: Client,
    pending_code: Mutex<Option<LoginToken>>,
    pending_password: Mutex<Option<PasswordToken>>,
}

impl GrammersAuthAdapter {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            pending_code: Mutex::new(None),
            pending_password: Mutex::new(None),
        }
    }
}

fn transport(step: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::Auth(format!("{}: {}", step, e))
}

#[async_trait]
impl AuthPort for GrammersAuthAdapter {
    async fn is_authenticated(&self) -> Result<bool, DomainError> {
        self.client
            .is_authorized()
            .await
            .map_err(|e| transport("authorization check", e))
    }

    async fn request_login_code(&self, phone: &str, api_hash: &str) -> Result<(), DomainError> {
        let token = self
            .client
            .request_login_code(phone, api_hash)
            .await
            .map_err(|e| transport("request login code", e))?;
        *self.pending_code.lock().await = Some(token);
        *self.pending_password.lock().await = None;
        Ok(())
    }

    async fn sign_in(&self, code: &str) -> Result<SignInResult, DomainError> {
        let mut pending = self.pending_code.lock().await;
        let Some(token) = pending.as_ref() else {
            return Err(DomainError::Auth("no login code was requested".into()));
        };
        let result = match self.client.sign_in(token, code).await {
            Ok(_user) => SignInResult::Success,
            Err(SignInError::InvalidCode) => {
                debug!("login code rejected; token kept for another try");
                return Ok(SignInResult::Rejected(LoginRejection::InvalidCode));
            }
            Err(SignInError::PasswordRequired(pt)) => {
                let hint = pt.hint().map(String::from);
                *self.pending_password.lock().await = Some(pt);
                SignInResult::PasswordRequired { hint }
            }
            Err(SignInError::SignUpRequired) => {
                SignInResult::Rejected(LoginRejection::SignUpRequired)
            }
            Err(e) => return Err(transport("sign in", e)),
        };
        *pending = None;
        Ok(result)
    }

    async fn check_password(&self, password: &[u8]) -> Result<SignInResult, DomainError> {
        let Some(pt) = self.pending_password.lock().await.take() else {
            return Err(DomainError::Auth("no password was requested".into()));
        };
        match self.client.check_password(pt, password).await {
            Ok(_user) => Ok(SignInResult::Success),
            Err(SignInError::InvalidPassword(_)) => {
                Ok(SignInResult::Rejected(LoginRejection::InvalidPassword))
            }
            Err(e) => Err(transport("check password", e)),
        }
    }
}
