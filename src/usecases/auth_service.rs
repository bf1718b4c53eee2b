//! Login ceremony for the delegated session, as an explicit state machine.
//!
//! `Idle -> AwaitingCode -> Authorized`, or `AwaitingCode -> AwaitingPassword -> Authorized`.
//! A platform refusal lands in `Rejected`: a wrong code can be resubmitted, a wrong
//! password needs a new code. Transport errors land in `Failed`.
//! Front-ends (TUI, tests) only call these methods and read [`AuthService::state`].

use crate::domain::DomainError;
use crate::ports::{AuthPort, LoginRejection, SignInResult};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    AwaitingCode,
    AwaitingPassword { hint: Option<String> },
    Authorized,
    Rejected(LoginRejection),
    Failed(String),
}

pub struct AuthService {
    port: Arc<dyn AuthPort>,
    phone: SecretString,
    api_hash: SecretString,
    state: Mutex<AuthState>,
}

impl AuthService {
    pub fn new(port: Arc<dyn AuthPort>, phone: SecretString, api_hash: SecretString) -> Self {
        Self {
            port,
            phone,
            api_hash,
            state: Mutex::new(AuthState::Idle),
        }
    }

    pub async fn state(&self) -> AuthState {
        self.state.lock().await.clone()
    }

    /// Ask the session whether it is already logged in. Moves to `Authorized` if so.
    pub async fn refresh(&self) -> Result<AuthState, DomainError> {
        let authorized = self.port.is_authenticated().await?;
        let mut state = self.state.lock().await;
        if authorized {
            *state = AuthState::Authorized;
        }
        Ok(state.clone())
    }

    /// Send a login code to the configured phone.
    pub async fn request_code(&self) -> Result<AuthState, DomainError> {
        let mut state = self.state.lock().await;
        match *state {
            AuthState::Idle
            | AuthState::Failed(_)
            | AuthState::Rejected(_)
            | AuthState::AwaitingCode => {}
            ref other => return Err(invalid_transition("request_code", other)),
        }
        let result = self
            .port
            .request_login_code(self.phone.expose_secret(), self.api_hash.expose_secret())
            .await;
        *state = match &result {
            Ok(()) => {
                info!("login code requested");
                AuthState::AwaitingCode
            }
            Err(e) => AuthState::Failed(e.to_string()),
        };
        result.map(|_| state.clone())
    }

    /// Allowed while awaiting a code, and again after a wrong one.
    pub async fn submit_code(&self, code: &str) -> Result<AuthState, DomainError> {
        let mut state = self.state.lock().await;
        match *state {
            AuthState::AwaitingCode | AuthState::Rejected(LoginRejection::InvalidCode) => {}
            ref other => return Err(invalid_transition("submit_code", other)),
        }
        match self.port.sign_in(code.trim()).await {
            Ok(SignInResult::Success) => {
                info!("delegated session authorized");
                *state = AuthState::Authorized;
            }
            Ok(SignInResult::PasswordRequired { hint }) => {
                info!("two-factor password required");
                *state = AuthState::AwaitingPassword { hint };
            }
            Ok(SignInResult::Rejected(reason)) => {
                warn!(%reason, "sign-in rejected");
                *state = AuthState::Rejected(reason);
            }
            Err(e) => {
                warn!(error = %e, "sign-in failed");
                *state = AuthState::Failed(e.to_string());
                return Err(e);
            }
        }
        Ok(state.clone())
    }

    pub async fn submit_password(&self, password: &SecretString) -> Result<AuthState, DomainError> {
        let mut state = self.state.lock().await;
        if !matches!(*state, AuthState::AwaitingPassword { .. }) {
            return Err(invalid_transition("submit_password", &state));
        }
        match self
            .port
            .check_password(password.expose_secret().as_bytes())
            .await
        {
            Ok(SignInResult::Success) => {
                info!("delegated session authorized (2FA)");
                *state = AuthState::Authorized;
            }
            Ok(SignInResult::Rejected(reason)) => {
                warn!(%reason, "password rejected");
                *state = AuthState::Rejected(reason);
            }
            Ok(SignInResult::PasswordRequired { .. }) => {
                *state = AuthState::Failed("password asked twice".into());
            }
            Err(e) => {
                warn!(error = %e, "password check failed");
                *state = AuthState::Failed(e.to_string());
                return Err(e);
            }
        }
        Ok(state.clone())
    }
}

fn invalid_transition(step: &str, from: &AuthState) -> DomainError {
    DomainError::Auth(format!("{} not allowed in state {:?}", step, from))
}
