//! Platform authentication helpers.
//!
//! Sign-in is a fixed demo credential check plus simulated provider logins;
//! there is no identity backend. Sessions live in memory only.

mod session;

use entity::{Role, SessionUser};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use session::{Session, SessionStore};

pub const RESET_PASSWORD_HINT: &str = "Please contact system administrator to reset password.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthnError {
    #[error("{hint}")]
    InvalidCredentials { hint: String },
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DemoCredentials {
    pub username: String,
    pub password: String,
}

impl Default for DemoCredentials {
    fn default() -> Self {
        Self {
            username: "test".into(),
            password: "123456".into(),
        }
    }
}

impl DemoCredentials {
    /// Shown to users after a failed sign-in.
    pub fn hint(&self) -> String {
        format!("Try {} / {}", self.username, self.password)
    }

    pub fn banner(&self) -> String {
        format!("Demo credentials: {} / {}", self.username, self.password)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Clone, Debug)]
pub struct AuthnService {
    credentials: DemoCredentials,
    providers: Vec<String>,
}

impl AuthnService {
    pub fn new(credentials: DemoCredentials) -> Self {
        Self {
            credentials,
            providers: Vec::new(),
        }
    }

    pub fn with_provider(mut self, id: impl Into<String>) -> Self {
        self.providers.push(id.into());
        self
    }

    pub fn credentials(&self) -> &DemoCredentials {
        &self.credentials
    }

    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    pub fn login(&self, request: &LoginRequest) -> Result<SessionUser, AuthnError> {
        if request.username == self.credentials.username
            && request.password == self.credentials.password
        {
            Ok(SessionUser::local(request.username.clone(), request.role))
        } else {
            tracing::info!(username = %request.username, "rejected sign-in");
            Err(AuthnError::InvalidCredentials {
                hint: self.credentials.hint(),
            })
        }
    }

    pub fn provider_login(&self, provider: &str, role: Role) -> Result<SessionUser, AuthnError> {
        self.providers
            .iter()
            .find(|id| id.as_str() == provider)
            .map(|id| SessionUser::via_provider(id.clone(), role))
            .ok_or_else(|| AuthnError::UnknownProvider(provider.into()))
    }
}
