use crate::application_port::{AccessToken, RefreshToken};
use crate::domain_model::{AccountId, NewAccount};
use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    /// Detail stays in the server logs; clients get a generic message.
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub account: NewAccount,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SigninInput {
    pub username: String,
    pub password: String,
    pub remember_me: bool,
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub account_id: AccountId,
    pub access_token: AccessToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: RefreshToken,
    /// Lifetime of the stored refresh record, mirrored into the cookie.
    pub refresh_token_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct SigninResult {
    pub username: String,
    pub tokens: IssuedTokens,
}

/// How the old record is retired when a refresh token is rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationMode {
    /// Read, issue, store, then delete. Concurrent refreshes of one token may all win.
    #[default]
    Lenient,
    /// Atomically consume the old record first; at most one concurrent refresh wins.
    ///
    /// The old record is gone before the new pair is stored, so a failure while
    /// issuing leaves the caller signed out. That is intended: an internal error
    /// never revives a consumed token.
    Strict,
}

#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    /// Returns the trimmed username of the created account.
    async fn signup(&self, input: SignupInput) -> Result<String, SessionError>;
    async fn signin(&self, input: SigninInput) -> Result<SigninResult, SessionError>;
    async fn refresh(&self, refresh_token: Option<&str>) -> Result<IssuedTokens, SessionError>;
    async fn signout(&self, refresh_token: Option<&str>) -> Result<(), SessionError>;
}
