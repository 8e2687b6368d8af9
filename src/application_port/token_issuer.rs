use crate::domain_model::AccountId;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token is malformed")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshToken(pub String);

/// Which configured lifetime a new refresh token gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshLifetime {
    Standard,
    /// "Remember me" sign-ins.
    Extended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    pub account_id: AccountId,
    pub expires_at: DateTime<Utc>,
}

pub trait TokenIssuer: Send + Sync {
    fn generate_access_token(
        &self,
        account_id: AccountId,
    ) -> Result<(AccessToken, DateTime<Utc>), TokenError>;

    /// Check the signature and expiry of `token` and return its claims.
    fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError>;

    fn generate_refresh_token(
        &self,
        lifetime: RefreshLifetime,
    ) -> Result<(RefreshToken, DateTime<Utc>), TokenError>;
}
