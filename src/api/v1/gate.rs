use super::error::ApiError;
use crate::application_port::{TokenError, TokenIssuer};
use crate::domain_model::AccountId;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use warp::{Filter, Rejection, reject};

/// Request guard for routes that need a signed-in account.
pub struct AccessGate {
    token_issuer: Arc<dyn TokenIssuer>,
}

impl AccessGate {
    pub fn new(token_issuer: Arc<dyn TokenIssuer>) -> Self {
        AccessGate { token_issuer }
    }

    /// Resolve the account behind an `Authorization: Bearer <token>` header value.
    pub fn authorize(&self, authorization: Option<&str>) -> Result<AccountId, ApiError> {
        let token = authorization
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unauthorized("access token is required"))?;

        let claims = match self.token_issuer.verify_access_token(token) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => {
                return Err(ApiError::unauthorized("the access token has expired"));
            }
            Err(e) => {
                debug!(%e, "access token rejected");
                return Err(ApiError::unauthorized("failed to verify access token"));
            }
        };
        if Utc::now() > claims.expires_at {
            return Err(ApiError::unauthorized("the access token has expired"));
        }
        if !claims.account_id.is_valid() {
            return Err(ApiError::unauthorized("invalid access token"));
        }
        Ok(claims.account_id)
    }
}

pub fn with_verification(
    gate: Arc<AccessGate>,
) -> impl Filter<Extract = (AccountId,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let gate = gate.clone();
        async move {
            gate.authorize(header.as_deref())
                .map_err(reject::custom)
        }
    })
}
