use crate::domain_model::AccountId;
use crate::domain_port::{CacheError, CacheStore, CacheValue};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

const KEY_PREFIX: &str = "refresh_token";

/// Maps opaque refresh tokens to the account they were issued for.
#[derive(Clone)]
pub struct RefreshTokenStore {
    cache: Arc<dyn CacheStore>,
}

impl RefreshTokenStore {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        RefreshTokenStore { cache }
    }

    fn key(token: &str) -> String {
        format!("{}:{}", KEY_PREFIX, token)
    }

    pub async fn set(
        &self,
        token: &str,
        account_id: AccountId,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.cache
            .set(&Self::key(token), CacheValue::Integer(account_id.0), ttl)
            .await
            .inspect_err(|e| error!(%e, "failed to store refresh token"))
    }

    pub async fn get(&self, token: &str) -> Result<AccountId, CacheError> {
        let key = Self::key(token);
        let value = self.cache.get(&key).await.inspect_err(|e| {
            if !e.is_miss() {
                error!(%e, "failed to read refresh token");
            }
        })?;
        Self::decode(key, value)
    }

    /// Remove the record and return the account it belonged to, atomically.
    pub async fn take(&self, token: &str) -> Result<AccountId, CacheError> {
        let key = Self::key(token);
        let value = self.cache.take(&key).await.inspect_err(|e| {
            if !e.is_miss() {
                error!(%e, "failed to take refresh token");
            }
        })?;
        Self::decode(key, value)
    }

    /// Always reports `true` on success, whether or not the token existed.
    pub async fn del(&self, token: &str) -> Result<bool, CacheError> {
        self.cache
            .del(&[&Self::key(token)])
            .await
            .inspect_err(|e| error!(%e, "failed to delete refresh token"))?;
        Ok(true)
    }

    fn decode(key: String, value: CacheValue) -> Result<AccountId, CacheError> {
        match value.as_u64() {
            Some(id) => Ok(AccountId(id)),
            None => {
                error!(key, "refresh token entry is not an account id");
                Err(CacheError::WrongType(key))
            }
        }
    }
}
