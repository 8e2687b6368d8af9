use crate::domain_port::{CacheError, CacheStore};
use std::sync::Arc;
use tracing::error;

const RESERVATION_KEY: &str = "usernames_taken";

/// Usernames already known to be taken.
///
/// Entries are only added after the account service confirmed a collision, so a
/// negative answer from [`UsernameReservations::has`] proves nothing.
#[derive(Clone)]
pub struct UsernameReservations {
    cache: Arc<dyn CacheStore>,
}

impl UsernameReservations {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        UsernameReservations { cache }
    }

    pub async fn add(&self, username: &str) -> Result<(), CacheError> {
        self.cache
            .add_to_set(RESERVATION_KEY, &[username])
            .await
            .inspect_err(|e| error!(%e, username, "failed to reserve username"))
    }

    pub async fn has(&self, username: &str) -> Result<bool, CacheError> {
        self.cache
            .is_member(RESERVATION_KEY, username)
            .await
            .inspect_err(|e| error!(%e, username, "failed to check username reservation"))
    }
}
