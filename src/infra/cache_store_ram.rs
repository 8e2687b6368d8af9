use crate::domain_port::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

enum Slot {
    Scalar(CacheValue),
    Members(HashSet<String>),
}

struct Entry {
    slot: Slot,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process [`CacheStore`]. Every operation runs under one store-wide lock.
#[derive(Default)]
pub struct RamCacheStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl RamCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, CacheError> {
        self.entries
            .lock()
            .map_err(|_| CacheError::Store("ram cache lock poisoned".to_string()))
    }

    /// Look up a live entry, dropping it first if it has expired.
    fn live<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &str,
        now: Instant,
    ) -> Option<&'a mut Entry> {
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }

    /// Number of live entries.
    pub fn len(&self) -> Result<usize, CacheError> {
        let now = Instant::now();
        Ok(self.lock()?.values().filter(|e| e.is_live(now)).count())
    }

    /// Physically remove expired entries. Reads already ignore them.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        Ok(before - entries.len())
    }

    pub fn spawn_sweeper(
        self: &Arc<Self>,
        every: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => match store.purge_expired() {
                        Ok(0) => {}
                        Ok(n) => debug!(
                            purged = n,
                            live = store.len().unwrap_or_default(),
                            "swept expired cache entries"
                        ),
                        Err(e) => debug!(%e, "cache sweep skipped"),
                    },
                }
            }
            info!("ram cache sweeper stopped");
        })
    }
}

#[async_trait::async_trait]
impl CacheStore for RamCacheStore {
    async fn set(&self, key: &str, value: CacheValue, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };
        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            Entry {
                slot: Slot::Scalar(value),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<CacheValue, CacheError> {
        let mut entries = self.lock()?;
        match Self::live(&mut entries, key, Instant::now()) {
            None => Err(CacheError::Miss),
            Some(Entry {
                slot: Slot::Scalar(value),
                ..
            }) => Ok(value.clone()),
            Some(_) => Err(CacheError::WrongType(key.to_string())),
        }
    }

    async fn take(&self, key: &str) -> Result<CacheValue, CacheError> {
        let mut entries = self.lock()?;
        match Self::live(&mut entries, key, Instant::now()) {
            None => return Err(CacheError::Miss),
            Some(Entry {
                slot: Slot::Members(_),
                ..
            }) => return Err(CacheError::WrongType(key.to_string())),
            Some(_) => {}
        }
        match entries.remove(key) {
            Some(Entry {
                slot: Slot::Scalar(value),
                ..
            }) => Ok(value),
            _ => Err(CacheError::Miss),
        }
    }

    async fn del(&self, keys: &[&str]) -> Result<(), CacheError> {
        let mut entries = self.lock()?;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }

    async fn add_to_set(&self, key: &str, members: &[&str]) -> Result<(), CacheError> {
        if members.is_empty() {
            return Ok(());
        }
        let mut entries = self.lock()?;
        match Self::live(&mut entries, key, Instant::now()) {
            Some(Entry {
                slot: Slot::Members(set),
                ..
            }) => {
                set.extend(members.iter().map(|m| m.to_string()));
                Ok(())
            }
            Some(_) => Err(CacheError::WrongType(key.to_string())),
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        slot: Slot::Members(members.iter().map(|m| m.to_string()).collect()),
                        expires_at: None,
                    },
                );
                Ok(())
            }
        }
    }

    async fn is_member(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let mut entries = self.lock()?;
        match Self::live(&mut entries, key, Instant::now()) {
            None => Ok(false),
            Some(Entry {
                slot: Slot::Members(set),
                ..
            }) => Ok(set.contains(member)),
            Some(_) => Err(CacheError::WrongType(key.to_string())),
        }
    }
}
