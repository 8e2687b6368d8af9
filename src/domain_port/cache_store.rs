use std::fmt;
use std::time::Duration;

/// A scalar held by a [`CacheStore`].
///
/// Backends differ in what they hand back: the RAM store keeps the variant it was
/// given, Redis always answers with text. Readers go through the `as_*` helpers so
/// both representations decode the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheValue {
    Text(String),
    Integer(u64),
}

impl CacheValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            CacheValue::Integer(n) => Some(*n),
            CacheValue::Text(s) => s.parse::<u64>().ok(),
        }
    }
}

impl fmt::Display for CacheValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheValue::Text(s) => f.write_str(s),
            CacheValue::Integer(n) => write!(f, "{}", n),
        }
    }
}

impl From<u64> for CacheValue {
    fn from(value: u64) -> Self {
        CacheValue::Integer(value)
    }
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        CacheValue::Text(value)
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        CacheValue::Text(value.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache miss")]
    Miss,
    #[error("key {0} holds a value of the wrong type")]
    WrongType(String),
    #[error("store error: {0}")]
    Store(String),
}

impl CacheError {
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::Miss)
    }
}

/// Key/value and set storage with TTLs, shared by the whole process.
///
/// A zero `ttl` means the entry never expires. Implementations must behave the same
/// way for every call so that callers never branch on the backend in use.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Store `value` under `key`, replacing whatever was there.
    async fn set(&self, key: &str, value: CacheValue, ttl: Duration) -> Result<(), CacheError>;
    /// Fetch the live value under `key`, or [`CacheError::Miss`].
    async fn get(&self, key: &str) -> Result<CacheValue, CacheError>;
    /// Fetch and remove `key` in one atomic step.
    async fn take(&self, key: &str) -> Result<CacheValue, CacheError>;
    /// Delete every key given. Missing keys are ignored.
    async fn del(&self, keys: &[&str]) -> Result<(), CacheError>;
    /// Add members to the string set at `key`, creating it if needed.
    async fn add_to_set(&self, key: &str, members: &[&str]) -> Result<(), CacheError>;
    async fn is_member(&self, key: &str, member: &str) -> Result<bool, CacheError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_integer_decode_to_the_same_id() {
        assert_eq!(CacheValue::Integer(u64::MAX).as_u64(), Some(u64::MAX));
        assert_eq!(
            CacheValue::Text(u64::MAX.to_string()).as_u64(),
            Some(u64::MAX)
        );
        assert_eq!(CacheValue::Text("abc".to_string()).as_u64(), None);
    }

    #[test]
    fn display_renders_integers_in_decimal() {
        assert_eq!(CacheValue::Integer(42).to_string(), "42");
        assert_eq!(CacheValue::from("x").to_string(), "x");
    }
}
