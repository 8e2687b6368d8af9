use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError, RedisWrite, ToRedisArgs};
use std::future::Future;
use std::time::Duration;

pub struct RedisCacheStore {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisCacheStore {
    pub fn new(conn: ConnectionManager, op_timeout: Duration) -> Self {
        RedisCacheStore { conn, op_timeout }
    }

    pub async fn connect(dsn: &str, op_timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(dsn).map_err(|e| CacheError::Store(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::Store(e.to_string()))?;
        Ok(Self::new(conn, op_timeout))
    }

    async fn run<T, F>(&self, key: &str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) if e.code() == Some("WRONGTYPE") => {
                Err(CacheError::WrongType(key.to_string()))
            }
            Ok(Err(e)) => Err(CacheError::Store(e.to_string())),
            Err(_) => Err(CacheError::Store(format!(
                "redis call on {} timed out after {:?}",
                key, self.op_timeout
            ))),
        }
    }
}

impl ToRedisArgs for CacheValue {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        match self {
            CacheValue::Text(s) => out.write_arg(s.as_bytes()),
            CacheValue::Integer(n) => out.write_arg(n.to_string().as_bytes()),
        }
    }
}

#[async_trait::async_trait]
impl CacheStore for RedisCacheStore {
    async fn set(&self, key: &str, value: CacheValue, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        if ttl.is_zero() {
            self.run(key, conn.set::<_, _, ()>(key, &value)).await
        } else {
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
            self.run(key, conn.pset_ex::<_, _, ()>(key, &value, millis))
                .await
        }
    }

    async fn get(&self, key: &str) -> Result<CacheValue, CacheError> {
        let mut conn = self.conn.clone();
        let val: Option<String> = self.run(key, conn.get(key)).await?;
        val.map(CacheValue::Text).ok_or(CacheError::Miss)
    }

    async fn take(&self, key: &str) -> Result<CacheValue, CacheError> {
        let mut conn = self.conn.clone();
        let val: Option<String> = self.run(key, conn.get_del(key)).await?;
        val.map(CacheValue::Text).ok_or(CacheError::Miss)
    }

    async fn del(&self, keys: &[&str]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let label = keys.join(",");
        self.run(&label, conn.del::<_, ()>(keys.to_vec())).await
    }

    async fn add_to_set(&self, key: &str, members: &[&str]) -> Result<(), CacheError> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        self.run(key, conn.sadd::<_, _, ()>(key, members.to_vec()))
            .await
    }

    async fn is_member(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        self.run(key, conn.sismember(key, member)).await
    }
}
