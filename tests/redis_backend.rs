//! Runs against a live Redis only when `GATEWAY_TEST_REDIS_URL` is set,
//! e.g. `GATEWAY_TEST_REDIS_URL=redis://127.0.0.1:6379`.

use gateway::domain_model::AccountId;
use gateway::domain_port::*;
use gateway::infra_redis::RedisCacheStore;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

async fn store() -> Option<Arc<RedisCacheStore>> {
    let url = std::env::var("GATEWAY_TEST_REDIS_URL").ok()?;
    let store = RedisCacheStore::connect(&url, Duration::from_secs(2))
        .await
        .unwrap();
    Some(Arc::new(store))
}

fn key(name: &str) -> String {
    format!("gateway-test:{}:{}", Uuid::new_v4(), name)
}

#[tokio::test]
async fn scalar_values_round_trip_and_take_is_single_use() {
    let Some(store) = store().await else { return };
    let k = key("scalar");

    store
        .set(&k, CacheValue::Integer(42), Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(store.get(&k).await.unwrap().as_u64(), Some(42));
    assert_eq!(store.take(&k).await.unwrap().as_u64(), Some(42));
    assert!(store.take(&k).await.unwrap_err().is_miss());
}

#[tokio::test]
async fn entries_expire_after_ttl() {
    let Some(store) = store().await else { return };
    let k = key("ttl");

    store
        .set(&k, "short".into(), Duration::from_millis(100))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(store.get(&k).await.unwrap_err().is_miss());
}

#[tokio::test]
async fn zero_ttl_never_expires() {
    let Some(store) = store().await else { return };
    let k = key("forever");

    store.set(&k, "kept".into(), Duration::ZERO).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(store.get(&k).await.unwrap(), CacheValue::from("kept"));
    store.del(&[&k]).await.unwrap();
}

#[tokio::test]
async fn set_members_are_deduplicated() {
    let Some(store) = store().await else { return };
    let k = key("dedup");

    store.add_to_set(&k, &["alice"]).await.unwrap();
    store.add_to_set(&k, &["alice", "alice"]).await.unwrap();
    assert!(store.is_member(&k, "alice").await.unwrap());

    let url = std::env::var("GATEWAY_TEST_REDIS_URL").unwrap();
    let mut conn = redis::Client::open(url.as_str())
        .unwrap()
        .get_multiplexed_async_connection()
        .await
        .unwrap();
    let size: usize = redis::AsyncCommands::scard(&mut conn, &k).await.unwrap();
    assert_eq!(size, 1);
    store.del(&[&k]).await.unwrap();
}

#[tokio::test]
async fn sets_and_wrong_type_reads() {
    let Some(store) = store().await else { return };
    let k = key("set");

    store.add_to_set(&k, &["alice", "bob"]).await.unwrap();
    assert!(store.is_member(&k, "alice").await.unwrap());
    assert!(!store.is_member(&k, "carol").await.unwrap());
    assert!(matches!(
        store.get(&k).await.unwrap_err(),
        CacheError::WrongType(_)
    ));

    store.del(&[&k]).await.unwrap();
    assert!(!store.is_member(&k, "alice").await.unwrap());
}

#[tokio::test]
async fn refresh_token_store_on_redis() {
    let Some(store) = store().await else { return };
    let tokens = RefreshTokenStore::new(store);
    let token = Uuid::new_v4().to_string();

    tokens
        .set(&token, AccountId(7), Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(tokens.get(&token).await.unwrap(), AccountId(7));
    assert!(tokens.del(&token).await.unwrap());
    assert!(tokens.get(&token).await.unwrap_err().is_miss());
}
