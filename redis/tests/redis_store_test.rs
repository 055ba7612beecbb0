//! `RedisTicketStore` against a live server.
//!
//! Run with `cargo test -p session-tickets-redis -- --ignored` and a Redis
//! server at `REDIS_URL` (default `redis://127.0.0.1:6379`).

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

use chrono::{Duration, Utc};
use session_tickets_core::{
    AllocatorConfig, Reservation, SessionTicket, StoreError, TicketAllocator, TicketResolver,
    TicketStore,
};
use session_tickets_redis::{DEFAULT_OP_TIMEOUT, RedisTicketStore};

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

async fn connect() -> RedisTicketStore {
    RedisTicketStore::new(&redis_url(), DEFAULT_OP_TIMEOUT)
        .await
        .expect("Failed to create store")
}

/// Per-run prefix so repeated runs never see each other's keys.
fn unique_prefix(test: &str) -> String {
    format!("test:{test}:{}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

fn ticket(code: &str, minutes: i64) -> SessionTicket {
    let now = Utc::now();
    SessionTicket::new(
        code.to_string(),
        now,
        now + Duration::minutes(minutes),
        serde_json::json!({"host": "alice"}),
    )
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_reserve_then_conflict() {
    let store = connect().await;
    let key = format!("{}:QXFE", unique_prefix("conflict"));

    let first = ticket("QXFE", 10);
    let second = ticket("QXFE", 60);

    assert_eq!(
        store.reserve_if_absent(&key, &first, 600).await.unwrap(),
        Reservation::Reserved
    );
    assert_eq!(
        store.reserve_if_absent(&key, &second, 3600).await.unwrap(),
        Reservation::AlreadyExists
    );

    // The losing write left the original record in place
    let stored = store.fetch(&key).await.unwrap().unwrap();
    assert_eq!(stored, first);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_key_expires_with_ttl() {
    let store = connect().await;
    let key = format!("{}:ABCD", unique_prefix("expiry"));

    store.reserve_if_absent(&key, &ticket("ABCD", 1), 1).await.unwrap();
    assert!(store.fetch(&key).await.unwrap().is_some());

    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;

    assert!(store.fetch(&key).await.unwrap().is_none());

    // Code is free again
    assert_eq!(
        store.reserve_if_absent(&key, &ticket("ABCD", 1), 1).await.unwrap(),
        Reservation::Reserved
    );
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_concurrent_reserve_has_one_winner() {
    let store = connect().await;
    let key = format!("{}:RACE", unique_prefix("race"));

    let attempts = (0..20).map(|_| {
        let store = store.clone();
        let key = key.clone();
        tokio::spawn(async move { store.reserve_if_absent(&key, &ticket("RACE", 5), 300).await })
    });

    let results = futures::future::join_all(attempts).await;
    let winners = results
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .filter(|reservation| *reservation == Reservation::Reserved)
        .count();

    assert_eq!(winners, 1);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_allocate_and_resolve_round_trip() {
    let store = connect().await;
    let config = AllocatorConfig::new().with_key_prefix(unique_prefix("flow"));
    let allocator = TicketAllocator::new(store.clone(), config.clone()).unwrap();
    let resolver = TicketResolver::new(store, &config);

    let issued = allocator
        .allocate(Utc::now() + Duration::minutes(5), Some(serde_json::json!({"seats": 4})))
        .await
        .unwrap();

    let found = resolver.resolve(&issued.code.to_lowercase()).await.unwrap();
    assert_eq!(found, issued);
}

#[tokio::test]
#[ignore] // Requires Redis running
async fn test_ping() {
    let store = connect().await;
    store.ping().await.unwrap();
}

#[tokio::test]
async fn test_malformed_url_is_connection_error() {
    let result = RedisTicketStore::new("not a url", DEFAULT_OP_TIMEOUT).await;
    assert!(matches!(result, Err(StoreError::Connection(_))));
}
