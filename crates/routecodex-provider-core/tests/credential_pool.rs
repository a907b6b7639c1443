use std::time::Duration;

use routecodex_provider_core::{
    CredentialPool, CredentialRecord, CredentialState, Event, EventHub, OperationalEvent,
    UnavailableReason,
};
use tokio::time::timeout;

fn api_key_record(key: &str) -> CredentialRecord {
    CredentialRecord {
        access_token: String::new(),
        refresh_token: None,
        expires_at: 0,
        api_key: Some(key.to_string()),
        created_at: 0,
    }
}

#[tokio::test]
async fn unavailable_recovers_via_queue() {
    let hub = EventHub::new(16);
    let mut rx = hub.subscribe();
    let pool = CredentialPool::new(hub.clone());

    pool.insert("test", "test.a".to_string(), api_key_record("k"))
        .await;

    pool.mark_unavailable(
        "test.a".to_string(),
        Duration::from_millis(50),
        UnavailableReason::RateLimit,
    )
    .await;

    let ev = timeout(Duration::from_millis(200), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        ev,
        Event::Operational(OperationalEvent::UnavailableStart(_))
    ));

    let ev = timeout(Duration::from_millis(500), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        ev,
        Event::Operational(OperationalEvent::UnavailableEnd(_))
    ));

    let state = pool.state(&"test.a".to_string()).await.unwrap();
    assert!(matches!(state, CredentialState::Active));
}

#[tokio::test]
async fn stale_queue_entry_does_not_recover_early() {
    let hub = EventHub::new(32);
    let pool = CredentialPool::new(hub);

    pool.insert("test", "test.a".to_string(), api_key_record("k"))
        .await;

    pool.mark_unavailable(
        "test.a".to_string(),
        Duration::from_millis(80),
        UnavailableReason::Timeout,
    )
    .await;
    pool.mark_unavailable(
        "test.a".to_string(),
        Duration::from_millis(200),
        UnavailableReason::Timeout,
    )
    .await;

    tokio::time::sleep(Duration::from_millis(120)).await;
    let state = pool.state(&"test.a".to_string()).await.unwrap();
    assert!(matches!(state, CredentialState::Unavailable { .. }));

    tokio::time::sleep(Duration::from_millis(150)).await;
    let state = pool.state(&"test.a".to_string()).await.unwrap();
    assert!(matches!(state, CredentialState::Active));
}

#[tokio::test]
async fn acquire_skips_cooled_down_credential() {
    let hub = EventHub::new(8);
    let pool = CredentialPool::new(hub);

    pool.insert("test", "test.a".to_string(), api_key_record("a"))
        .await;
    pool.insert("test", "test.b".to_string(), api_key_record("b"))
        .await;

    pool.mark_unavailable(
        "test.a".to_string(),
        Duration::from_secs(30),
        UnavailableReason::RateLimit,
    )
    .await;

    let (id, record) = pool.acquire("test").await.unwrap();
    assert_eq!(id, "test.b");
    assert_eq!(record.api_key.as_deref(), Some("b"));
}
