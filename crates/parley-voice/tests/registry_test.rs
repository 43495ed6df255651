mod common;

use std::sync::Arc;

use common::MockTransport;
use parley_voice::{VoiceConfig, VoiceError, VoiceSessionRegistry};

fn registry_over(transport: &Arc<MockTransport>) -> VoiceSessionRegistry {
    VoiceSessionRegistry::new(transport.clone(), VoiceConfig::default())
}

#[tokio::test]
async fn join_is_idempotent_for_the_same_endpoint() {
    let transport = Arc::new(MockTransport::new(true));
    let registry = registry_over(&transport);

    let first = registry
        .join("guild-1", "channel-1", false)
        .await
        .expect("join");
    let second = registry
        .join("guild-1", "channel-1", false)
        .await
        .expect("join again");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(transport.join_count(), 1);
    assert_eq!(transport.leave_count(), 0);
}

#[tokio::test]
async fn joining_a_different_endpoint_leaves_first() {
    let transport = Arc::new(MockTransport::new(true));
    let registry = registry_over(&transport);

    registry
        .join("guild-1", "channel-1", false)
        .await
        .expect("join");
    let moved = registry
        .join("guild-1", "channel-2", false)
        .await
        .expect("rejoin");

    assert_eq!(moved.endpoint_id(), "channel-2");
    assert_eq!(transport.join_count(), 2);
    assert_eq!(transport.leave_count(), 1);
    assert_eq!(transport.leaves.lock().expect("lock")[0], "guild-1");
}

#[tokio::test]
async fn groups_are_independent() {
    let transport = Arc::new(MockTransport::new(true));
    let registry = registry_over(&transport);

    registry
        .join("guild-1", "channel-1", false)
        .await
        .expect("join");
    registry
        .join("guild-2", "channel-1", false)
        .await
        .expect("join");

    assert_eq!(transport.join_count(), 2);
    assert!(registry.is_connected("guild-1").await);
    assert!(registry.is_connected("guild-2").await);
}

#[tokio::test]
async fn leave_without_a_session_is_an_error() {
    let transport = Arc::new(MockTransport::new(true));
    let registry = registry_over(&transport);

    let err = registry.leave("guild-1").await.expect_err("must fail");
    assert!(matches!(err, VoiceError::NotConnected(_)), "{err}");
}

#[tokio::test]
async fn leave_disconnects_and_forgets_the_session() {
    let transport = Arc::new(MockTransport::new(true));
    let registry = registry_over(&transport);

    registry
        .join("guild-1", "channel-1", false)
        .await
        .expect("join");
    registry.leave("guild-1").await.expect("leave");

    assert_eq!(transport.leave_count(), 1);
    assert!(!registry.is_connected("guild-1").await);
    assert!(registry.get("guild-1").await.is_none());

    // a second leave has nothing to remove
    let err = registry.leave("guild-1").await.expect_err("must fail");
    assert!(matches!(err, VoiceError::NotConnected(_)), "{err}");
}

#[tokio::test]
async fn close_all_disconnects_every_group() {
    let transport = Arc::new(MockTransport::new(true));
    let registry = registry_over(&transport);

    registry
        .join("guild-1", "channel-1", false)
        .await
        .expect("join");
    registry
        .join("guild-2", "channel-2", false)
        .await
        .expect("join");

    registry.close_all().await;

    assert_eq!(transport.leave_count(), 2);
    assert!(!registry.is_connected("guild-1").await);
    assert!(!registry.is_connected("guild-2").await);
}
