//! Consent decisions shared across a client's groups

use std::sync::Arc;

use murmur_core::consent::{ConsentKey, ConsentRecord, ConsentState, MemoryConsentBackend};
use murmur_core::engine::{GroupId, InMemoryEngine};
use murmur_core::test_utils::{assert_no_backend_query, ALICE, BOB, CAROL};
use murmur_core::{Client, ClientError};

#[tokio::test]
async fn test_deny_two_then_allow_one() -> Result<(), ClientError> {
    let backend = Arc::new(MemoryConsentBackend::new());
    let client = Client::new(ALICE, backend.clone());
    let consent = client.consent();

    consent.deny(&[BOB, CAROL]).await?;
    assert!(consent.is_denied(BOB).await?);
    assert!(consent.is_denied(CAROL).await?);

    consent.allow(&[BOB]).await?;
    assert!(consent.is_allowed(BOB).await?);
    assert!(!consent.is_denied(BOB).await?);
    assert!(consent.is_denied(CAROL).await?);
    Ok(())
}

#[tokio::test]
async fn test_cached_lookups_skip_backend() -> Result<(), ClientError> {
    let backend = Arc::new(MemoryConsentBackend::with_records([ConsentRecord {
        key: ConsentKey::address(BOB),
        state: ConsentState::Allowed,
    }]));
    let client = Client::new(ALICE, backend.clone());
    let consent = client.consent();

    assert!(consent.is_allowed(BOB).await?);
    assert_eq!(backend.query_count(), 1);

    let upper = BOB.to_uppercase();
    let state = assert_no_backend_query(&backend, consent.state(&upper)).await?;
    assert_eq!(state, ConsentState::Allowed);
    Ok(())
}

#[tokio::test]
async fn test_invalidate_forces_one_requery() -> Result<(), ClientError> {
    let backend = Arc::new(MemoryConsentBackend::new());
    let client = Client::new(ALICE, backend.clone());
    let group_id = GroupId::random();

    assert_eq!(client.consent().group_state(&group_id).await?, ConsentState::Unknown);
    assert_eq!(backend.query_count(), 1);

    client.consent().invalidate(&ConsentKey::group(&group_id)).await;
    client.consent().group_state(&group_id).await?;
    client.consent().group_state(&group_id).await?;
    assert_eq!(backend.query_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_groups_of_one_client_share_decisions() -> Result<(), ClientError> {
    let backend = Arc::new(MemoryConsentBackend::new());
    let client = Client::new(ALICE, backend.clone());
    let first = client.group(Arc::new(InMemoryEngine::new(ALICE)));
    let second = client.group(Arc::new(InMemoryEngine::new(ALICE)));

    first.send("hello", None).await?;
    assert!(client.consent().is_group_allowed(first.id()).await?);
    assert!(!client.consent().is_group_allowed(second.id()).await?);

    client.consent().deny_groups(&[second.id().clone()]).await?;
    assert!(client.consent().is_group_denied(second.id()).await?);
    assert!(client.consent().is_group_allowed(first.id()).await?);
    Ok(())
}

#[tokio::test]
async fn test_interleaved_updates_from_many_tasks() -> Result<(), ClientError> {
    let backend = Arc::new(MemoryConsentBackend::new());
    let client = Client::new(ALICE, backend);

    let mut tasks = Vec::new();
    for round in 0..10 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            if round % 2 == 0 {
                client.consent().allow(&[BOB]).await
            } else {
                client.consent().deny(&[BOB]).await
            }
        }));
    }
    for task in tasks {
        task.await.expect("task panicked")?;
    }

    let state = client.consent().state(BOB).await?;
    assert!(matches!(state, ConsentState::Allowed | ConsentState::Denied));
    Ok(())
}
