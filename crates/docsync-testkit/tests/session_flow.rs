//! End-to-end session flows against the in-memory store: chunked creation,
//! pull/push cycles between two clients, and divergence recovery.

use serde_json::json;

use docsync_client::{
    ClientError, MemorySessionStore, PushResult, Range, SessionClient, SessionStore,
};
use docsync_core::{Document, SessionId, Version};
use docsync_testkit::{init_tracing, sample_document, TestRig};

#[tokio::test]
async fn create_session_uploads_in_bounded_increments() {
    init_tracing();
    let rig = TestRig::new();
    let document = sample_document(100);

    let session = rig.client.create_session(&document).await.unwrap();

    // Created with the collection emptied, then seeded in three patches.
    assert_eq!(rig.store.patch_submission_count(), 3);
    let sizes: Vec<usize> = rig
        .store
        .accepted_patches(&session.session_id)
        .await
        .unwrap()
        .iter()
        .map(|p| p.0.len())
        .collect();
    assert_eq!(sizes, vec![40, 40, 20]);

    // Local handle and authoritative state agree after the third increment.
    let state = rig.store.current_state(&session.session_id).await.unwrap();
    assert_eq!(session.document, document);
    assert_eq!(state.document, document);
    assert_eq!(session.version, state.version);
}

#[tokio::test]
async fn join_session_reconstructs_through_ranges() {
    init_tracing();
    // A ceiling of 50 forces the ranged path for a 120-element collection.
    let rig = TestRig::with_store(MemorySessionStore::with_options("samples", Some(50)));
    let document = sample_document(120);
    let created = rig.client.create_session(&document).await.unwrap();

    let joined = rig
        .second_client("bob")
        .join_session(created.session_id.clone())
        .await
        .unwrap();

    assert_eq!(joined.document, document);
    assert_eq!(joined.version, created.version);
    assert_eq!(
        rig.store.range_requests(),
        vec![
            Range::new(0, 50),
            Range::new(50, 100),
            Range::new(100, 150),
            Range::new(120, 170),
        ]
    );
}

#[tokio::test]
async fn push_then_pull_propagates_between_clients() -> anyhow::Result<()> {
    init_tracing();
    let rig = TestRig::new();
    let bob = rig.second_client("bob");

    let alice_session = rig.client.create_session(&sample_document(5)).await?;
    let bob_session = bob.join_session(alice_session.session_id.clone()).await?;

    let edited = Document::new(json!({"title": "renamed", "samples": [0, 1, 2, 3, 4]}));
    let (alice_session, result) = rig
        .client
        .send_patch_if_changed(&alice_session, edited.clone())
        .await?;
    assert_eq!(result, PushResult::Committed);
    assert_eq!(alice_session.document, edited);

    let (bob_session, update) = bob.apply_latest_patches(&bob_session).await?;
    let update = update.expect("bob should see alice's patch");
    assert!(update.verified);
    assert_eq!(update.change_log, vec!["alice replaced /title"]);
    assert_eq!(bob_session.document, edited);
    assert_eq!(bob_session.version, alice_session.version);
    Ok(())
}

#[tokio::test]
async fn apply_latest_patches_is_idempotent_when_nothing_changed() -> anyhow::Result<()> {
    init_tracing();
    let rig = TestRig::new();
    let bob = rig.second_client("bob");

    let alice_session = rig.client.create_session(&sample_document(3)).await?;
    let bob_session = bob.join_session(alice_session.session_id.clone()).await?;

    let edited = Document::new(json!({"title": "y", "samples": [0, 1, 2]}));
    rig.client
        .send_patch_if_changed(&alice_session, edited)
        .await?;

    let (bob_session, first) = bob.apply_latest_patches(&bob_session).await?;
    assert!(first.is_some());

    // No intervening change: the second pull returns nothing and leaves
    // the handle untouched.
    let (unchanged, second) = bob.apply_latest_patches(&bob_session).await?;
    assert!(second.is_none());
    assert_eq!(unchanged, bob_session);
    Ok(())
}

#[tokio::test]
async fn unchanged_push_makes_no_network_call() {
    init_tracing();
    let rig = TestRig::new();
    let document = sample_document(3);
    let session = rig.client.create_session(&document).await.unwrap();
    let submissions_before = rig.store.patch_submission_count();

    let (same, result) = rig
        .client
        .send_patch_if_changed(&session, document)
        .await
        .unwrap();

    assert_eq!(result, PushResult::Unchanged);
    assert_eq!(same, session);
    assert_eq!(rig.store.patch_submission_count(), submissions_before);
}

#[tokio::test]
async fn diverged_push_resynchronizes_to_authoritative_state() {
    init_tracing();
    let rig = TestRig::new();
    let session = rig.client.create_session(&sample_document(3)).await.unwrap();

    // Authoritative state drifts without any recorded patch.
    rig.store
        .tamper(&session.session_id, |doc| {
            *doc = doc.with_collection("intruders", vec![json!("mallory")]);
        })
        .await
        .unwrap();

    let edited = Document::new(json!({"title": "mine", "samples": [0, 1, 2]}));
    let (session, result) = rig
        .client
        .send_patch_if_changed(&session, edited.clone())
        .await
        .unwrap();

    assert_eq!(result, PushResult::Diverged);
    // The handle must reflect ground truth, never the unverified candidate.
    let state = rig.store.current_state(&session.session_id).await.unwrap();
    assert_eq!(session.document, state.document);
    assert_eq!(session.version, state.version);
    assert_ne!(session.document, edited);
}

#[tokio::test]
async fn diverged_pull_returns_untrusted_patch_and_resyncs() -> anyhow::Result<()> {
    init_tracing();
    let rig = TestRig::new();
    let bob = rig.second_client("bob");

    let alice_session = rig.client.create_session(&sample_document(2)).await?;
    let bob_session = bob.join_session(alice_session.session_id.clone()).await?;

    let edited = Document::new(json!({"title": "z", "samples": [0, 1]}));
    rig.client
        .send_patch_if_changed(&alice_session, edited)
        .await?;

    // The declared hash now describes a state the recorded patches cannot
    // reproduce.
    rig.store
        .tamper(&alice_session.session_id, |doc| {
            *doc = doc.with_collection("intruders", vec![json!("mallory")]);
        })
        .await?;

    let (bob_session, update) = bob.apply_latest_patches(&bob_session).await?;
    let update = update.expect("patch is still returned for display");
    assert!(!update.verified);
    assert!(!update.patch.0.is_empty());

    let state = rig.store.current_state(&bob_session.session_id).await?;
    assert_eq!(bob_session.document, state.document);
    assert_eq!(bob_session.version, state.version);
    Ok(())
}

#[tokio::test]
async fn join_unknown_session_is_a_lookup_error() {
    init_tracing();
    let rig = TestRig::new();
    let err = rig
        .client
        .join_session(SessionId::new("no-such-session"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::SessionLookup { .. }));
}

#[tokio::test]
async fn failed_creation_is_a_session_create_error() {
    init_tracing();

    struct DownStore;

    #[async_trait::async_trait]
    impl SessionStore for DownStore {
        async fn create_session(
            &self,
            _document: &Document,
        ) -> docsync_client::Result<docsync_client::CreatedSession> {
            Err(ClientError::Transport("connection refused".into()))
        }

        async fn submit_patch(
            &self,
            _session_id: &SessionId,
            _patch: &docsync_core::Patch,
            _user_name: &str,
        ) -> docsync_client::Result<docsync_client::PatchAccepted> {
            Err(ClientError::Transport("connection refused".into()))
        }

        async fn fetch_full(
            &self,
            _session_id: &SessionId,
        ) -> docsync_client::Result<docsync_client::FullFetch> {
            Err(ClientError::Transport("connection refused".into()))
        }

        async fn fetch_range(
            &self,
            _session_id: &SessionId,
            _range: Range,
        ) -> docsync_client::Result<docsync_client::RangedChunk> {
            Err(ClientError::Transport("connection refused".into()))
        }

        async fn fetch_patches_since(
            &self,
            _session_id: &SessionId,
            _since: &Version,
        ) -> docsync_client::Result<docsync_client::PendingPatches> {
            Err(ClientError::Transport("connection refused".into()))
        }
    }

    let client = SessionClient::new(DownStore);
    let err = client
        .create_session(&sample_document(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::SessionCreate { .. }));
}
