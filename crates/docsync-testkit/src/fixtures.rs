//! Test fixtures and helpers.
//!
//! Common setup for integration tests: an in-memory store shared between
//! one or more clients, deterministic configurations, and canonical sample
//! documents.

use serde_json::{json, Value};

use docsync_client::{MemorySessionStore, SessionClient, SessionConfig};
use docsync_core::Document;

/// An in-memory store plus a client bound to it.
///
/// The store handle is a clone of the one inside the client, so tests can
/// inspect counters and tamper with authoritative state directly.
pub struct TestRig {
    pub store: MemorySessionStore,
    pub client: SessionClient<MemorySessionStore>,
}

impl TestRig {
    /// Rig with a default store and a deterministic `"alice"` client.
    pub fn new() -> Self {
        Self::with_store(MemorySessionStore::new())
    }

    /// Rig around an existing store (e.g. one with a full-fetch ceiling).
    pub fn with_store(store: MemorySessionStore) -> Self {
        let client = SessionClient::with_config(store.clone(), deterministic_config("alice"));
        Self { store, client }
    }

    /// Rig with full control over the client configuration.
    pub fn with_config(store: MemorySessionStore, config: SessionConfig) -> Self {
        let client = SessionClient::with_config(store.clone(), config);
        Self { store, client }
    }

    /// Another client for the same store, for multi-party tests.
    pub fn second_client(&self, user_name: &str) -> SessionClient<MemorySessionStore> {
        SessionClient::with_config(self.store.clone(), deterministic_config(user_name))
    }
}

impl Default for TestRig {
    fn default() -> Self {
        Self::new()
    }
}

/// A config with a fixed user name instead of a random anonymous label.
pub fn deterministic_config(user_name: &str) -> SessionConfig {
    SessionConfig {
        user_name: user_name.to_string(),
        ..SessionConfig::default()
    }
}

/// `{"title": "x", "samples": [0, 1, .., n-1]}`.
pub fn sample_document(n: usize) -> Document {
    let samples: Vec<Value> = (0..n).map(|i| json!(i)).collect();
    Document::new(json!({"title": "x", "samples": samples}))
}

/// Install a test tracing subscriber; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
