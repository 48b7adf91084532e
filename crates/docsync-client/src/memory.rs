//! In-memory session store.
//!
//! A complete authoritative store kept in process memory, used by the test
//! suites and as a reference for the server-side contract. Clones share the
//! same sessions, so one instance can serve several clients at once.
//!
//! Beyond the wire operations it exposes test hooks: request counters, the
//! log of requested ranges, and [`MemorySessionStore::tamper`], which
//! mutates the authoritative document without recording a patch and thereby
//! manufactures the divergence the client is supposed to detect.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::RwLock;

use docsync_core::{content_hash, ChangeLogEntry, Document, Patch, SessionId, Version};

use crate::error::{ClientError, Result};
use crate::messages::{
    CreatedSession, FullFetch, FullState, PatchAccepted, PendingPatches, Range, RangedChunk,
};
use crate::store::SessionStore;

/// In-memory authoritative session store.
#[derive(Clone)]
pub struct MemorySessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    collection_field: String,
    /// Collections longer than this are refused on full fetch, simulating
    /// the transport payload ceiling. `None` always serves full fetches.
    full_fetch_limit: Option<usize>,
    next_session: AtomicU64,
    sessions: RwLock<HashMap<SessionId, SessionRecord>>,
    patch_submissions: AtomicUsize,
    full_fetches: AtomicUsize,
    diff_fetches: AtomicUsize,
    range_requests: Mutex<Vec<Range>>,
}

struct SessionRecord {
    document: Document,
    seq: u64,
    accepted: Vec<AcceptedPatch>,
}

struct AcceptedPatch {
    seq: u64,
    patch: Patch,
    entries: Vec<ChangeLogEntry>,
}

impl MemorySessionStore {
    /// Store with the default `"samples"` collection field and no payload
    /// ceiling.
    pub fn new() -> Self {
        Self::with_options("samples", None)
    }

    /// Store with an explicit collection field and optional full-fetch
    /// ceiling.
    pub fn with_options(collection_field: &str, full_fetch_limit: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Inner {
                collection_field: collection_field.to_string(),
                full_fetch_limit,
                next_session: AtomicU64::new(0),
                sessions: RwLock::new(HashMap::new()),
                patch_submissions: AtomicUsize::new(0),
                full_fetches: AtomicUsize::new(0),
                diff_fetches: AtomicUsize::new(0),
                range_requests: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Mutate the authoritative document without recording a patch.
    ///
    /// Subsequent declared hashes describe the tampered state while the
    /// recorded patches do not, which is exactly the divergence the client
    /// must detect and recover from.
    pub async fn tamper<F>(&self, session_id: &SessionId, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Document),
    {
        let mut sessions = self.inner.sessions.write().await;
        let record = sessions
            .get_mut(session_id)
            .ok_or_else(|| unknown_session(session_id))?;
        mutate(&mut record.document);
        Ok(())
    }

    /// The authoritative document and version as the store sees them.
    pub async fn current_state(&self, session_id: &SessionId) -> Result<FullState> {
        let sessions = self.inner.sessions.read().await;
        let record = sessions
            .get(session_id)
            .ok_or_else(|| unknown_session(session_id))?;
        Ok(FullState {
            document: record.document.clone(),
            version: version_token(record.seq),
        })
    }

    /// Every patch accepted for a session, in acceptance order.
    pub async fn accepted_patches(&self, session_id: &SessionId) -> Result<Vec<Patch>> {
        let sessions = self.inner.sessions.read().await;
        let record = sessions
            .get(session_id)
            .ok_or_else(|| unknown_session(session_id))?;
        Ok(record.accepted.iter().map(|a| a.patch.clone()).collect())
    }

    pub fn patch_submission_count(&self) -> usize {
        self.inner.patch_submissions.load(Ordering::Relaxed)
    }

    pub fn full_fetch_count(&self) -> usize {
        self.inner.full_fetches.load(Ordering::Relaxed)
    }

    pub fn diff_fetch_count(&self) -> usize {
        self.inner.diff_fetches.load(Ordering::Relaxed)
    }

    /// Ranges requested so far, in request order.
    pub fn range_requests(&self) -> Vec<Range> {
        self.inner.range_requests.lock().expect("lock poisoned").clone()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, document: &Document) -> Result<CreatedSession> {
        let n = self.inner.next_session.fetch_add(1, Ordering::Relaxed) + 1;
        let session_id = SessionId::new(format!("session-{n}"));
        let record = SessionRecord {
            document: document.clone(),
            seq: 1,
            accepted: Vec::new(),
        };
        let version = version_token(record.seq);
        self.inner
            .sessions
            .write()
            .await
            .insert(session_id.clone(), record);
        Ok(CreatedSession {
            session_id,
            version,
        })
    }

    async fn submit_patch(
        &self,
        session_id: &SessionId,
        patch: &Patch,
        user_name: &str,
    ) -> Result<PatchAccepted> {
        let mut sessions = self.inner.sessions.write().await;
        let record = sessions
            .get_mut(session_id)
            .ok_or_else(|| unknown_session(session_id))?;

        // The store is authoritative: a patch that does not apply to the
        // current state is refused wholesale.
        let next = docsync_core::apply(&record.document, patch)
            .map_err(|e| ClientError::Transport(format!("store rejected patch: {e}")))?;

        record.seq += 1;
        record.accepted.push(AcceptedPatch {
            seq: record.seq,
            patch: patch.clone(),
            entries: change_entries(patch, user_name),
        });
        record.document = next;
        self.inner.patch_submissions.fetch_add(1, Ordering::Relaxed);

        Ok(PatchAccepted {
            hash_of_latest_state: content_hash(&record.document),
            latest_version: version_token(record.seq),
        })
    }

    async fn fetch_full(&self, session_id: &SessionId) -> Result<FullFetch> {
        self.inner.full_fetches.fetch_add(1, Ordering::Relaxed);
        let sessions = self.inner.sessions.read().await;
        let record = sessions
            .get(session_id)
            .ok_or_else(|| unknown_session(session_id))?;

        let len = record.document.collection_len(&self.inner.collection_field);
        if self.inner.full_fetch_limit.map_or(false, |limit| len > limit) {
            return Ok(FullFetch::UseRanged);
        }
        Ok(FullFetch::Complete(FullState {
            document: record.document.clone(),
            version: version_token(record.seq),
        }))
    }

    async fn fetch_range(&self, session_id: &SessionId, range: Range) -> Result<RangedChunk> {
        self.inner
            .range_requests
            .lock()
            .expect("lock poisoned")
            .push(range);
        let sessions = self.inner.sessions.read().await;
        let record = sessions
            .get(session_id)
            .ok_or_else(|| unknown_session(session_id))?;

        let field = &self.inner.collection_field;
        let items = record.document.collection(field);
        let start = range.start.min(items.len());
        let end = range.end.min(items.len()).max(start);
        let slice = items[start..end].to_vec();

        Ok(RangedChunk {
            range_echo: range,
            document: record.document.with_collection(field, slice),
            version: version_token(record.seq),
            hash_of_latest_state: content_hash(&record.document),
        })
    }

    async fn fetch_patches_since(
        &self,
        session_id: &SessionId,
        since: &Version,
    ) -> Result<PendingPatches> {
        self.inner.diff_fetches.fetch_add(1, Ordering::Relaxed);
        let sessions = self.inner.sessions.read().await;
        let record = sessions
            .get(session_id)
            .ok_or_else(|| unknown_session(session_id))?;
        let since_seq = parse_seq(since)?;

        let pending: Vec<&AcceptedPatch> =
            record.accepted.iter().filter(|a| a.seq > since_seq).collect();
        let patch = Patch(
            pending
                .iter()
                .flat_map(|a| a.patch.0.iter().cloned())
                .collect(),
        );
        let change_log = pending
            .iter()
            .flat_map(|a| a.entries.iter().cloned())
            .collect();

        Ok(PendingPatches {
            patch,
            hash_of_latest_state: content_hash(&record.document),
            latest_version: version_token(record.seq),
            change_log,
        })
    }
}

fn version_token(seq: u64) -> Version {
    Version::new(format!("v{seq}"))
}

fn parse_seq(version: &Version) -> Result<u64> {
    version
        .as_str()
        .strip_prefix('v')
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ClientError::Transport(format!("unknown version token {version:?}")))
}

fn unknown_session(session_id: &SessionId) -> ClientError {
    ClientError::SessionLookup {
        session_id: session_id.clone(),
        reason: "unknown session".into(),
    }
}

/// Derive display change-log entries from the operations of a patch.
fn change_entries(patch: &Patch, user_name: &str) -> Vec<ChangeLogEntry> {
    patch
        .0
        .iter()
        .filter_map(|op| {
            let op = serde_json::to_value(op).ok()?;
            Some(ChangeLogEntry {
                user_name: user_name.to_string(),
                operation: op.get("op")?.as_str()?.to_string(),
                path: op.get("path")?.as_str()?.to_string(),
            })
        })
        .collect()
}
