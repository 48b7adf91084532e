//! Session client: create, join, pull, push, reconcile.
//!
//! The client holds no session state of its own. A bound session is an
//! explicit [`Session`] handle value; every successful operation returns a
//! new handle instead of mutating shared fields, so concurrent callers can
//! never observe a half-updated document/version pair. Whoever holds the
//! handle decides when to thread it into the next operation.
//!
//! Every mutating exchange funnels through one reconciliation routine: the
//! candidate state the client expects is kept only when the store-declared
//! hash confirms it; otherwise the local state is discarded and replaced
//! with a wholesale refetch. Divergence is detected, never merged.

use rand::distributions::Alphanumeric;
use rand::Rng;

use docsync_core::{
    content_hash, diff, format_change_log, ContentHash, Document, Patch, SessionId, Version,
};

use crate::chunk::{self, DOWNLOAD_RANGE_LEN, UPLOAD_CHUNK_LEN};
use crate::error::{ClientError, Result};
use crate::messages::{FullFetch, FullState};
use crate::store::SessionStore;

/// Client behavior knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Label attached to submitted patches for the change log.
    pub user_name: String,
    /// Name of the large collection-valued field.
    pub collection_field: String,
    /// Elements per incremental upload patch.
    pub upload_chunk_len: usize,
    /// Elements per ranged download request.
    pub download_range_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_name: anonymous_user_name(),
            collection_field: "samples".to_string(),
            upload_chunk_len: UPLOAD_CHUNK_LEN,
            download_range_len: DOWNLOAD_RANGE_LEN,
        }
    }
}

/// `anonymous_` plus a short random suffix, used when the caller does not
/// supply a user name.
pub fn anonymous_user_name() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(4)
        .map(char::from)
        .collect();
    format!("anonymous_{}", suffix.to_lowercase())
}

/// A bound session: the local document and the version under which it was
/// last verified against the store.
///
/// Handles are plain values; two clones diverge independently until one of
/// them reconciles with the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub session_id: SessionId,
    pub document: Document,
    pub version: Version,
}

/// A patch pulled from the store, with its formatted change log.
#[derive(Debug, Clone)]
pub struct PulledUpdate {
    /// The operations the store reported since our version.
    pub patch: Patch,
    /// Display lines describing who changed what.
    pub change_log: Vec<String>,
    /// False when applying the patch locally failed the hash check and the
    /// handle was rebuilt by a wholesale resynchronization. The patch is
    /// then display-only and must not be trusted.
    pub verified: bool,
}

/// Outcome of a push attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushResult {
    /// The diff was empty; no request was made.
    Unchanged,
    /// The store accepted the patch and the hashes agreed.
    Committed,
    /// The store's post-patch hash disagreed; the returned handle was
    /// resynchronized to the authoritative state.
    Diverged,
}

/// Result of reconciling a candidate state against the store's declaration.
enum Reconciled {
    /// The declared hash confirmed the candidate.
    Consistent(Session),
    /// The candidate was discarded and the handle refetched wholesale.
    Resynced(Session),
}

/// Synchronization client for one session store.
///
/// Operations execute one at a time in program order; the client never
/// fans out requests internally.
pub struct SessionClient<S: SessionStore> {
    store: S,
    config: SessionConfig,
}

impl<S: SessionStore> SessionClient<S> {
    /// Client with default configuration (anonymous user, `"samples"`
    /// field, standard chunk sizes).
    pub fn new(store: S) -> Self {
        Self::with_config(store, SessionConfig::default())
    }

    pub fn with_config(store: S, config: SessionConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Create a new session seeded with `initial`.
    ///
    /// The record is created with the collection field emptied to stay
    /// under the payload ceiling, then populated through the chunked upload
    /// path. A failed creation is a [`ClientError::SessionCreate`]; a
    /// failed increment surfaces as-is and leaves the session partially
    /// populated (the store keeps every increment it already accepted).
    pub async fn create_session(&self, initial: &Document) -> Result<Session> {
        let field = &self.config.collection_field;
        let emptied = initial.with_collection_emptied(field);
        let created =
            self.store
                .create_session(&emptied)
                .await
                .map_err(|e| ClientError::SessionCreate {
                    session_id: None,
                    reason: e.to_string(),
                })?;
        tracing::debug!(session = %created.session_id, "session created");

        let version = chunk::upload_collection(
            &self.store,
            &created.session_id,
            initial,
            field,
            self.config.upload_chunk_len,
            &self.config.user_name,
            created.version,
        )
        .await?;

        Ok(Session {
            session_id: created.session_id,
            document: initial.clone(),
            version,
        })
    }

    /// Bind to an existing session and fetch its current state.
    pub async fn join_session(&self, session_id: SessionId) -> Result<Session> {
        let state = self.get_latest_state(&session_id).await?;
        Ok(Session {
            session_id,
            document: state.document,
            version: state.version,
        })
    }

    /// Fetch the authoritative document and version.
    ///
    /// Attempts the direct fetch first; whenever that does not yield a
    /// complete document the ranged download path is used unconditionally.
    /// Only when both paths are exhausted does this fail, wrapped with the
    /// session id for diagnosis.
    pub async fn get_latest_state(&self, session_id: &SessionId) -> Result<FullState> {
        match self.store.fetch_full(session_id).await {
            Ok(FullFetch::Complete(state)) => return Ok(state),
            Ok(FullFetch::UseRanged) => {}
            Err(e) => {
                tracing::debug!(session = %session_id, error = %e, "full fetch failed; trying ranged fetch");
            }
        }

        chunk::download_ranged(
            &self.store,
            session_id,
            &self.config.collection_field,
            self.config.download_range_len,
        )
        .await
        .map_err(|e| ClientError::SessionLookup {
            session_id: session_id.clone(),
            reason: e.to_string(),
        })
    }

    /// Discard the handle's document/version and refetch wholesale.
    ///
    /// The heavyweight resynchronization used whenever local consistency
    /// cannot be trusted.
    pub async fn update_to_latest_state(&self, session: &Session) -> Result<Session> {
        let state = self.get_latest_state(&session.session_id).await?;
        Ok(Session {
            session_id: session.session_id.clone(),
            document: state.document,
            version: state.version,
        })
    }

    /// Pull and apply every patch accepted since the handle's version.
    ///
    /// Returns `None` when there is nothing new. When the locally patched
    /// document fails the hash check against the store's declaration, the
    /// handle is rebuilt by a wholesale resynchronization and the
    /// (untrusted) patch and change log are still returned for display.
    /// A patch that cannot be applied at all is a hard error.
    pub async fn apply_latest_patches(
        &self,
        session: &Session,
    ) -> Result<(Session, Option<PulledUpdate>)> {
        let pending = self
            .store
            .fetch_patches_since(&session.session_id, &session.version)
            .await?;

        if pending.patch.0.is_empty() || pending.latest_version == session.version {
            return Ok((session.clone(), None));
        }

        let change_log = format_change_log(&pending.change_log);
        let candidate = docsync_core::apply(&session.document, &pending.patch)?;

        let (next, verified) = match self
            .verify_or_resync(
                &session.session_id,
                candidate,
                pending.latest_version,
                &pending.hash_of_latest_state,
            )
            .await?
        {
            Reconciled::Consistent(next) => (next, true),
            Reconciled::Resynced(next) => (next, false),
        };

        Ok((
            next,
            Some(PulledUpdate {
                patch: pending.patch,
                change_log,
                verified,
            }),
        ))
    }

    /// Push the difference between the handle's document and `new_document`.
    ///
    /// An empty diff makes no network call. Otherwise the patch is
    /// submitted and the store's declared hash is compared against the hash
    /// of `new_document`: on agreement the handle commits to the new state;
    /// on disagreement the handle is resynchronized to the authoritative
    /// state and [`PushResult::Diverged`] tells the caller its edit may
    /// have lost.
    pub async fn send_patch_if_changed(
        &self,
        session: &Session,
        new_document: Document,
    ) -> Result<(Session, PushResult)> {
        let patch = diff(&session.document, &new_document);
        if patch.0.is_empty() {
            return Ok((session.clone(), PushResult::Unchanged));
        }

        let accepted = self
            .store
            .submit_patch(&session.session_id, &patch, &self.config.user_name)
            .await?;

        match self
            .verify_or_resync(
                &session.session_id,
                new_document,
                accepted.latest_version,
                &accepted.hash_of_latest_state,
            )
            .await?
        {
            Reconciled::Consistent(next) => Ok((next, PushResult::Committed)),
            Reconciled::Resynced(next) => Ok((next, PushResult::Diverged)),
        }
    }

    /// The one reconciliation routine guarding every mutating exchange.
    ///
    /// Builds the next handle from the candidate state when the declared
    /// hash confirms it. Otherwise the candidate is discarded and the
    /// handle is refetched wholesale; a failure of that refetch is a hard
    /// [`ClientError::SessionLookup`].
    async fn verify_or_resync(
        &self,
        session_id: &SessionId,
        candidate: Document,
        candidate_version: Version,
        declared: &ContentHash,
    ) -> Result<Reconciled> {
        let local = content_hash(&candidate);
        if local == *declared {
            return Ok(Reconciled::Consistent(Session {
                session_id: session_id.clone(),
                document: candidate,
                version: candidate_version,
            }));
        }

        tracing::warn!(
            session = %session_id,
            %local,
            %declared,
            "hash mismatch after exchange; resynchronizing from store"
        );
        let state = self.get_latest_state(session_id).await?;
        Ok(Reconciled::Resynced(Session {
            session_id: session_id.clone(),
            document: state.document,
            version: state.version,
        }))
    }
}
