//! Session store boundary.
//!
//! The remote session store is authoritative: it applies patches, advances
//! versions, and declares the hash of every state it produces. The client
//! treats it as correct and only ever verifies its own local copy against
//! the store's declarations. Implementations may speak HTTP
//! ([`crate::http::HttpSessionStore`]) or stay in-process
//! ([`crate::memory::MemorySessionStore`]).

use async_trait::async_trait;

use docsync_core::{Document, Patch, SessionId, Version};

use crate::error::Result;
use crate::messages::{CreatedSession, FullFetch, PatchAccepted, PendingPatches, Range, RangedChunk};

/// One method per wire operation of the session protocol.
///
/// Implementations must be thread-safe (Send + Sync). The client issues
/// calls one at a time in program order; no internal fan-out is required.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// `POST /api/session` — create a record for `document` (the caller has
    /// already emptied the large collection field).
    async fn create_session(&self, document: &Document) -> Result<CreatedSession>;

    /// `PATCH /api/session/{id}` — submit a patch against the current
    /// authoritative state.
    async fn submit_patch(
        &self,
        session_id: &SessionId,
        patch: &Patch,
        user_name: &str,
    ) -> Result<PatchAccepted>;

    /// `GET /api/session/{id}` — fetch the whole document, or learn that
    /// the ranged path must be used.
    async fn fetch_full(&self, session_id: &SessionId) -> Result<FullFetch>;

    /// `GET /api/session/{id}?range=start-end` — fetch one bounded slice of
    /// the collection field.
    async fn fetch_range(&self, session_id: &SessionId, range: Range) -> Result<RangedChunk>;

    /// `GET /api/session/{id}/diffs?since=version` — fetch every patch
    /// accepted after `since`, with the declared hash of the latest state
    /// and the display change log.
    async fn fetch_patches_since(
        &self,
        session_id: &SessionId,
        since: &Version,
    ) -> Result<PendingPatches>;
}
