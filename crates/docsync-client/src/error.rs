//! Error types for the session client.
//!
//! Hard errors (transport failure, patch-apply failure, session-creation
//! failure, exhausted lookups) propagate to the caller. Soft consistency
//! mismatches are not errors at all: they are recovered internally through
//! resynchronization and only surface as `tracing` warnings.

use thiserror::Error;

use docsync_core::{PatchApplyError, SessionId};

/// Errors that can occur during session client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying request failed outright.
    #[error("transport error: {0}")]
    Transport(String),

    /// The store answered with a payload the client could not interpret.
    #[error("invalid response from session store: {0}")]
    InvalidResponse(String),

    /// A received patch could not be applied to the local document.
    #[error(transparent)]
    PatchApply(#[from] PatchApplyError),

    /// The initial session-creation call failed.
    #[error("session creation failed ({}): {reason}", session_id.as_ref().map_or("no session id", SessionId::as_str))]
    SessionCreate {
        session_id: Option<SessionId>,
        reason: String,
    },

    /// All fetch strategies (full and ranged) were exhausted.
    #[error("error getting session \"{session_id}\": {reason}")]
    SessionLookup {
        session_id: SessionId,
        reason: String,
    },
}

/// Result type for session client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
