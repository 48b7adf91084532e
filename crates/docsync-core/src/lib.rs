//! # docsync core
//!
//! Core primitives for the docsync session synchronization client:
//!
//! - **Documents**: arbitrary nested JSON trees shared between a client and
//!   an authoritative session store, with helpers for the large
//!   collection-valued fields that may exceed a transport payload ceiling
//! - **Canonical hashing**: an order-independent content digest used as a
//!   cheap equality oracle between local and server state
//! - **Patch glue**: the seam to the external RFC 6902 diff/apply capability
//! - **Change logs**: display-only descriptions of who changed what
//!
//! Everything in this crate is pure data and pure functions; network
//! exchanges live in `docsync-client`.

pub mod canonical;
pub mod changelog;
pub mod document;
pub mod patch;

pub use canonical::{canonical_bytes, content_hash, ContentHash};
pub use changelog::{format_change_log, ChangeLogEntry};
pub use document::{Document, SessionId, Version};
pub use patch::{apply, diff, Patch, PatchApplyError};
