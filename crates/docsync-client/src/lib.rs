//! # docsync client
//!
//! A client-side protocol for keeping a locally held JSON document
//! synchronized with a remote authoritative copy, under a transport that
//! cannot accept large payloads in one request.
//!
//! ## Overview
//!
//! Multiple parties edit the same document through a shared session store.
//! The client can:
//!
//! - publish a large initial document without exceeding the payload ceiling
//!   (chunked incremental upload),
//! - pull incremental changes made by others (patch pull),
//! - push its own changes (patch push),
//! - detect divergence with a cheap canonical hash and recover by
//!   resynchronizing wholesale.
//!
//! Conflicting concurrent edits are never merged: whoever's patch lands
//! first wins, and the losing side discards its local state and refetches.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docsync_client::{HttpSessionStore, SessionClient};
//! use docsync_core::Document;
//! use serde_json::json;
//!
//! async fn example() {
//!     let store = HttpSessionStore::new("http://localhost:6003".parse().unwrap());
//!     let client = SessionClient::new(store);
//!
//!     let initial = Document::new(json!({"title": "x", "samples": [1, 2, 3]}));
//!     let session = client.create_session(&initial).await.unwrap();
//!
//!     // Pull changes made by others.
//!     let (session, update) = client.apply_latest_patches(&session).await.unwrap();
//!     if let Some(update) = update {
//!         for line in &update.change_log {
//!             println!("{line}");
//!         }
//!     }
//!
//!     // Push a local edit.
//!     let edited = Document::new(json!({"title": "y", "samples": [1, 2, 3]}));
//!     let (_session, _result) = client.send_patch_if_changed(&session, edited).await.unwrap();
//! }
//! ```
//!
//! ## Exchange flow
//!
//! ```text
//! Client                                   Session store
//!   |-- POST /api/session (field emptied) --->|   create
//!   |-- PATCH /api/session/{id} x N --------->|   chunked upload
//!   |-- GET  /api/session/{id}/diffs?since=v->|   pull
//!   |-- PATCH /api/session/{id} ------------->|   push
//!   |-- GET  /api/session/{id}?range=i-j ---->|   ranged refetch
//! ```
//!
//! Every mutating exchange is guarded by comparing the store-declared hash
//! of the resulting state against the canonical hash of the state the
//! client intended to reach; a mismatch triggers a wholesale
//! resynchronization rather than an error.

pub mod chunk;
pub mod error;
pub mod http;
pub mod memory;
pub mod messages;
pub mod session;
pub mod store;

pub use chunk::{DOWNLOAD_RANGE_LEN, UPLOAD_CHUNK_LEN};
pub use error::{ClientError, Result};
pub use http::HttpSessionStore;
pub use memory::MemorySessionStore;
pub use messages::{
    CreateSessionRequest, CreatedSession, FullFetch, FullState, PatchAccepted, PendingPatches,
    Range, RangedChunk, SubmitPatchRequest,
};
pub use session::{
    anonymous_user_name, PulledUpdate, PushResult, Session, SessionClient, SessionConfig,
};
pub use store::SessionStore;
