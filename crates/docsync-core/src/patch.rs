//! Patch engine glue.
//!
//! RFC 6902 diff/apply is an external capability supplied by the
//! `json-patch` crate; this module is the only seam that touches it.
//! Patches are commutative-unsafe: applying them out of order or against
//! the wrong base snapshot is undefined, so the session client only ever
//! applies a patch to the exact snapshot it was computed against.

use thiserror::Error;

use crate::document::Document;

/// An ordered list of elementary edit operations
/// (add / remove / replace / move / copy / test).
pub use json_patch::Patch;

/// A patch could not be applied to the local document: a target path did
/// not exist or a `test` operation's expected value did not match.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("patch could not be applied: {0}")]
pub struct PatchApplyError(pub String);

/// Compute the patch transforming `before` into `after`.
///
/// Semantically equal documents yield the empty patch.
pub fn diff(before: &Document, after: &Document) -> Patch {
    json_patch::diff(before.as_value(), after.as_value())
}

/// Apply `patch` to `document`, returning the patched copy.
///
/// The input document is never mutated, even when application fails.
pub fn apply(document: &Document, patch: &Patch) -> Result<Document, PatchApplyError> {
    let mut value = document.as_value().clone();
    json_patch::patch(&mut value, patch).map_err(|e| PatchApplyError(e.to_string()))?;
    Ok(Document::new(value))
}
