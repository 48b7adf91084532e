//! Wire types exchanged with the session store.
//!
//! Field names are fixed by the store's JSON protocol (`sessionId`,
//! `hashOfLatestState`, `latestVersion`, `changeLog`, `rangeEcho`,
//! `userName`) and must match bit-for-bit to interoperate.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use docsync_core::{ChangeLogEntry, ContentHash, Document, Patch, SessionId, Version};

/// Body of `POST /api/session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// The initial document, with its large collection field emptied.
    pub document: Document,
}

/// Response to session creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    pub session_id: SessionId,
    pub version: Version,
}

/// Body of `PATCH /api/session/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPatchRequest {
    pub patch: Patch,
    pub user_name: String,
}

/// Response to an accepted patch submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchAccepted {
    /// Store-declared hash of the state the patch produced.
    pub hash_of_latest_state: ContentHash,
    pub latest_version: Version,
}

/// A complete document and the version it was fetched under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullState {
    pub document: Document,
    pub version: Version,
}

/// Outcome of a full-state fetch attempt.
///
/// The store decides whether a document is small enough to travel in one
/// response; the client branches on this variant instead of catching an
/// error thrown for control flow.
#[derive(Debug, Clone, PartialEq)]
pub enum FullFetch {
    /// The store returned the whole document.
    Complete(FullState),
    /// The document must be fetched through bounded ranges.
    UseRanged,
}

/// Half-open element range `[start, end)` within the collection field.
///
/// Rendered as `"start-end"` in query strings and in the store's
/// `rangeEcho` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for Range {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| format!("range must look like \"start-end\", got {s:?}"))?;
        let start = start.parse().map_err(|e| format!("bad range start: {e}"))?;
        let end = end.parse().map_err(|e| format!("bad range end: {e}"))?;
        Ok(Self { start, end })
    }
}

impl Serialize for Range {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Range {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// Response to `GET /api/session/{id}?range=start-end`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangedChunk {
    /// The range the store actually served.
    pub range_echo: Range,
    /// The document envelope with only the requested slice of the
    /// collection field populated. An empty slice signals
    /// end-of-collection.
    pub document: Document,
    pub version: Version,
    /// Hash of the complete state the ranges reassemble into.
    pub hash_of_latest_state: ContentHash,
}

/// Response to `GET /api/session/{id}/diffs?since=version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPatches {
    /// Every operation accepted since the requested version, in order.
    pub patch: Patch,
    pub hash_of_latest_state: ContentHash,
    pub latest_version: Version,
    pub change_log: Vec<ChangeLogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn range_renders_and_parses() {
        let range = Range::new(50, 100);
        assert_eq!(range.to_string(), "50-100");
        assert_eq!("50-100".parse::<Range>().unwrap(), range);
        assert_eq!(range.len(), 50);
        assert!("50".parse::<Range>().is_err());
        assert!("a-b".parse::<Range>().is_err());
    }

    #[test]
    fn submit_patch_request_uses_wire_names() {
        let request = SubmitPatchRequest {
            patch: serde_json::from_value(json!([{"op": "add", "path": "/a", "value": 1}]))
                .unwrap(),
            user_name: "anonymous_ab12".into(),
        };
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(
            wire,
            json!({
                "patch": [{"op": "add", "path": "/a", "value": 1}],
                "userName": "anonymous_ab12",
            })
        );
    }

    #[test]
    fn created_session_parses_wire_names() {
        let created: CreatedSession =
            serde_json::from_value(json!({"sessionId": "s1", "version": "v1"})).unwrap();
        assert_eq!(created.session_id, SessionId::new("s1"));
        assert_eq!(created.version, Version::new("v1"));
    }

    #[test]
    fn ranged_chunk_round_trips() {
        let chunk = RangedChunk {
            range_echo: Range::new(0, 50),
            document: Document::new(json!({"title": "x", "samples": [1]})),
            version: Version::new("v3"),
            hash_of_latest_state: docsync_core::content_hash(&Document::new(json!(1))),
        };
        let wire = serde_json::to_value(&chunk).unwrap();
        assert_eq!(wire["rangeEcho"], json!("0-50"));
        assert!(wire["hashOfLatestState"].is_string());
        let parsed: RangedChunk = serde_json::from_value(wire).unwrap();
        assert_eq!(parsed.range_echo, chunk.range_echo);
        assert_eq!(parsed.version, chunk.version);
    }
}
