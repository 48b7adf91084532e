//! Document, session, and version primitives.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An arbitrary nested JSON tree representing shared session state.
///
/// The client owns its local copy exclusively; the session store holds the
/// authoritative copy. A document may contain collection-valued fields
/// (e.g. `"samples"`) large enough to exceed the transport payload ceiling;
/// those move through the chunked transfer strategy rather than in one
/// request.
///
/// Equality is JSON value equality: two documents built with different
/// field insertion orders compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Value);

impl Document {
    /// Wrap a JSON value as a document.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Borrow the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwrap into the underlying JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Elements of a collection-valued field.
    ///
    /// Empty when the field is missing or not an array.
    pub fn collection(&self, field: &str) -> &[Value] {
        self.0
            .get(field)
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }

    /// Number of elements in a collection-valued field.
    pub fn collection_len(&self, field: &str) -> usize {
        self.collection(field).len()
    }

    /// Clone of this document with `field` replaced by `items`.
    ///
    /// Non-object documents are returned unchanged.
    pub fn with_collection(&self, field: &str, items: Vec<Value>) -> Document {
        let mut value = self.0.clone();
        if let Some(object) = value.as_object_mut() {
            object.insert(field.to_string(), Value::Array(items));
        }
        Document(value)
    }

    /// Clone of this document with the collection field emptied.
    ///
    /// Only array-valued fields are emptied; anything else is left as-is.
    pub fn with_collection_emptied(&self, field: &str) -> Document {
        if self.0.get(field).map_or(false, Value::is_array) {
            self.with_collection(field, Vec::new())
        } else {
            self.clone()
        }
    }

    /// Clone of this document with the collection field truncated to its
    /// first `len` elements.
    pub fn truncate_collection(&self, field: &str, len: usize) -> Document {
        let items = self.collection(field);
        if items.is_empty() {
            return self.clone();
        }
        let kept = items[..len.min(items.len())].to_vec();
        self.with_collection(field, kept)
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Opaque name of a document's server-side session record.
///
/// Issued once at session creation, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque token identifying a point in a session's history.
///
/// Issued by the store after every accepted mutation. The client compares
/// versions only for equality; ordering is the store's business.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
