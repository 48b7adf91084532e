//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{json, Value};

use docsync_core::Document;

/// A JSON scalar: null, bool, bounded integer, or short string.
pub fn json_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1_000_000i64..1_000_000).prop_map(|n| json!(n)),
        "[a-z0-9]{0,8}".prop_map(Value::String),
    ]
}

/// A bounded-depth JSON tree of scalars, arrays, and objects.
pub fn json_value() -> impl Strategy<Value = Value> {
    json_scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// A document envelope with a scalar-valued `samples` collection of up to
/// `max_len` elements.
pub fn document_with_samples(max_len: usize) -> impl Strategy<Value = Document> {
    (
        "[a-z]{1,8}",
        prop::collection::vec(json_scalar(), 0..=max_len),
    )
        .prop_map(|(title, samples)| Document::new(json!({"title": title, "samples": samples})))
}

/// An upload chunk length or download range length.
pub fn chunk_len() -> impl Strategy<Value = usize> {
    1usize..=64
}
