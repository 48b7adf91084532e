//! Human-readable change log formatting.
//!
//! Change log entries are supplied by the session store alongside pending
//! patches. They describe who changed what and are consumed only for
//! display; correctness never depends on them.

use serde::{Deserialize, Serialize};

/// One store-supplied description of an accepted edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogEntry {
    /// Label of the user whose patch was accepted.
    pub user_name: String,
    /// The elementary operation kind ("add", "remove", "replace", ...).
    pub operation: String,
    /// JSON pointer of the changed location.
    pub path: String,
}

/// Render entries as display lines, one per entry.
pub fn format_change_log(entries: &[ChangeLogEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| format!("{} {} {}", e.user_name, verb(&e.operation), e.path))
        .collect()
}

fn verb(operation: &str) -> &str {
    match operation {
        "add" => "added",
        "remove" => "removed",
        "replace" => "replaced",
        "move" => "moved",
        "copy" => "copied",
        "test" => "checked",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user: &str, op: &str, path: &str) -> ChangeLogEntry {
        ChangeLogEntry {
            user_name: user.to_string(),
            operation: op.to_string(),
            path: path.to_string(),
        }
    }

    #[test]
    fn formats_one_line_per_entry() {
        let lines = format_change_log(&[
            entry("alice", "replace", "/title"),
            entry("bob", "add", "/samples/3"),
        ]);
        assert_eq!(lines, vec!["alice replaced /title", "bob added /samples/3"]);
    }

    #[test]
    fn unknown_operations_pass_through() {
        let lines = format_change_log(&[entry("carol", "frobnicate", "/x")]);
        assert_eq!(lines, vec!["carol frobnicate /x"]);
    }

    #[test]
    fn wire_shape_is_camel_case() {
        let json = serde_json::to_value(entry("alice", "add", "/a")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"userName": "alice", "operation": "add", "path": "/a"})
        );
    }
}
