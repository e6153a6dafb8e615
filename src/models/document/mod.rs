mod comment;
mod notification;
mod progress;
mod user_mirror;

use serde::Serialize;
use serde_json::Value;

pub use comment::CommentModel;
pub use notification::NotificationModel;
pub use progress::ProgressModel;
pub use user_mirror::UserMirrorModel;

/// A child of a keyed collection (`comments/<lesson>/<key>`, ...).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocEntry {
    pub key: String,
    pub value: Value,
}

/// True when nothing would be stored for `value`: null, and objects or
/// arrays holding only such values. The store drops these on write.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(fields) => fields.values().all(is_blank),
        Value::Array(items) => items.iter().all(is_blank),
        _ => false,
    }
}

/// Children of a collection node in key order. Push keys sort by creation
/// time, so this is insertion order for pushed entries.
pub fn entries(node: Value) -> Vec<DocEntry> {
    match node {
        Value::Object(children) => {
            let mut entries: Vec<DocEntry> = children
                .into_iter()
                .map(|(key, value)| DocEntry { key, value })
                .collect();
            entries.sort_by(|a, b| a.key.cmp(&b.key));
            entries
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entries_sorted_by_key() {
        let node = json!({ "-b": { "text": "2" }, "-a": { "text": "1" } });
        let keys: Vec<String> = entries(node).into_iter().map(|e| e.key).collect();
        assert_eq!(keys, ["-a", "-b"]);
    }

    #[test]
    fn test_blank_values() {
        assert!(is_blank(&Value::Null));
        assert!(is_blank(&json!({})));
        assert!(is_blank(&json!({ "a": null, "b": { "c": null } })));
        assert!(is_blank(&json!([])));
        assert!(!is_blank(&json!({ "a": null, "b": false })));
        assert!(!is_blank(&json!("")));
    }

    #[test]
    fn test_entries_of_null_or_scalar_is_empty() {
        assert!(entries(Value::Null).is_empty());
        assert!(entries(json!(3)).is_empty());
    }
}
