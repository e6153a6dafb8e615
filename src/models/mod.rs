// ============================================================================
// Entity Models
// ============================================================================
//
// One model per entity, each bound to exactly one store:
// - postgres/  relational entities (users, courses, lessons, ...)
// - document/  real-time entities (progress, comments, notifications, ...)
//
// Typed operations live on the concrete model types. `EntityModel` is the
// narrow, object-safe surface the router and the sync engine work with.
//
// ============================================================================

pub mod document;
pub mod postgres;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::Any;
use std::sync::Arc;

use crate::error::{DbError, DbResult};
use crate::store::StoreKey;

pub use document::{CommentModel, NotificationModel, ProgressModel, UserMirrorModel};
pub use postgres::{
    CourseModel, EnrollmentModel, LessonModel, ProgressSnapshotModel, QuizModel, UserModel,
};

/// One row / document: field name -> value.
pub type Record = Map<String, Value>;

/// Upcast to `Any` so a resolved model can be turned back into its
/// concrete type.
pub trait AsAnyModel {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAnyModel for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[async_trait]
pub trait EntityModel: AsAnyModel + Send + Sync {
    fn entity(&self) -> &str;

    fn store(&self) -> StoreKey;

    /// Overwrite the record stored under `key` (last write wins).
    async fn upsert_record(&self, key: &str, record: Record) -> DbResult<()> {
        let _ = (key, record);
        Err(DbError::Unsupported {
            entity: self.entity().to_string(),
            operation: "upsert",
        })
    }

    /// Insert `record` as a new entry; returns what was stored.
    async fn append_record(&self, record: Record) -> DbResult<Record> {
        let _ = record;
        Err(DbError::Unsupported {
            entity: self.entity().to_string(),
            operation: "append",
        })
    }
}

pub fn to_record<T: Serialize>(value: &T) -> DbResult<Record> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(DbError::Internal(format!("expected an object, got {other}"))),
    }
}

/// Deserialize a partial record into a model input type.
pub fn from_record<T: DeserializeOwned>(entity: &str, record: Record) -> DbResult<T> {
    serde_json::from_value(Value::Object(record))
        .map_err(|e| DbError::validation(entity, e.to_string()))
}

/// Required, non-blank string field of a model input.
pub(crate) fn require<'a>(entity: &str, field: &str, value: &'a Option<String>) -> DbResult<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DbError::missing_field(entity, field)),
    }
}

pub(crate) fn require_some<T: Copy>(entity: &str, field: &str, value: Option<T>) -> DbResult<T> {
    value.ok_or_else(|| DbError::missing_field(entity, field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    struct NewThing {
        title: Option<String>,
        position: Option<i32>,
    }

    #[test]
    fn test_from_record_defaults_missing_fields() {
        let record = json!({ "title": "Intro" }).as_object().unwrap().clone();
        let input: NewThing = from_record("things", record).unwrap();
        assert_eq!(input.title.as_deref(), Some("Intro"));
        assert_eq!(input.position, None);
    }

    #[test]
    fn test_from_record_type_mismatch_is_validation() {
        let record = json!({ "position": "first" }).as_object().unwrap().clone();
        let err = from_record::<NewThing>("things", record).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_require_rejects_blank() {
        assert!(require("users", "email", &Some("  ".to_string())).is_err());
        assert!(require("users", "email", &None).is_err());
        assert_eq!(require("users", "email", &Some("a@b.c".to_string())).unwrap(), "a@b.c");
    }

    #[test]
    fn test_to_record_requires_object() {
        assert!(to_record(&json!({ "id": 1 })).is_ok());
        assert!(to_record(&json!([1, 2])).is_err());
    }
}
