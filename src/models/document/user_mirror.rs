use serde_json::Value;
use std::sync::Arc;

use crate::error::DbResult;
use crate::models::{EntityModel, Record};
use crate::store::{DocPath, DocumentAdapter, StoreAdapter, StoreKey};

const ENTITY: &str = "users";

/// Public profile fields mirrored into the document store at `users/<id>`
/// for real-time clients. Written by sync, read by clients.
pub struct UserMirrorModel {
    adapter: Arc<DocumentAdapter>,
}

impl UserMirrorModel {
    pub fn new(adapter: Arc<DocumentAdapter>) -> Self {
        Self { adapter }
    }

    fn path(user_id: &str) -> DbResult<DocPath> {
        DocPath::root().child(ENTITY)?.segment(user_id)
    }

    pub async fn get(&self, user_id: &str) -> DbResult<Option<Value>> {
        let db = self.adapter.get_instance().await?;
        let value = db.once(&Self::path(user_id)?).await?;
        Ok((!value.is_null()).then_some(value))
    }
}

#[async_trait::async_trait]
impl EntityModel for UserMirrorModel {
    fn entity(&self) -> &str {
        ENTITY
    }

    fn store(&self) -> StoreKey {
        StoreKey::Firebase
    }

    async fn upsert_record(&self, key: &str, record: Record) -> DbResult<()> {
        let db = self.adapter.get_instance().await?;
        db.set(&Self::path(key)?, Value::Object(record)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_replaces_whole_record() {
        let mirror = UserMirrorModel::new(Arc::new(DocumentAdapter::in_memory()));
        let first = json!({ "id": "u1", "name": "Ada", "avatar": "a.png" });
        mirror.upsert_record("u1", first.as_object().unwrap().clone()).await.unwrap();

        let second = json!({ "id": "u1", "name": "Ada L." });
        mirror.upsert_record("u1", second.as_object().unwrap().clone()).await.unwrap();

        assert_eq!(mirror.get("u1").await.unwrap(), Some(second));
        assert_eq!(mirror.get("u2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_key_with_slash_rejected() {
        let mirror = UserMirrorModel::new(Arc::new(DocumentAdapter::in_memory()));
        let record = json!({ "name": "x" }).as_object().unwrap().clone();
        let err = mirror.upsert_record("u1/name", record).await.unwrap_err();
        assert!(matches!(err, crate::error::DbError::InvalidPath { .. }));
        assert_eq!(mirror.get("u1").await.unwrap(), None);
    }
}
