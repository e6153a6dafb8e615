use serde_json::Value;
use std::sync::Arc;

use super::{entries, is_blank, DocEntry};
use crate::error::{DbError, DbResult};
use crate::models::EntityModel;
use crate::store::{DocPath, DocumentAdapter, StoreAdapter, StoreKey};

const ENTITY: &str = "notifications";

pub struct NotificationModel {
    adapter: Arc<DocumentAdapter>,
}

impl NotificationModel {
    pub fn new(adapter: Arc<DocumentAdapter>) -> Self {
        Self { adapter }
    }

    fn inbox(user_id: &str) -> DbResult<DocPath> {
        DocPath::root().child(ENTITY)?.segment(user_id)
    }

    pub async fn create(&self, user_id: &str, notification: Value) -> DbResult<String> {
        if is_blank(&notification) {
            return Err(DbError::validation(ENTITY, "notification must not be empty"));
        }
        let db = self.adapter.get_instance().await?;
        db.push(&Self::inbox(user_id)?, notification).await
    }

    pub async fn find_by_user(&self, user_id: &str) -> DbResult<Vec<DocEntry>> {
        let db = self.adapter.get_instance().await?;
        Ok(entries(db.once(&Self::inbox(user_id)?).await?))
    }

    pub async fn count_by_user(&self, user_id: &str) -> DbResult<usize> {
        Ok(self.find_by_user(user_id).await?.len())
    }
}

impl EntityModel for NotificationModel {
    fn entity(&self) -> &str {
        ENTITY
    }

    fn store(&self) -> StoreKey {
        StoreKey::Firebase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_inbox_per_user() {
        let notifications = NotificationModel::new(Arc::new(DocumentAdapter::in_memory()));
        notifications.create("u1", json!({ "kind": "enrolled" })).await.unwrap();
        notifications.create("u1", json!({ "kind": "completed" })).await.unwrap();
        notifications.create("u2", json!({ "kind": "enrolled" })).await.unwrap();

        let inbox = notifications.find_by_user("u1").await.unwrap();
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox[0].value["kind"], "enrolled");
        assert_eq!(notifications.count_by_user("u1").await.unwrap(), 2);
        assert_eq!(notifications.count_by_user("u3").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_blank_notification_rejected() {
        let notifications = NotificationModel::new(Arc::new(DocumentAdapter::in_memory()));
        let err = notifications.create("u1", json!({ "kind": null })).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(notifications.count_by_user("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_user_id_with_slash_rejected() {
        let notifications = NotificationModel::new(Arc::new(DocumentAdapter::in_memory()));
        let err = notifications.find_by_user("u1/-key").await.unwrap_err();
        assert!(matches!(err, DbError::InvalidPath { .. }));
    }
}
