use serde_json::Value;
use std::sync::Arc;

use super::{entries, is_blank, DocEntry};
use crate::error::{DbError, DbResult};
use crate::models::EntityModel;
use crate::store::{DocPath, DocumentAdapter, StoreAdapter, StoreKey, Subscription};

const ENTITY: &str = "comments";

/// Lesson discussion threads at `comments/<lesson>/<push key>`.
pub struct CommentModel {
    adapter: Arc<DocumentAdapter>,
}

impl CommentModel {
    pub fn new(adapter: Arc<DocumentAdapter>) -> Self {
        Self { adapter }
    }

    fn thread(lesson_id: &str) -> DbResult<DocPath> {
        DocPath::root().child(ENTITY)?.segment(lesson_id)
    }

    /// Append a comment; returns its generated key.
    pub async fn add(&self, lesson_id: &str, comment: Value) -> DbResult<String> {
        if is_blank(&comment) {
            return Err(DbError::validation(ENTITY, "comment must not be empty"));
        }
        let db = self.adapter.get_instance().await?;
        let key = db.push(&Self::thread(lesson_id)?, comment).await?;
        tracing::debug!(lesson_id, key = %key, "Comment added");
        Ok(key)
    }

    pub async fn find_by_lesson(&self, lesson_id: &str) -> DbResult<Vec<DocEntry>> {
        let db = self.adapter.get_instance().await?;
        Ok(entries(db.once(&Self::thread(lesson_id)?).await?))
    }

    pub async fn count_by_lesson(&self, lesson_id: &str) -> DbResult<usize> {
        Ok(self.find_by_lesson(lesson_id).await?.len())
    }

    /// Live view of a lesson's thread. Each snapshot is the whole thread
    /// (null while empty); cancel with `unsubscribe()`.
    pub async fn on_snapshot(&self, lesson_id: &str) -> DbResult<Subscription> {
        let db = self.adapter.get_instance().await?;
        db.subscribe(&Self::thread(lesson_id)?).await
    }
}

impl EntityModel for CommentModel {
    fn entity(&self) -> &str {
        ENTITY
    }

    fn store(&self) -> StoreKey {
        StoreKey::Firebase
    }
}
