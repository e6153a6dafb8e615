use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::DbResult;
use crate::models::EntityModel;
use crate::store::{DocPath, DocumentAdapter, StoreAdapter, StoreKey, Subscription};

const ENTITY: &str = "progress";

/// Per-user, per-course learning progress at `progress/<user>/<course>`:
///
/// ```text
/// { "completedLessons": { "<lesson>": true, ... }, "lastAccessed": <epoch ms> }
/// ```
pub struct ProgressModel {
    adapter: Arc<DocumentAdapter>,
}

impl ProgressModel {
    pub fn new(adapter: Arc<DocumentAdapter>) -> Self {
        Self { adapter }
    }

    fn path(user_id: &str, course_id: &str) -> DbResult<DocPath> {
        DocPath::root().child(ENTITY)?.segment(user_id)?.segment(course_id)
    }

    /// The progress document, `None` if the user never touched the course.
    pub async fn get(&self, user_id: &str, course_id: &str) -> DbResult<Option<Value>> {
        let db = self.adapter.get_instance().await?;
        let value = db.once(&Self::path(user_id, course_id)?).await?;
        Ok((!value.is_null()).then_some(value))
    }

    /// Merge `fields` into the document; keys may be nested paths.
    pub async fn update(&self, user_id: &str, course_id: &str, fields: Map<String, Value>) -> DbResult<()> {
        let db = self.adapter.get_instance().await?;
        db.update(&Self::path(user_id, course_id)?, fields).await
    }

    /// Record a lesson as completed (or clear it) and bump `lastAccessed`.
    pub async fn mark_lesson(&self, user_id: &str, course_id: &str, lesson_id: &str, completed: bool) -> DbResult<()> {
        let lesson = DocPath::root().segment(lesson_id)?;
        let mut fields = Map::new();
        fields.insert(
            format!("completedLessons/{lesson}"),
            if completed { Value::Bool(true) } else { Value::Null },
        );
        fields.insert("lastAccessed".to_string(), Value::from(Utc::now().timestamp_millis()));

        self.update(user_id, course_id, fields).await?;
        tracing::debug!(user_id, course_id, lesson_id, completed, "Lesson progress recorded");
        Ok(())
    }

    /// Lessons marked complete for the course.
    pub async fn count_completed(&self, user_id: &str, course_id: &str) -> DbResult<usize> {
        let db = self.adapter.get_instance().await?;
        let path = Self::path(user_id, course_id)?.child("completedLessons")?;
        Ok(count_completed_in(&db.once(&path).await?))
    }

    pub async fn subscribe(&self, user_id: &str, course_id: &str) -> DbResult<Subscription> {
        let db = self.adapter.get_instance().await?;
        db.subscribe(&Self::path(user_id, course_id)?).await
    }
}

fn count_completed_in(completed: &Value) -> usize {
    match completed {
        Value::Object(lessons) => lessons.values().filter(|v| v.as_bool() == Some(true)).count(),
        _ => 0,
    }
}

impl EntityModel for ProgressModel {
    fn entity(&self) -> &str {
        ENTITY
    }

    fn store(&self) -> StoreKey {
        StoreKey::Firebase
    }
}
