use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::Database;
use crate::error::DbResult;
use crate::models::{LessonModel, ProgressModel};
use crate::sync::SyncEngine;

/// State of a course after a progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub completed_lessons: usize,
    pub total_lessons: usize,
    pub course_completed: bool,
}

pub struct ProgressService {
    progress: Arc<ProgressModel>,
    lessons: Arc<LessonModel>,
    sync: Arc<SyncEngine>,
}

impl ProgressService {
    pub async fn new(db: &Database) -> DbResult<Self> {
        Ok(Self {
            progress: db.router().resolve_as::<ProgressModel>("progress").await?,
            lessons: db.router().resolve_as::<LessonModel>("lessons").await?,
            sync: db.sync().clone(),
        })
    }

    pub async fn get_progress(&self, user_id: Uuid, course_id: Uuid) -> DbResult<Option<Value>> {
        self.progress.get(&user_id.to_string(), &course_id.to_string()).await
    }

    /// Record a lesson as (un)completed. A completion is also snapshotted to
    /// the relational store through the onComplete sync rules.
    pub async fn update_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        lesson_id: Uuid,
        completed: bool,
    ) -> DbResult<ProgressUpdate> {
        let (user, course) = (user_id.to_string(), course_id.to_string());
        self.progress
            .mark_lesson(&user, &course, &lesson_id.to_string(), completed)
            .await?;

        if completed {
            let fact = json!({
                "user_id": user,
                "course_id": course,
                "lesson_id": lesson_id,
                "completed_at": Utc::now(),
            });
            if let Value::Object(record) = fact {
                self.sync.on_complete("progress", &record).await;
            }
        }

        let total_lessons = self.lessons.count_by_course(course_id).await?;
        let completed_lessons = self.progress.count_completed(&user, &course).await?;
        let total_lessons = usize::try_from(total_lessons).unwrap_or_default();
        let course_completed = total_lessons > 0 && completed_lessons == total_lessons;

        if course_completed {
            tracing::info!(user_id = %user_id, course_id = %course_id, "🎓 Course completed");
        }

        Ok(ProgressUpdate {
            completed_lessons,
            total_lessons,
            course_completed,
        })
    }
}
