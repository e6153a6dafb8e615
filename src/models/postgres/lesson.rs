use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::{require, require_some, EntityModel};
use crate::store::{PostgresAdapter, StoreAdapter, StoreKey};

const ENTITY: &str = "lessons";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Lesson {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub position: Option<i32>,
    pub unlock_rule: Option<Value>,
    pub is_optional: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewLesson {
    pub course_id: Option<Uuid>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub position: Option<i32>,
    pub unlock_rule: Option<Value>,
    pub is_optional: bool,
}

pub struct LessonModel {
    adapter: Arc<PostgresAdapter>,
}

impl LessonModel {
    pub fn new(adapter: Arc<PostgresAdapter>) -> Self {
        Self { adapter }
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<Lesson>> {
        let db = self.adapter.get_instance().await?;
        Ok(sqlx::query_as::<_, Lesson>("SELECT * FROM lessons WHERE id = $1")
            .bind(id)
            .fetch_optional(&db)
            .await?)
    }

    /// Lessons of a course in display order; unpositioned lessons last.
    pub async fn find_by_course(&self, course_id: Uuid) -> DbResult<Vec<Lesson>> {
        let db = self.adapter.get_instance().await?;
        Ok(sqlx::query_as::<_, Lesson>(
            "SELECT * FROM lessons WHERE course_id = $1
             ORDER BY position ASC NULLS LAST, created_at, id",
        )
        .bind(course_id)
        .fetch_all(&db)
        .await?)
    }

    /// Same predicate as `find_by_course`.
    pub async fn count_by_course(&self, course_id: Uuid) -> DbResult<i64> {
        let db = self.adapter.get_instance().await?;
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM lessons WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(&db)
            .await?)
    }

    pub async fn create(&self, input: NewLesson) -> DbResult<Lesson> {
        let course_id = require_some(ENTITY, "course_id", input.course_id)?;
        let title = require(ENTITY, "title", &input.title)?;

        let db = self.adapter.get_instance().await?;
        let lesson = sqlx::query_as::<_, Lesson>(
            "INSERT INTO lessons (course_id, title, content, position, unlock_rule, is_optional)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(course_id)
        .bind(title)
        .bind(&input.content)
        .bind(input.position)
        .bind(&input.unlock_rule)
        .bind(input.is_optional)
        .fetch_one(&db)
        .await
        .map_err(|e| DbError::from_insert(ENTITY, "id", e))?;

        tracing::debug!(lesson_id = %lesson.id, course_id = %course_id, "Lesson created");
        Ok(lesson)
    }
}

impl EntityModel for LessonModel {
    fn entity(&self) -> &str {
        ENTITY
    }

    fn store(&self) -> StoreKey {
        StoreKey::Postgres
    }
}
