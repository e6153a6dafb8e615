use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::{require, EntityModel};
use crate::store::{PostgresAdapter, StoreAdapter, StoreKey};

const ENTITY: &str = "courses";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub instructor_ids: Vec<Uuid>,
    pub prerequisites: Vec<Uuid>,
    pub enrollment_limit: Option<i32>,
    pub completion_certificate: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewCourse {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tenant_id: Option<Uuid>,
    pub instructor_ids: Vec<Uuid>,
    pub prerequisites: Vec<Uuid>,
    pub enrollment_limit: Option<i32>,
    pub completion_certificate: bool,
}

pub struct CourseModel {
    adapter: Arc<PostgresAdapter>,
}

impl CourseModel {
    pub fn new(adapter: Arc<PostgresAdapter>) -> Self {
        Self { adapter }
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<Course>> {
        let db = self.adapter.get_instance().await?;
        Ok(sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(&db)
            .await?)
    }

    pub async fn find_all(&self) -> DbResult<Vec<Course>> {
        let db = self.adapter.get_instance().await?;
        Ok(sqlx::query_as::<_, Course>("SELECT * FROM courses ORDER BY created_at, id")
            .fetch_all(&db)
            .await?)
    }

    pub async fn count_all(&self) -> DbResult<i64> {
        let db = self.adapter.get_instance().await?;
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM courses").fetch_one(&db).await?)
    }

    pub async fn create(&self, input: NewCourse) -> DbResult<Course> {
        let title = require(ENTITY, "title", &input.title)?;
        if input.enrollment_limit.is_some_and(|limit| limit <= 0) {
            return Err(DbError::validation(ENTITY, "enrollment_limit must be positive"));
        }

        let db = self.adapter.get_instance().await?;
        let course = sqlx::query_as::<_, Course>(
            "INSERT INTO courses (title, description, tenant_id, instructor_ids, prerequisites,
                                  enrollment_limit, completion_certificate)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(title)
        .bind(&input.description)
        .bind(input.tenant_id)
        .bind(&input.instructor_ids)
        .bind(&input.prerequisites)
        .bind(input.enrollment_limit)
        .bind(input.completion_certificate)
        .fetch_one(&db)
        .await
        .map_err(|e| DbError::from_insert(ENTITY, "title", e))?;

        tracing::info!(course_id = %course.id, "Course created");
        Ok(course)
    }
}

impl EntityModel for CourseModel {
    fn entity(&self) -> &str {
        ENTITY
    }

    fn store(&self) -> StoreKey {
        StoreKey::Postgres
    }
}
