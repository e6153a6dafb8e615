use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::{require_some, EntityModel};
use crate::store::{PostgresAdapter, StoreAdapter, StoreKey};

const ENTITY: &str = "enrollments";
const STATUSES: [&str; 4] = ["pending", "active", "completed", "cancelled"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub status: String,
    pub progress_percent: i32,
    pub enrolled_at: DateTime<Utc>,
    pub completion_date: Option<DateTime<Utc>>,
    pub last_accessed: Option<DateTime<Utc>>,
    pub certificate_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewEnrollment {
    pub user_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub status: Option<String>,
    pub progress_percent: Option<i32>,
    pub certificate_url: Option<String>,
    pub notes: Option<String>,
}

pub struct EnrollmentModel {
    adapter: Arc<PostgresAdapter>,
}

impl EnrollmentModel {
    pub fn new(adapter: Arc<PostgresAdapter>) -> Self {
        Self { adapter }
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<Enrollment>> {
        let db = self.adapter.get_instance().await?;
        Ok(sqlx::query_as::<_, Enrollment>("SELECT * FROM enrollments WHERE id = $1")
            .bind(id)
            .fetch_optional(&db)
            .await?)
    }

    pub async fn find_by_user_and_course(&self, user_id: Uuid, course_id: Uuid) -> DbResult<Option<Enrollment>> {
        let db = self.adapter.get_instance().await?;
        Ok(sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&db)
        .await?)
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> DbResult<Vec<Enrollment>> {
        let db = self.adapter.get_instance().await?;
        Ok(sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE user_id = $1 ORDER BY enrolled_at, id",
        )
        .bind(user_id)
        .fetch_all(&db)
        .await?)
    }

    pub async fn find_by_course(&self, course_id: Uuid) -> DbResult<Vec<Enrollment>> {
        let db = self.adapter.get_instance().await?;
        Ok(sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE course_id = $1 ORDER BY enrolled_at, id",
        )
        .bind(course_id)
        .fetch_all(&db)
        .await?)
    }

    pub async fn count_by_course(&self, course_id: Uuid) -> DbResult<i64> {
        let db = self.adapter.get_instance().await?;
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(&db)
            .await?)
    }

    /// One enrollment per (user, course); a second attempt is a conflict.
    pub async fn create(&self, input: NewEnrollment) -> DbResult<Enrollment> {
        let user_id = require_some(ENTITY, "user_id", input.user_id)?;
        let course_id = require_some(ENTITY, "course_id", input.course_id)?;
        let status = input.status.as_deref().unwrap_or("pending");
        if !STATUSES.contains(&status) {
            return Err(DbError::validation(ENTITY, format!("unknown status '{status}'")));
        }
        let progress_percent = input.progress_percent.unwrap_or(0);
        if !(0..=100).contains(&progress_percent) {
            return Err(DbError::validation(ENTITY, "progress_percent must be within 0..=100"));
        }

        let db = self.adapter.get_instance().await?;
        let enrollment = sqlx::query_as::<_, Enrollment>(
            "INSERT INTO enrollments (user_id, course_id, status, progress_percent, certificate_url, notes)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(user_id)
        .bind(course_id)
        .bind(status)
        .bind(progress_percent)
        .bind(&input.certificate_url)
        .bind(&input.notes)
        .fetch_one(&db)
        .await
        .map_err(|e| DbError::from_insert(ENTITY, "user_id, course_id", e))?;

        tracing::info!(enrollment_id = %enrollment.id, user_id = %user_id, course_id = %course_id, "Enrollment created");
        Ok(enrollment)
    }
}

impl EntityModel for EnrollmentModel {
    fn entity(&self) -> &str {
        ENTITY
    }

    fn store(&self) -> StoreKey {
        StoreKey::Postgres
    }
}
