use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::{from_record, require, to_record, EntityModel, Record};
use crate::store::{PostgresAdapter, StoreAdapter, StoreKey};

const ENTITY: &str = "progress_snapshots";

/// Relational copy of a lesson completion, appended once per completion event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ProgressSnapshot {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub lesson_id: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

/// Accepts both snake_case and the camelCase keys the document store uses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewProgressSnapshot {
    pub id: Option<String>,
    #[serde(alias = "userId")]
    pub user_id: Option<String>,
    #[serde(alias = "courseId")]
    pub course_id: Option<String>,
    #[serde(alias = "lessonId")]
    pub lesson_id: Option<String>,
    #[serde(alias = "completedAt")]
    pub completed_at: Option<DateTime<Utc>>,
}

pub struct ProgressSnapshotModel {
    adapter: Arc<PostgresAdapter>,
}

impl ProgressSnapshotModel {
    pub fn new(adapter: Arc<PostgresAdapter>) -> Self {
        Self { adapter }
    }

    /// Insert a snapshot. `payload` keeps the full record as received.
    pub async fn append(&self, input: NewProgressSnapshot, payload: Value) -> DbResult<ProgressSnapshot> {
        let user_id = require(ENTITY, "user_id", &input.user_id)?;
        let course_id = require(ENTITY, "course_id", &input.course_id)?;
        let id = input
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::now_v7().to_string());

        let db = self.adapter.get_instance().await?;
        let snapshot = sqlx::query_as::<_, ProgressSnapshot>(
            "INSERT INTO progress_snapshots (id, user_id, course_id, lesson_id, completed_at, payload)
             VALUES ($1, $2, $3, $4, COALESCE($5, NOW()), $6)
             RETURNING *",
        )
        .bind(&id)
        .bind(user_id)
        .bind(course_id)
        .bind(&input.lesson_id)
        .bind(input.completed_at)
        .bind(&payload)
        .fetch_one(&db)
        .await
        .map_err(|e| DbError::from_insert(ENTITY, "id", e))?;

        tracing::debug!(snapshot_id = %snapshot.id, user_id = %user_id, course_id = %course_id, "Progress snapshot appended");
        Ok(snapshot)
    }

    pub async fn find_by_user_and_course(&self, user_id: &str, course_id: &str) -> DbResult<Vec<ProgressSnapshot>> {
        let db = self.adapter.get_instance().await?;
        Ok(sqlx::query_as::<_, ProgressSnapshot>(
            "SELECT * FROM progress_snapshots WHERE user_id = $1 AND course_id = $2
             ORDER BY created_at, id",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(&db)
        .await?)
    }

    pub async fn count_by_user_and_course(&self, user_id: &str, course_id: &str) -> DbResult<i64> {
        let db = self.adapter.get_instance().await?;
        Ok(sqlx::query_scalar(
            "SELECT COUNT(*) FROM progress_snapshots WHERE user_id = $1 AND course_id = $2",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&db)
        .await?)
    }
}

#[async_trait::async_trait]
impl EntityModel for ProgressSnapshotModel {
    fn entity(&self) -> &str {
        ENTITY
    }

    fn store(&self) -> StoreKey {
        StoreKey::Postgres
    }

    async fn append_record(&self, record: Record) -> DbResult<Record> {
        let payload = Value::Object(record.clone());
        let input: NewProgressSnapshot = from_record(ENTITY, record)?;
        let snapshot = self.append(input, payload).await?;
        to_record(&snapshot)
    }
}
