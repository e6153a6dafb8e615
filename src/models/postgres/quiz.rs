use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::{require, require_some, EntityModel};
use crate::store::{PostgresAdapter, StoreAdapter, StoreKey};

const ENTITY: &str = "quizzes";

/// A single quiz question attached to a lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct QuizQuestion {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub question_type: String,
    pub question: String,
    pub options: Option<Value>,
    pub correct_answers: Option<Value>,
    pub position: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewQuizQuestion {
    pub lesson_id: Option<Uuid>,
    pub question_type: Option<String>,
    pub question: Option<String>,
    pub options: Option<Value>,
    pub correct_answers: Option<Value>,
    pub position: Option<i32>,
}

pub struct QuizModel {
    adapter: Arc<PostgresAdapter>,
}

impl QuizModel {
    pub fn new(adapter: Arc<PostgresAdapter>) -> Self {
        Self { adapter }
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<QuizQuestion>> {
        let db = self.adapter.get_instance().await?;
        Ok(sqlx::query_as::<_, QuizQuestion>("SELECT * FROM quiz_questions WHERE id = $1")
            .bind(id)
            .fetch_optional(&db)
            .await?)
    }

    pub async fn find_by_lesson(&self, lesson_id: Uuid) -> DbResult<Vec<QuizQuestion>> {
        let db = self.adapter.get_instance().await?;
        Ok(sqlx::query_as::<_, QuizQuestion>(
            "SELECT * FROM quiz_questions WHERE lesson_id = $1
             ORDER BY position ASC NULLS LAST, created_at, id",
        )
        .bind(lesson_id)
        .fetch_all(&db)
        .await?)
    }

    pub async fn count_by_lesson(&self, lesson_id: Uuid) -> DbResult<i64> {
        let db = self.adapter.get_instance().await?;
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM quiz_questions WHERE lesson_id = $1")
            .bind(lesson_id)
            .fetch_one(&db)
            .await?)
    }

    pub async fn create(&self, input: NewQuizQuestion) -> DbResult<QuizQuestion> {
        let lesson_id = require_some(ENTITY, "lesson_id", input.lesson_id)?;
        let question_type = require(ENTITY, "question_type", &input.question_type)?;
        let question = require(ENTITY, "question", &input.question)?;

        let db = self.adapter.get_instance().await?;
        Ok(sqlx::query_as::<_, QuizQuestion>(
            "INSERT INTO quiz_questions (lesson_id, question_type, question, options, correct_answers, position)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(lesson_id)
        .bind(question_type)
        .bind(question)
        .bind(&input.options)
        .bind(&input.correct_answers)
        .bind(input.position)
        .fetch_one(&db)
        .await
        .map_err(|e| DbError::from_insert(ENTITY, "id", e))?)
    }
}

impl EntityModel for QuizModel {
    fn entity(&self) -> &str {
        ENTITY
    }

    fn store(&self) -> StoreKey {
        StoreKey::Postgres
    }
}
