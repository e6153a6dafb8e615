use futures_util::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::Database;
use crate::error::DbResult;
use crate::models::postgres::{Course, Lesson, QuizQuestion};
use crate::models::{CourseModel, LessonModel, QuizModel};

#[derive(Debug, Clone, Serialize)]
pub struct LessonDetails {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub quizzes: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseDetails {
    #[serde(flatten)]
    pub course: Course,
    pub lessons: Vec<LessonDetails>,
}

pub struct CourseService {
    courses: Arc<CourseModel>,
    lessons: Arc<LessonModel>,
    quizzes: Arc<QuizModel>,
}

impl CourseService {
    pub async fn new(db: &Database) -> DbResult<Self> {
        let router = db.router();
        Ok(Self {
            courses: router.resolve_as::<CourseModel>("courses").await?,
            lessons: router.resolve_as::<LessonModel>("lessons").await?,
            quizzes: router.resolve_as::<QuizModel>("quizzes").await?,
        })
    }

    /// Course with its lessons in order, each with its quiz questions.
    pub async fn course_with_details(&self, course_id: Uuid) -> DbResult<Option<CourseDetails>> {
        let Some(course) = self.courses.find_by_id(course_id).await? else {
            return Ok(None);
        };

        let lessons = self.lessons.find_by_course(course_id).await?;
        let lessons = try_join_all(lessons.into_iter().map(|lesson| async move {
            let quizzes = self.quizzes.find_by_lesson(lesson.id).await?;
            Ok::<_, crate::error::DbError>(LessonDetails { lesson, quizzes })
        }))
        .await?;

        Ok(Some(CourseDetails { course, lessons }))
    }
}
