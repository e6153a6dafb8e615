//! Needs a live PostgreSQL: `DATABASE_URL=postgres://... cargo test -- --ignored`

use serde_json::json;
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use lms_data::migrate::run_migrations;
use lms_data::models::postgres::{NewCourse, NewEnrollment, NewLesson, NewQuizQuestion, NewUser};
use lms_data::models::{
    CourseModel, EnrollmentModel, LessonModel, ProgressSnapshotModel, QuizModel, UserModel,
};
use lms_data::services::{CourseService, TokenIssuer, UserService};
use lms_data::store::{DocumentAdapter, PostgresAdapter, Stores};
use lms_data::{AppConfig, Database, EntityModel};

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for --ignored tests");
    let pool = PgPool::connect(&url).await.unwrap();
    run_migrations(&pool, &Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
        .await
        .unwrap();
    pool
}

fn database(pool: PgPool) -> Database {
    let stores = Stores::new(
        Arc::new(PostgresAdapter::from_pool(pool)),
        Arc::new(DocumentAdapter::in_memory()),
    );
    Database::with_stores(&AppConfig::default(), stores).unwrap()
}

fn database_with_secret(pool: PgPool, secret: &str) -> Database {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = Some(secret.to_string());
    let stores = Stores::new(
        Arc::new(PostgresAdapter::from_pool(pool)),
        Arc::new(DocumentAdapter::in_memory()),
    );
    Database::with_stores(&config, stores).unwrap()
}

fn unique_email() -> String {
    format!("{}@example.com", Uuid::new_v4())
}

#[tokio::test]
#[ignore]
async fn test_user_create_generates_id_and_rejects_duplicates() {
    let adapter = Arc::new(PostgresAdapter::from_pool(pool().await));
    let users = UserModel::new(adapter);
    let email = unique_email();

    let user = users
        .create(NewUser {
            email: Some(email.clone()),
            password: Some("correct horse".to_string()),
            name: Some("Ada".to_string()),
            ..NewUser::default()
        })
        .await
        .unwrap();
    assert_eq!(user.role, "student");
    assert_eq!(users.find_by_id(user.id).await.unwrap(), Some(user.clone()));

    let err = users
        .create(NewUser {
            email: Some(email.clone()),
            password: Some("other".to_string()),
            ..NewUser::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    assert!(users.verify_password(&email, "correct horse").await.unwrap().is_some());
    assert!(users.verify_password(&email, "wrong").await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_counts_match_listings() {
    let adapter = Arc::new(PostgresAdapter::from_pool(pool().await));
    let courses = CourseModel::new(adapter.clone());
    let lessons = LessonModel::new(adapter.clone());
    let quizzes = QuizModel::new(adapter);

    let course = courses
        .create(NewCourse {
            title: Some("Rust".to_string()),
            ..NewCourse::default()
        })
        .await
        .unwrap();
    assert_eq!(lessons.count_by_course(course.id).await.unwrap(), 0);
    assert!(lessons.find_by_course(course.id).await.unwrap().is_empty());

    for (position, title) in [(2, "Traits"), (1, "Ownership")] {
        lessons
            .create(NewLesson {
                course_id: Some(course.id),
                title: Some(title.to_string()),
                position: Some(position),
                ..NewLesson::default()
            })
            .await
            .unwrap();
    }

    let listed = lessons.find_by_course(course.id).await.unwrap();
    assert_eq!(listed.len() as i64, lessons.count_by_course(course.id).await.unwrap());
    assert_eq!(listed[0].title, "Ownership");

    quizzes
        .create(NewQuizQuestion {
            lesson_id: Some(listed[0].id),
            question_type: Some("single_choice".to_string()),
            question: Some("Who owns a moved value?".to_string()),
            options: Some(json!(["caller", "callee"])),
            ..NewQuizQuestion::default()
        })
        .await
        .unwrap();
    assert_eq!(quizzes.count_by_lesson(listed[0].id).await.unwrap(), 1);
    assert_eq!(quizzes.find_by_lesson(listed[1].id).await.unwrap().len(), 0);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_enrollment_is_conflict() {
    let pool = pool().await;
    let db = database(pool.clone());
    let adapter = Arc::new(PostgresAdapter::from_pool(pool));
    let enrollments = EnrollmentModel::new(adapter.clone());

    let user = UserService::new(&db)
        .await
        .unwrap()
        .register(NewUser {
            email: Some(unique_email()),
            password: Some("pw".to_string()),
            ..NewUser::default()
        })
        .await
        .unwrap();
    let course = CourseModel::new(adapter)
        .create(NewCourse {
            title: Some("Databases".to_string()),
            ..NewCourse::default()
        })
        .await
        .unwrap();

    let input = NewEnrollment {
        user_id: Some(user.id),
        course_id: Some(course.id),
        ..NewEnrollment::default()
    };
    let enrollment = enrollments.create(input.clone()).await.unwrap();
    assert_eq!(enrollment.status, "pending");
    assert!(enrollments.create(input).await.unwrap_err().is_conflict());
    assert_eq!(enrollments.count_by_course(course.id).await.unwrap(), 1);
}

#[tokio::test]
#[ignore]
async fn test_progress_snapshot_append_record() {
    let snapshots = ProgressSnapshotModel::new(Arc::new(PostgresAdapter::from_pool(pool().await)));
    let user_id = Uuid::new_v4().to_string();

    let stored = snapshots
        .append_record(
            json!({ "userId": user_id, "courseId": "c1", "lessonId": "l1" })
                .as_object()
                .unwrap()
                .clone(),
        )
        .await
        .unwrap();
    assert!(stored.get("id").is_some());
    assert_eq!(snapshots.count_by_user_and_course(&user_id, "c1").await.unwrap(), 1);
}

#[tokio::test]
#[ignore]
async fn test_course_with_details() {
    let pool = pool().await;
    let db = database(pool.clone());
    let adapter = Arc::new(PostgresAdapter::from_pool(pool));

    let course = CourseModel::new(adapter.clone())
        .create(NewCourse {
            title: Some("Async".to_string()),
            ..NewCourse::default()
        })
        .await
        .unwrap();
    LessonModel::new(adapter)
        .create(NewLesson {
            course_id: Some(course.id),
            title: Some("Futures".to_string()),
            ..NewLesson::default()
        })
        .await
        .unwrap();

    let service = CourseService::new(&db).await.unwrap();
    let details = service.course_with_details(course.id).await.unwrap().unwrap();
    assert_eq!(details.lessons.len(), 1);
    assert!(details.lessons[0].quizzes.is_empty());
    assert!(service.course_with_details(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_login_issues_session_token() {
    let db = database_with_secret(pool().await, "s3cret");
    let service = UserService::new(&db).await.unwrap();
    let email = unique_email();
    let user = service
        .register(NewUser {
            email: Some(email.clone()),
            password: Some("correct horse".to_string()),
            ..NewUser::default()
        })
        .await
        .unwrap();

    assert!(service.login(&email, "wrong").await.unwrap().is_none());

    let session = service.login(&email, "correct horse").await.unwrap().unwrap();
    assert_eq!(session.user, user);
    let claims = TokenIssuer::new("s3cret", 3600).unwrap().verify(&session.token).unwrap();
    assert_eq!(claims.id, user.id);
    assert_eq!(claims.role, user.role);
    assert_eq!(claims.exp - claims.iat, 3600);
}

#[tokio::test]
#[ignore]
async fn test_login_without_secret_is_config_error() {
    let db = database(pool().await);
    let service = UserService::new(&db).await.unwrap();
    let err = service.login(&unique_email(), "x").await.unwrap_err();
    assert!(matches!(err, lms_data::DbError::Config(_)));
}
