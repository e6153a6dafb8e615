mod course;
mod enrollment;
mod lesson;
mod progress_snapshot;
mod quiz;
mod user;

pub use course::{Course, CourseModel, NewCourse};
pub use enrollment::{Enrollment, EnrollmentModel, NewEnrollment};
pub use lesson::{Lesson, LessonModel, NewLesson};
pub use progress_snapshot::{NewProgressSnapshot, ProgressSnapshot, ProgressSnapshotModel};
pub use quiz::{NewQuizQuestion, QuizModel, QuizQuestion};
pub use user::{NewUser, User, UserModel};
