// ============================================================================
// Application Services
// ============================================================================
//
// Callers of the two data-layer entry points: they resolve typed models
// through the router and fire sync triggers after primary writes.
//
// ============================================================================

mod course;
mod progress;
mod token;
mod user;

pub use course::{CourseDetails, CourseService, LessonDetails};
pub use progress::{ProgressService, ProgressUpdate};
pub use token::{SessionClaims, TokenIssuer};
pub use user::{LoginSession, UserService};
