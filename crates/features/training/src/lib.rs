//! # Training
//!
//! The forklift operator course: a public catalog, enrollments whose modules unlock one
//! after another, module quizzes, a timed final exam and the hands-on evaluation a
//! trainer records afterwards. A passed exam hands over to the certificates slice.

mod catalog;
mod error;
mod exam;
pub mod grading;
mod handlers;
mod learning;
pub mod model;
mod practical;
pub mod progress;

pub use crate::error::{TrainingError, TrainingErrorExt};
pub use crate::grading::{Grade, PASS_THRESHOLD, grade};
pub use crate::practical::checklist_passed;
pub use crate::progress::{ModuleStatus, compute_course_progress, next_module, unlocked};

use feq_kernel::domain::config::ApiConfig;
use feq_kernel::domain::registry::InitializedSlice;
use feq_kernel::server::ApiState;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Training feature state.
#[feq_derive::feq_slice]
pub struct Training {
    /// Questions drawn per final exam
    pub question_count: usize,
    pub time_limit_minutes: i64,
}

/// Initialize the training feature from the `exam` settings.
pub fn init(config: &ApiConfig) -> InitializedSlice {
    tracing::info!(
        question_count = config.exam.question_count,
        time_limit_minutes = config.exam.time_limit_minutes,
        "Training slice initialized"
    );
    Training::new(TrainingInner {
        question_count: config.exam.question_count,
        time_limit_minutes: config.exam.time_limit_minutes,
    })
    .into_slice()
}

/// Catalog, enrollment, quiz, exam and practical routes.
pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::courses_handler))
        .routes(routes!(handlers::course_handler))
        .routes(routes!(handlers::enrollments_handler))
        .routes(routes!(handlers::enrollment_handler))
        .routes(routes!(handlers::module_handler))
        .routes(routes!(handlers::certificate_handler))
        .routes(routes!(handlers::quiz_handler))
        .routes(routes!(handlers::exam_start_handler))
        .routes(routes!(handlers::exam_submit_handler))
        .routes(routes!(handlers::practical_handler))
}
