use crate::grading::{Grade, Question};
use crate::progress::ModuleStatus;
use chrono::{DateTime, Utc};
use feq_derive::api_model;
use serde::Deserialize;
use uuid::Uuid;

// --- Catalog ---

#[api_model(deny_unknown_fields = false)]
pub struct CourseSummary {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
}

#[api_model(deny_unknown_fields = false)]
pub struct ModuleOutline {
    pub id: Uuid,
    pub order_index: i32,
    pub title: String,
}

#[api_model(deny_unknown_fields = false)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: CourseSummary,
    pub modules: Vec<ModuleOutline>,
}

// --- Stored rows ---

/// One question of a module quiz, stored in `modules.quiz`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QuizQuestion {
    pub(crate) question: String,
    #[serde(default)]
    pub(crate) options: Vec<String>,
    pub(crate) correct_option: u32,
}

impl Question for QuizQuestion {
    fn correct_option(&self) -> u32 {
        self.correct_option
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ModuleRow {
    pub(crate) id: Uuid,
    pub(crate) order_index: i32,
    pub(crate) title: String,
    pub(crate) content: Option<String>,
    pub(crate) video_url: Option<String>,
    #[serde(default)]
    pub(crate) quiz: Option<Vec<QuizQuestion>>,
}

pub(crate) const MODULE_COLUMNS: &str = "id,order_index,title,content,video_url,quiz";

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EnrollmentRow {
    pub(crate) id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) course_id: Uuid,
    pub(crate) org_id: Option<Uuid>,
    #[serde(default)]
    pub(crate) progress_pct: u8,
    #[serde(default)]
    pub(crate) passed: bool,
    #[serde(default)]
    pub(crate) practical_passed: bool,
    pub(crate) cert_code: Option<String>,
}

pub(crate) const ENROLLMENT_COLUMNS: &str =
    "id,user_id,course_id,org_id,progress_pct,passed,practical_passed,cert_code";

#[derive(Debug, Deserialize)]
pub(crate) struct ProgressRow {
    pub(crate) module_id: Uuid,
    pub(crate) status: ModuleStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ExamQuestionRow {
    pub(crate) id: Uuid,
    pub(crate) question: String,
    #[serde(default)]
    pub(crate) options: Vec<String>,
    pub(crate) correct_option: u32,
}

impl Question for ExamQuestionRow {
    fn correct_option(&self) -> u32 {
        self.correct_option
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ExamSessionRow {
    pub(crate) id: Uuid,
    pub(crate) enrollment_id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) question_ids: Vec<Uuid>,
    pub(crate) status: String,
    pub(crate) expires_at: DateTime<Utc>,
}

pub(crate) const SESSION_COLUMNS: &str = "id,enrollment_id,user_id,question_ids,status,expires_at";

// --- Enrollments ---

#[api_model]
pub struct EnrollmentSummary {
    pub id: Uuid,
    pub course_id: Uuid,
    pub course_title: Option<String>,
    pub progress_pct: u8,
    pub passed: bool,
    pub practical_passed: bool,
    pub cert_code: Option<String>,
}

#[api_model]
pub struct ModuleState {
    pub id: Uuid,
    pub order_index: i32,
    pub title: String,
    pub status: ModuleStatus,
    pub unlocked: bool,
}

#[api_model(deny_unknown_fields = false)]
pub struct EnrollmentDetail {
    #[serde(flatten)]
    pub enrollment: EnrollmentSummary,
    pub modules: Vec<ModuleState>,
    /// First module still to complete; absent once every module is done
    pub next_module_id: Option<Uuid>,
}

/// A question as shown to the learner.
#[api_model]
pub struct PublicQuestion {
    pub question: String,
    pub options: Vec<String>,
}

#[api_model]
pub struct ModuleContent {
    pub id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub status: ModuleStatus,
    pub quiz: Vec<PublicQuestion>,
}

// --- Quizzes ---

#[api_model]
pub struct QuizSubmission {
    pub enrollment_id: Uuid,
    pub module_id: Uuid,
    /// Chosen option per question, in quiz order
    pub answers: Vec<Option<u32>>,
}

#[api_model(deny_unknown_fields = false)]
pub struct QuizResult {
    #[serde(flatten)]
    pub grade: Grade,
    pub module_completed: bool,
    pub progress_pct: u8,
    pub next_module_id: Option<Uuid>,
}

// --- Final exam ---

#[api_model]
pub struct ExamStartRequest {
    pub enrollment_id: Uuid,
}

#[api_model]
pub struct ExamQuestionView {
    pub id: Uuid,
    pub question: String,
    pub options: Vec<String>,
}

#[api_model]
pub struct ExamStarted {
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub questions: Vec<ExamQuestionView>,
}

#[api_model]
pub struct ExamSubmission {
    pub session_id: Uuid,
    /// Chosen option per question, in the order the questions were served
    pub answers: Vec<Option<u32>>,
}

#[api_model(deny_unknown_fields = false)]
pub struct ExamResult {
    #[serde(flatten)]
    pub grade: Grade,
    pub certificate_code: Option<String>,
    pub verification_url: Option<String>,
}

// --- Practical evaluation ---

#[api_model]
pub struct ChecklistItem {
    pub item: String,
    pub passed: bool,
}

#[api_model]
pub struct PracticalRequest {
    pub enrollment_id: Uuid,
    /// e.g. `sit-down counterbalance`, `reach truck`
    pub equipment_type: String,
    pub checklist: Vec<ChecklistItem>,
    pub notes: Option<String>,
}

#[api_model]
pub struct PracticalResult {
    pub attempt_id: Uuid,
    pub passed: bool,
}

#[api_model]
pub struct CertificateIssued {
    pub code: String,
    pub verification_url: String,
    pub expires_at: DateTime<Utc>,
    /// `false` when the enrollment already held this certificate
    pub fresh: bool,
}
