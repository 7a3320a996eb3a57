//! Timed final exam.
//!
//! Starting an exam draws a random set of active questions and stores their ids on an
//! `exam_sessions` row; the submission is graded against that stored order, so the
//! client never sees the answer key.

use crate::TrainingInner;
use crate::error::{TrainingError, TrainingErrorExt};
use crate::grading::{Grade, grade};
use crate::learning::{modules, owned_enrollment, statuses};
use crate::progress::next_module;
use crate::model::{
    ExamQuestionRow, ExamQuestionView, ExamSessionRow, ExamStarted, ExamSubmission,
    SESSION_COLUMNS,
};
use chrono::{Duration, Utc};
use feq_database::{Database, Returning};
use feq_kernel::domain::constants::{ENROLLMENTS, EXAM_ATTEMPTS, EXAM_QUESTIONS, EXAM_SESSIONS};
use fxhash::FxHashMap;
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};
use uuid::Uuid;

const ACTIVE: &str = "active";
const SUBMITTED: &str = "submitted";
const EXPIRED: &str = "expired";

#[derive(Debug, Deserialize)]
struct QuestionId {
    id: Uuid,
}

/// A graded submission.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GradedExam {
    pub(crate) enrollment_id: Uuid,
    pub(crate) grade: Grade,
}

/// Loads `ids` keeping their order.
async fn questions_in_order(
    db: &Database,
    ids: &[Uuid],
) -> Result<Vec<ExamQuestionRow>, TrainingError> {
    let rows: Vec<ExamQuestionRow> = db
        .service()
        .from(EXAM_QUESTIONS)
        .select("id,question,options,correct_option")
        .in_list("id", ids.iter().copied())
        .fetch()
        .await
        .context("Loading exam questions")?;
    let mut by_id: FxHashMap<Uuid, ExamQuestionRow> =
        rows.into_iter().map(|row| (row.id, row)).collect();

    ids.iter()
        .map(|id| {
            by_id.remove(id).ok_or_else(|| TrainingError::Internal {
                message: format!("exam question {id} no longer exists").into(),
                context: None,
            })
        })
        .collect()
}

impl TrainingInner {
    /// Opens an exam session for a learner who completed every module.
    ///
    /// # Errors
    /// [`TrainingError::Forbidden`] for someone else's enrollment or unfinished modules,
    /// [`TrainingError::Conflict`] when the course has no active questions.
    #[instrument(skip(self, db))]
    pub(crate) async fn start_exam(
        &self,
        db: &Database,
        user_id: Uuid,
        enrollment_id: Uuid,
    ) -> Result<ExamStarted, TrainingError> {
        let enrollment = owned_enrollment(db, enrollment_id, user_id).await?;
        let modules = modules(db, enrollment.course_id).await?;
        let statuses = statuses(db, enrollment.id, &modules).await?;
        if statuses.is_empty() || next_module(&statuses).is_some() {
            return Err(TrainingError::forbidden("finish every module before the final exam"));
        }

        let pool: Vec<QuestionId> = db
            .service()
            .from(EXAM_QUESTIONS)
            .select("id")
            .eq("course_id", enrollment.course_id)
            .eq("active", true)
            .fetch()
            .await
            .context("Loading question pool")?;
        if pool.is_empty() {
            return Err(TrainingError::conflict("this course has no exam questions yet"));
        }

        let mut ids: Vec<Uuid> = pool.into_iter().map(|q| q.id).collect();
        ids.shuffle(&mut rand::rng());
        ids.truncate(self.question_count.max(1));
        let questions = questions_in_order(db, &ids).await?;

        let now = Utc::now();
        let session: ExamSessionRow = db
            .service()
            .from(EXAM_SESSIONS)
            .select(SESSION_COLUMNS)
            .insert_one(&json!({
                "enrollment_id": enrollment.id,
                "user_id": user_id,
                "question_ids": ids,
                "status": ACTIVE,
                "started_at": now,
                "expires_at": now + Duration::minutes(self.time_limit_minutes),
            }))
            .await
            .context("Opening exam session")?;

        info!(session_id = %session.id, questions = ids.len(), "Exam started");

        Ok(ExamStarted {
            session_id: session.id,
            expires_at: session.expires_at,
            questions: questions
                .into_iter()
                .map(|q| ExamQuestionView { id: q.id, question: q.question, options: q.options })
                .collect(),
        })
    }
}

/// Grades and closes an exam session and records the attempt. A pass marks the
/// enrollment passed; issuing the certificate is left to the caller.
///
/// # Errors
/// [`TrainingError::Forbidden`] for another learner's session,
/// [`TrainingError::Conflict`] once the session was submitted or ran out of time.
#[instrument(skip(db, submission), fields(session_id = %submission.session_id))]
pub(crate) async fn submit_exam(
    db: &Database,
    user_id: Uuid,
    submission: &ExamSubmission,
) -> Result<GradedExam, TrainingError> {
    let session: Option<ExamSessionRow> = db
        .service()
        .from(EXAM_SESSIONS)
        .select(SESSION_COLUMNS)
        .eq("id", submission.session_id)
        .fetch_optional()
        .await
        .context("Loading exam session")?;
    let session = session.ok_or_else(|| TrainingError::not_found("exam session not found"))?;

    if session.user_id != user_id {
        return Err(TrainingError::forbidden("this exam session belongs to someone else"));
    }
    match session.status.as_str() {
        ACTIVE => {},
        SUBMITTED => return Err(TrainingError::conflict("this exam was already submitted")),
        _ => return Err(TrainingError::conflict("this exam session has expired")),
    }

    let now = Utc::now();
    if now > session.expires_at {
        let expired: Result<Vec<Value>, _> = db
            .service()
            .from(EXAM_SESSIONS)
            .eq("id", session.id)
            .eq("status", ACTIVE)
            .update(&json!({ "status": EXPIRED }), Returning::Minimal)
            .await;
        if let Err(err) = expired {
            warn!(error = %err, "Could not mark exam session expired");
        }
        return Err(TrainingError::conflict("this exam session has expired"));
    }

    let questions = questions_in_order(db, &session.question_ids).await?;
    let result = grade(&questions, &submission.answers);

    // Only one submission can move the session out of `active`.
    let closed: Vec<Value> = db
        .service()
        .from(EXAM_SESSIONS)
        .eq("id", session.id)
        .eq("status", ACTIVE)
        .select("id")
        .update(&json!({ "status": SUBMITTED, "submitted_at": now }), Returning::Representation)
        .await
        .context("Closing exam session")?;
    if closed.is_empty() {
        return Err(TrainingError::conflict("this exam was already submitted"));
    }

    let _: Vec<Value> = db
        .service()
        .from(EXAM_ATTEMPTS)
        .insert(
            &json!({
                "session_id": session.id,
                "enrollment_id": session.enrollment_id,
                "user_id": user_id,
                "correct": result.correct,
                "total": result.total,
                "score": result.score,
                "passed": result.passed,
                "answers": submission.answers,
            }),
            Returning::Minimal,
        )
        .await
        .context("Recording exam attempt")?;

    if result.passed {
        let _: Vec<Value> = db
            .service()
            .from(ENROLLMENTS)
            .eq("id", session.enrollment_id)
            .update(&json!({ "passed": true }), Returning::Minimal)
            .await
            .context("Marking enrollment passed")?;
    }

    info!(score = result.score, passed = result.passed, "Exam submitted");
    Ok(GradedExam { enrollment_id: session.enrollment_id, grade: result })
}
