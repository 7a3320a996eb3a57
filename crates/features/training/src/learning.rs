//! Enrollments, module access and module quizzes.

use crate::error::{TrainingError, TrainingErrorExt};
use crate::grading::grade;
use crate::model::{
    ENROLLMENT_COLUMNS, EnrollmentDetail, EnrollmentRow, EnrollmentSummary, MODULE_COLUMNS,
    ModuleContent, ModuleRow, ModuleState, ProgressRow, PublicQuestion, QuizResult, QuizSubmission,
};
use crate::progress::{ModuleStatus, compute_course_progress, next_module, unlocked};
use chrono::Utc;
use feq_database::{Database, Returning};
use feq_kernel::domain::constants::{
    COURSES, ENROLLMENTS, EXAM_ATTEMPTS, MODULE_PROGRESS, MODULES, QUIZ_ATTEMPTS,
};
use fxhash::FxHashMap;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};
use uuid::Uuid;

pub(crate) async fn enrollment(db: &Database, id: Uuid) -> Result<EnrollmentRow, TrainingError> {
    let row: Option<EnrollmentRow> = db
        .service()
        .from(ENROLLMENTS)
        .select(ENROLLMENT_COLUMNS)
        .eq("id", id)
        .fetch_optional()
        .await
        .context("Loading enrollment")?;
    row.ok_or_else(|| TrainingError::not_found("enrollment not found"))
}

/// Loads an enrollment that must belong to `user_id`.
pub(crate) async fn owned_enrollment(
    db: &Database,
    id: Uuid,
    user_id: Uuid,
) -> Result<EnrollmentRow, TrainingError> {
    let row = enrollment(db, id).await?;
    if row.user_id == user_id {
        Ok(row)
    } else {
        Err(TrainingError::forbidden("this enrollment belongs to someone else"))
    }
}

pub(crate) async fn modules(db: &Database, course_id: Uuid) -> Result<Vec<ModuleRow>, TrainingError> {
    db.service()
        .from(MODULES)
        .select(MODULE_COLUMNS)
        .eq("course_id", course_id)
        .order("order_index", true)
        .fetch()
        .await
        .context("Loading modules")
}

/// Status of each of `modules`, in the same order.
pub(crate) async fn statuses(
    db: &Database,
    enrollment_id: Uuid,
    modules: &[ModuleRow],
) -> Result<Vec<ModuleStatus>, TrainingError> {
    let rows: Vec<ProgressRow> = db
        .service()
        .from(MODULE_PROGRESS)
        .select("module_id,status")
        .eq("enrollment_id", enrollment_id)
        .fetch()
        .await
        .context("Loading module progress")?;
    let by_module: FxHashMap<Uuid, ModuleStatus> =
        rows.into_iter().map(|row| (row.module_id, row.status)).collect();

    Ok(modules.iter().map(|m| by_module.get(&m.id).copied().unwrap_or_default()).collect())
}

#[derive(Debug, Deserialize)]
struct AttemptScore {
    score: f64,
}

/// Best passing final exam score of an enrollment, 0 when it has none.
pub(crate) async fn best_exam_score(db: &Database, enrollment_id: Uuid) -> Result<f64, TrainingError> {
    let best: Option<AttemptScore> = db
        .service()
        .from(EXAM_ATTEMPTS)
        .select("score")
        .eq("enrollment_id", enrollment_id)
        .eq("passed", true)
        .order("score", false)
        .fetch_optional()
        .await
        .context("Loading exam attempts")?;
    Ok(best.map_or(0.0, |attempt| attempt.score))
}

fn summary(row: EnrollmentRow, course_title: Option<String>) -> EnrollmentSummary {
    EnrollmentSummary {
        id: row.id,
        course_id: row.course_id,
        course_title,
        progress_pct: row.progress_pct,
        passed: row.passed,
        practical_passed: row.practical_passed,
        cert_code: row.cert_code,
    }
}

#[derive(Debug, Deserialize)]
struct CourseTitle {
    id: Uuid,
    title: String,
}

async fn course_titles(
    db: &Database,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<FxHashMap<Uuid, String>, TrainingError> {
    let ids: Vec<Uuid> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(FxHashMap::default());
    }
    let rows: Vec<CourseTitle> = db
        .service()
        .from(COURSES)
        .select("id,title")
        .in_list("id", ids)
        .fetch()
        .await
        .context("Loading course titles")?;
    Ok(rows.into_iter().map(|row| (row.id, row.title)).collect())
}

pub(crate) async fn my_enrollments(
    db: &Database,
    user_id: Uuid,
) -> Result<Vec<EnrollmentSummary>, TrainingError> {
    let rows: Vec<EnrollmentRow> = db
        .service()
        .from(ENROLLMENTS)
        .select(ENROLLMENT_COLUMNS)
        .eq("user_id", user_id)
        .order("created_at", false)
        .fetch()
        .await
        .context("Loading enrollments")?;
    let titles = course_titles(db, rows.iter().map(|row| row.course_id)).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let title = titles.get(&row.course_id).cloned();
            summary(row, title)
        })
        .collect())
}

pub(crate) async fn detail(
    db: &Database,
    enrollment: EnrollmentRow,
) -> Result<EnrollmentDetail, TrainingError> {
    let modules = modules(db, enrollment.course_id).await?;
    let statuses = statuses(db, enrollment.id, &modules).await?;
    let title = course_titles(db, [enrollment.course_id]).await?.remove(&enrollment.course_id);

    let next_module_id = next_module(&statuses).map(|i| modules[i].id);
    let states = modules
        .into_iter()
        .zip(&statuses)
        .enumerate()
        .map(|(index, (module, status))| ModuleState {
            id: module.id,
            order_index: module.order_index,
            title: module.title,
            status: *status,
            unlocked: unlocked(&statuses, index),
        })
        .collect();

    Ok(EnrollmentDetail { enrollment: summary(enrollment, title), modules: states, next_module_id })
}

/// Finds `module_id` in the course and rejects it while an earlier module is open.
fn locate(
    modules: &[ModuleRow],
    statuses: &[ModuleStatus],
    module_id: Uuid,
) -> Result<usize, TrainingError> {
    let index = modules
        .iter()
        .position(|m| m.id == module_id)
        .ok_or_else(|| TrainingError::not_found("module is not part of this course"))?;
    if unlocked(statuses, index) {
        Ok(index)
    } else {
        Err(TrainingError::forbidden("complete the previous modules first"))
    }
}

pub(crate) async fn module_content(
    db: &Database,
    enrollment: &EnrollmentRow,
    module_id: Uuid,
) -> Result<ModuleContent, TrainingError> {
    let mut modules = modules(db, enrollment.course_id).await?;
    let statuses = statuses(db, enrollment.id, &modules).await?;
    let index = locate(&modules, &statuses, module_id)?;
    let module = modules.swap_remove(index);

    Ok(ModuleContent {
        id: module.id,
        title: module.title,
        content: module.content,
        video_url: module.video_url,
        status: statuses[index],
        quiz: module
            .quiz
            .unwrap_or_default()
            .into_iter()
            .map(|q| PublicQuestion { question: q.question, options: q.options })
            .collect(),
    })
}

/// Grades a module quiz. Passing completes the module and refreshes course progress.
///
/// A module without questions is completed by submitting it.
#[instrument(skip(db, enrollment, submission), fields(enrollment_id = %enrollment.id, module_id = %submission.module_id))]
pub(crate) async fn submit_quiz(
    db: &Database,
    enrollment: &EnrollmentRow,
    submission: &QuizSubmission,
) -> Result<QuizResult, TrainingError> {
    let modules = modules(db, enrollment.course_id).await?;
    let mut statuses = statuses(db, enrollment.id, &modules).await?;
    let index = locate(&modules, &statuses, submission.module_id)?;

    let questions = modules[index].quiz.as_deref().unwrap_or_default();
    let result = grade(questions, &submission.answers);
    let completed = result.passed || questions.is_empty();

    let _: Vec<Value> = db
        .service()
        .from(QUIZ_ATTEMPTS)
        .insert(
            &json!({
                "enrollment_id": enrollment.id,
                "module_id": submission.module_id,
                "score": result.score,
                "passed": completed,
                "answers": submission.answers,
            }),
            Returning::Minimal,
        )
        .await
        .context("Recording quiz attempt")?;

    let mut progress_pct = enrollment.progress_pct;
    if completed {
        db.service()
            .from(MODULE_PROGRESS)
            .upsert(
                &json!({
                    "enrollment_id": enrollment.id,
                    "module_id": submission.module_id,
                    "status": ModuleStatus::Completed,
                    "quiz_score": result.score,
                    "completed_at": Utc::now(),
                }),
                "enrollment_id,module_id",
            )
            .await
            .context("Completing module")?;

        statuses[index] = ModuleStatus::Completed;
        progress_pct = compute_course_progress(&statuses);
        let _: Vec<Value> = db
            .service()
            .from(ENROLLMENTS)
            .eq("id", enrollment.id)
            .update(&json!({ "progress_pct": progress_pct }), Returning::Minimal)
            .await
            .context("Updating progress")?;
        info!(progress_pct, "Module completed");
    }

    Ok(QuizResult {
        grade: result,
        module_completed: completed,
        progress_pct,
        next_module_id: next_module(&statuses).map(|i| modules[i].id),
    })
}
