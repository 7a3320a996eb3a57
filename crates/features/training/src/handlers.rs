use crate::model::{
    CertificateIssued, ChecklistItem, CourseDetail, CourseSummary, EnrollmentDetail,
    EnrollmentSummary, ExamResult, ExamStartRequest, ExamStarted, ExamSubmission, ModuleContent,
    PracticalRequest, PracticalResult, QuizResult, QuizSubmission,
};
use crate::{Training, catalog, exam, learning, practical};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use feq_certificates::Certificates;
use feq_derive::api_handler;
use feq_identity::CurrentUser;
use feq_kernel::domain::constants::TRAINING_TAG;
use feq_kernel::prelude::*;
use serde_json::json;
use std::borrow::Cow;
use tracing::warn;
use uuid::Uuid;

const MAX_ANSWERS: usize = 500;
const MAX_CHECKLIST: usize = 200;

impl Validate for QuizSubmission {
    fn validate(&self) -> Result<(), Cow<'static, str>> {
        if self.answers.len() > MAX_ANSWERS {
            return Err("too many answers".into());
        }
        Ok(())
    }
}

impl Validate for ExamStartRequest {
    fn validate(&self) -> Result<(), Cow<'static, str>> {
        Ok(())
    }
}

impl Validate for ExamSubmission {
    fn validate(&self) -> Result<(), Cow<'static, str>> {
        if self.answers.len() > MAX_ANSWERS {
            return Err("too many answers".into());
        }
        Ok(())
    }
}

impl Validate for PracticalRequest {
    fn validate(&self) -> Result<(), Cow<'static, str>> {
        validate::non_blank("equipment_type", &self.equipment_type)?;
        validate::max_len("equipment_type", &self.equipment_type, 128)?;
        if self.checklist.len() > MAX_CHECKLIST {
            return Err("checklist is too long".into());
        }
        for ChecklistItem { item, .. } in &self.checklist {
            validate::non_blank("checklist item", item)?;
            validate::max_len("checklist item", item, 512)?;
        }
        if let Some(notes) = &self.notes {
            validate::max_len("notes", notes, 4000)?;
        }
        Ok(())
    }
}

// --- Catalog ---

#[api_handler(
    get,
    path = "/api/courses",
    responses((status = OK, description = "Courses on sale", body = [CourseSummary])),
    tag = TRAINING_TAG,
)]
pub(crate) async fn courses_handler(
    State(state): State<ApiState>,
) -> Result<Json<Vec<CourseSummary>>, ApiError> {
    Ok(Json(catalog::active_courses(&state.database).await?))
}

#[api_handler(
    get,
    path = "/api/courses/{slug}",
    params(("slug" = String, Path, description = "Course slug")),
    responses(
        (status = OK, description = "Course with its module outline", body = CourseDetail),
        (status = NOT_FOUND, description = "Unknown or retired course", body = ErrorBody),
    ),
    tag = TRAINING_TAG,
)]
pub(crate) async fn course_handler(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<Json<CourseDetail>, ApiError> {
    let slug = ResourceGuard::slug(&slug)?;
    Ok(Json(catalog::course_by_slug(&state.database, &slug).await?))
}

// --- Enrollments ---

#[api_handler(
    get,
    path = "/api/enrollments",
    responses(
        (status = OK, description = "The caller's enrollments", body = [EnrollmentSummary]),
        (status = UNAUTHORIZED, description = "Sign in required", body = ErrorBody),
    ),
    tag = TRAINING_TAG,
)]
pub(crate) async fn enrollments_handler(
    State(state): State<ApiState>,
    current: CurrentUser,
) -> Result<Json<Vec<EnrollmentSummary>>, ApiError> {
    Ok(Json(learning::my_enrollments(&state.database, current.id()).await?))
}

#[api_handler(
    get,
    path = "/api/enrollments/{enrollment_id}",
    params(("enrollment_id" = Uuid, Path, description = "Enrollment id")),
    responses(
        (status = OK, description = "Modules with their status", body = EnrollmentDetail),
        (status = FORBIDDEN, description = "Someone else's enrollment", body = ErrorBody),
        (status = NOT_FOUND, description = "Unknown enrollment", body = ErrorBody),
    ),
    tag = TRAINING_TAG,
)]
pub(crate) async fn enrollment_handler(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(enrollment_id): Path<String>,
) -> Result<Json<EnrollmentDetail>, ApiError> {
    let enrollment_id = ResourceGuard::id(&enrollment_id, "enrollment")?;
    let enrollment =
        learning::owned_enrollment(&state.database, enrollment_id, current.id()).await?;
    Ok(Json(learning::detail(&state.database, enrollment).await?))
}

#[api_handler(
    get,
    path = "/api/enrollments/{enrollment_id}/modules/{module_id}",
    params(
        ("enrollment_id" = Uuid, Path, description = "Enrollment id"),
        ("module_id" = Uuid, Path, description = "Module id"),
    ),
    responses(
        (status = OK, description = "Module content and quiz", body = ModuleContent),
        (status = FORBIDDEN, description = "Module still locked", body = ErrorBody),
    ),
    tag = TRAINING_TAG,
)]
pub(crate) async fn module_handler(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path((enrollment_id, module_id)): Path<(String, String)>,
) -> Result<Json<ModuleContent>, ApiError> {
    let enrollment_id = ResourceGuard::id(&enrollment_id, "enrollment")?;
    let module_id = ResourceGuard::id(&module_id, "module")?;
    let enrollment =
        learning::owned_enrollment(&state.database, enrollment_id, current.id()).await?;
    Ok(Json(learning::module_content(&state.database, &enrollment, module_id).await?))
}

#[api_handler(
    post,
    path = "/api/enrollments/{enrollment_id}/certificate",
    params(("enrollment_id" = Uuid, Path, description = "Enrollment id")),
    responses(
        (status = OK, description = "Certificate of a passed enrollment", body = CertificateIssued),
        (status = CONFLICT, description = "Final exam not passed", body = ErrorBody),
    ),
    tag = TRAINING_TAG,
)]
pub(crate) async fn certificate_handler(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(enrollment_id): Path<String>,
) -> Result<Json<CertificateIssued>, ApiError> {
    let enrollment_id = ResourceGuard::id(&enrollment_id, "enrollment")?;
    learning::owned_enrollment(&state.database, enrollment_id, current.id()).await?;
    let score = learning::best_exam_score(&state.database, enrollment_id).await?;

    let certificates = state.try_get_slice::<Certificates>()?;
    let issued = certificates.issue(&state.database, &state.mailer, enrollment_id, score).await?;
    let payload = &issued.certificate.payload;

    Ok(Json(CertificateIssued {
        verification_url: certificates.verification_url(&payload.code),
        code: payload.code.clone(),
        expires_at: payload.expires_at,
        fresh: issued.fresh,
    }))
}

// --- Quizzes and exams ---

#[api_handler(
    post,
    path = "/api/quiz/submit",
    request_body = QuizSubmission,
    responses(
        (status = OK, description = "Graded quiz and updated progress", body = QuizResult),
        (status = FORBIDDEN, description = "Module locked or foreign enrollment", body = ErrorBody),
    ),
    tag = TRAINING_TAG,
)]
pub(crate) async fn quiz_handler(
    State(state): State<ApiState>,
    current: CurrentUser,
    ValidJson(body): ValidJson<QuizSubmission>,
) -> Result<Json<QuizResult>, ApiError> {
    let enrollment =
        learning::owned_enrollment(&state.database, body.enrollment_id, current.id()).await?;
    Ok(Json(learning::submit_quiz(&state.database, &enrollment, &body).await?))
}

#[api_handler(
    post,
    path = "/api/exam/start",
    request_body = ExamStartRequest,
    responses(
        (status = OK, description = "Exam questions without answers", body = ExamStarted),
        (status = FORBIDDEN, description = "Modules unfinished or foreign enrollment", body = ErrorBody),
    ),
    tag = TRAINING_TAG,
)]
pub(crate) async fn exam_start_handler(
    State(state): State<ApiState>,
    current: CurrentUser,
    ValidJson(body): ValidJson<ExamStartRequest>,
) -> Result<Json<ExamStarted>, ApiError> {
    let training = state.try_get_slice::<Training>()?;
    let started =
        training.start_exam(&state.database, current.id(), body.enrollment_id).await?;
    Ok(Json(started))
}

#[api_handler(
    post,
    path = "/api/exam/submit",
    request_body = ExamSubmission,
    responses(
        (status = OK, description = "Exam result, with the certificate on a pass", body = ExamResult),
        (status = FORBIDDEN, description = "Someone else's session", body = ErrorBody),
        (status = CONFLICT, description = "Session submitted or expired", body = ErrorBody),
    ),
    tag = TRAINING_TAG,
)]
pub(crate) async fn exam_submit_handler(
    State(state): State<ApiState>,
    current: CurrentUser,
    ValidJson(body): ValidJson<ExamSubmission>,
) -> Result<Json<ExamResult>, ApiError> {
    let graded = exam::submit_exam(&state.database, current.id(), &body).await?;
    let mut result = ExamResult { grade: graded.grade, certificate_code: None, verification_url: None };

    if graded.grade.passed {
        let certificates = state.try_get_slice::<Certificates>()?;
        // The pass is already stored; the learner can fetch the certificate later.
        match certificates
            .issue(&state.database, &state.mailer, graded.enrollment_id, graded.grade.score)
            .await
        {
            Ok(issued) => {
                let code = issued.certificate.payload.code;
                result.verification_url = Some(certificates.verification_url(&code));
                result.certificate_code = Some(code);
            },
            Err(err) => {
                warn!(error = %err, enrollment_id = %graded.enrollment_id, "Certificate issue failed");
            },
        }
    }

    feq_audit::trail(&state)
        .record(
            Some(current.id()),
            "exam.submit",
            "exam_sessions",
            Some(&body.session_id.to_string()),
            json!({ "score": graded.grade.score, "passed": graded.grade.passed }),
        )
        .await;

    Ok(Json(result))
}

// --- Practical evaluation ---

#[api_handler(
    post,
    path = "/api/practical",
    request_body = PracticalRequest,
    responses(
        (status = CREATED, description = "Evaluation recorded", body = PracticalResult),
        (status = FORBIDDEN, description = "Caller cannot evaluate this learner", body = ErrorBody),
    ),
    tag = TRAINING_TAG,
)]
pub(crate) async fn practical_handler(
    State(state): State<ApiState>,
    current: CurrentUser,
    ValidJson(body): ValidJson<PracticalRequest>,
) -> Result<(StatusCode, Json<PracticalResult>), ApiError> {
    let result = practical::record(&state.database, current.id(), &body).await?;

    feq_audit::trail(&state)
        .record(
            Some(current.id()),
            "practical.evaluate",
            "practical_attempts",
            Some(&result.attempt_id.to_string()),
            json!({ "enrollment_id": body.enrollment_id, "passed": result.passed }),
        )
        .await;

    Ok((StatusCode::CREATED, Json(result)))
}
