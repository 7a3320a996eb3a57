//! Hands-on evaluations recorded by an organization's trainers.

use crate::error::{TrainingError, TrainingErrorExt};
use crate::learning::enrollment;
use crate::model::{PracticalRequest, PracticalResult};
use chrono::Utc;
use feq_database::{Database, Returning};
use feq_kernel::domain::constants::{ENROLLMENTS, ORG_MEMBERS, PRACTICAL_ATTEMPTS};
use feq_kernel::domain::roles::Permission;
use feq_organization::member_role;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct OrgRef {
    org_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct AttemptRef {
    id: Uuid,
}

/// An evaluation passes when it has at least one item and every item passed.
#[must_use]
pub fn checklist_passed(request: &PracticalRequest) -> bool {
    !request.checklist.is_empty() && request.checklist.iter().all(|item| item.passed)
}

/// Organizations whose evaluators may assess the enrollment: its own org, or for
/// individually bought enrollments every org the learner belongs to.
async fn candidate_orgs(
    db: &Database,
    org_id: Option<Uuid>,
    learner: Uuid,
) -> Result<Vec<Uuid>, TrainingError> {
    if let Some(org_id) = org_id {
        return Ok(vec![org_id]);
    }
    let rows: Vec<OrgRef> = db
        .service()
        .from(ORG_MEMBERS)
        .select("org_id")
        .eq("user_id", learner)
        .fetch()
        .await
        .context("Loading learner organizations")?;
    Ok(rows.into_iter().map(|row| row.org_id).collect())
}

#[instrument(skip(db, request), fields(enrollment_id = %request.enrollment_id))]
pub(crate) async fn record(
    db: &Database,
    evaluator: Uuid,
    request: &PracticalRequest,
) -> Result<PracticalResult, TrainingError> {
    let enrollment = enrollment(db, request.enrollment_id).await?;
    if enrollment.user_id == evaluator {
        return Err(TrainingError::forbidden("learners cannot evaluate their own practical"));
    }

    let mut allowed = false;
    for org_id in candidate_orgs(db, enrollment.org_id, enrollment.user_id).await? {
        if member_role(db, org_id, evaluator)
            .await?
            .is_some_and(|role| role.allows(Permission::EVALUATE_PRACTICAL))
        {
            allowed = true;
            break;
        }
    }
    if !allowed {
        return Err(TrainingError::forbidden("not an evaluator for this learner"));
    }

    let passed = checklist_passed(request);
    let attempt: AttemptRef = db
        .service()
        .from(PRACTICAL_ATTEMPTS)
        .select("id")
        .insert_one(&json!({
            "enrollment_id": enrollment.id,
            "evaluator_id": evaluator,
            "equipment_type": request.equipment_type.trim(),
            "checklist": request.checklist,
            "passed": passed,
            "notes": request.notes,
            "evaluated_at": Utc::now(),
        }))
        .await
        .context("Recording practical evaluation")?;

    if passed {
        let _: Vec<Value> = db
            .service()
            .from(ENROLLMENTS)
            .eq("id", enrollment.id)
            .update(&json!({ "practical_passed": true }), Returning::Minimal)
            .await
            .context("Marking practical passed")?;
    }

    info!(passed, "Practical evaluation recorded");
    Ok(PracticalResult { attempt_id: attempt.id, passed })
}
