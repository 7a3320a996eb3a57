use crate::error::{OrganizationError, OrganizationErrorExt};
use crate::model::{InviteView, MemberView, RosterEntry, SeatPool, SeatSummary};
use chrono::{DateTime, Utc};
use feq_database::Database;
use feq_kernel::domain::constants::{
    ENROLLMENTS, ORG_MEMBERS, ORG_SEATS, PROFILES, RPC_ALLOCATE_SEAT, RPC_CLAIM_SEAT_INVITE,
    RPC_RELEASE_SEAT, SEAT_INVITES,
};
use feq_kernel::domain::roles::Role;
use feq_kernel::security::random_code;
use fxhash::FxHashMap;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const INVITE_CODE_LEN: usize = 8;

#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: Uuid,
    full_name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MemberRow {
    user_id: Uuid,
    role: String,
}

#[derive(Debug, Deserialize)]
struct EnrollmentRow {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    #[serde(default)]
    progress_pct: u8,
    #[serde(default)]
    passed: bool,
    #[serde(default)]
    practical_passed: bool,
    cert_code: Option<String>,
    cert_expires_at: Option<DateTime<Utc>>,
}

pub(crate) async fn seats(db: &Database, org_id: Uuid) -> Result<Vec<SeatSummary>, OrganizationError> {
    let pools: Vec<SeatPool> = db
        .service()
        .from(ORG_SEATS)
        .select("course_id,total_seats,used_seats")
        .eq("org_id", org_id)
        .fetch()
        .await
        .context("Loading seats")?;
    Ok(pools.into_iter().map(SeatSummary::from).collect())
}

async fn profiles(
    db: &Database,
    user_ids: impl IntoIterator<Item = Uuid>,
) -> Result<FxHashMap<Uuid, ProfileRow>, OrganizationError> {
    let ids: Vec<Uuid> = user_ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(FxHashMap::default());
    }
    let rows: Vec<ProfileRow> = db
        .service()
        .from(PROFILES)
        .select("id,full_name,email")
        .in_list("id", ids)
        .fetch()
        .await
        .context("Loading profiles")?;
    Ok(rows.into_iter().map(|row| (row.id, row)).collect())
}

pub(crate) async fn members(db: &Database, org_id: Uuid) -> Result<Vec<MemberView>, OrganizationError> {
    let rows: Vec<MemberRow> = db
        .service()
        .from(ORG_MEMBERS)
        .select("user_id,role")
        .eq("org_id", org_id)
        .fetch()
        .await
        .context("Loading members")?;
    let mut people = profiles(db, rows.iter().map(|row| row.user_id)).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let profile = people.remove(&row.user_id);
            MemberView {
                user_id: row.user_id,
                role: row.role,
                full_name: profile.as_ref().and_then(|p| p.full_name.clone()),
                email: profile.and_then(|p| p.email),
            }
        })
        .collect())
}

pub(crate) async fn roster(db: &Database, org_id: Uuid) -> Result<Vec<RosterEntry>, OrganizationError> {
    let rows: Vec<EnrollmentRow> = db
        .service()
        .from(ENROLLMENTS)
        .select("id,user_id,course_id,progress_pct,passed,practical_passed,cert_code,cert_expires_at")
        .eq("org_id", org_id)
        .order("created_at", false)
        .fetch()
        .await
        .context("Loading roster")?;
    let people = profiles(db, rows.iter().map(|row| row.user_id)).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let profile = people.get(&row.user_id);
            RosterEntry {
                enrollment_id: row.id,
                user_id: row.user_id,
                full_name: profile.and_then(|p| p.full_name.clone()),
                email: profile.and_then(|p| p.email.clone()),
                course_id: row.course_id,
                progress_pct: row.progress_pct,
                passed: row.passed,
                practical_passed: row.practical_passed,
                cert_code: row.cert_code,
                cert_expires_at: row.cert_expires_at,
            }
        })
        .collect())
}

pub(crate) async fn upsert_member(
    db: &Database,
    org_id: Uuid,
    user_id: Uuid,
    role: Role,
) -> Result<(), OrganizationError> {
    db.service()
        .from(ORG_MEMBERS)
        .upsert(
            &json!({ "org_id": org_id, "user_id": user_id, "role": role.as_str() }),
            "org_id,user_id",
        )
        .await
        .context("Saving member")
}

/// Reserves a seat and records the invitation.
///
/// The seat counter is only touched through the `allocate_seat` function so two admins
/// inviting at once can never oversubscribe a pool. If the invitation cannot be stored
/// afterwards the seat is handed back.
#[instrument(skip(db, email))]
pub(crate) async fn create_invite(
    db: &Database,
    org_id: Uuid,
    course_id: Uuid,
    email: &str,
    invited_by: Uuid,
) -> Result<InviteView, OrganizationError> {
    let seat_args = json!({ "p_org_id": org_id, "p_course_id": course_id });
    let allocated: bool =
        db.service().rpc(RPC_ALLOCATE_SEAT, &seat_args).await.context("Allocating seat")?;
    if !allocated {
        return Err(OrganizationError::NoSeats {});
    }

    let stored: Result<InviteView, _> = db
        .service()
        .from(SEAT_INVITES)
        .insert_one(&json!({
            "org_id": org_id,
            "course_id": course_id,
            "email": email.trim().to_lowercase(),
            "code": random_code(INVITE_CODE_LEN),
            "status": "pending",
            "invited_by": invited_by,
        }))
        .await;

    match stored {
        Ok(invite) => {
            info!(invite_id = %invite.id, "Seat invitation created");
            Ok(invite)
        },
        Err(err) => {
            if let Err(release) = db.service().rpc_void(RPC_RELEASE_SEAT, &seat_args).await {
                warn!(error = %release, "Seat could not be released after a failed invitation");
            }
            Err(OrganizationError::from(err)).context("Storing invitation")
        },
    }
}

/// Claims an invitation for `user_id`, returning the new enrollment.
#[instrument(skip(db))]
pub(crate) async fn claim_invite(
    db: &Database,
    code: &str,
    user_id: Uuid,
) -> Result<Uuid, OrganizationError> {
    db.service()
        .rpc(RPC_CLAIM_SEAT_INVITE, &json!({ "p_code": code, "p_user_id": user_id }))
        .await
        .map_err(|err| {
            if err.is_not_found() {
                OrganizationError::NotFound {
                    message: "invitation not found or already claimed".into(),
                    context: None,
                }
            } else {
                err.into()
            }
        })
}
