use chrono::{DateTime, Utc};
use feq_derive::api_model;
use feq_kernel::domain::roles::Role;
use feq_kernel::server::validate::{self, Validate};
use std::borrow::Cow;
use uuid::Uuid;

/// Seats purchased for one course.
#[api_model(deny_unknown_fields = false)]
pub struct SeatPool {
    pub course_id: Uuid,
    pub total_seats: i32,
    pub used_seats: i32,
}

#[api_model]
pub struct SeatSummary {
    pub course_id: Uuid,
    pub total_seats: i32,
    pub used_seats: i32,
    pub available: i32,
}

impl From<SeatPool> for SeatSummary {
    fn from(pool: SeatPool) -> Self {
        Self {
            course_id: pool.course_id,
            total_seats: pool.total_seats,
            used_seats: pool.used_seats,
            available: (pool.total_seats - pool.used_seats).max(0),
        }
    }
}

#[api_model]
pub struct MemberView {
    pub user_id: Uuid,
    /// `owner`, `admin`, `trainer` or `member`
    pub role: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
}

#[api_model]
pub struct AddMemberRequest {
    pub user_id: Uuid,
    #[schema(value_type = String, example = "trainer")]
    pub role: Role,
}

impl Validate for AddMemberRequest {
    fn validate(&self) -> Result<(), Cow<'static, str>> {
        Ok(())
    }
}

/// Learner progress inside an organization.
#[api_model]
pub struct RosterEntry {
    pub enrollment_id: Uuid,
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub course_id: Uuid,
    pub progress_pct: u8,
    pub passed: bool,
    pub practical_passed: bool,
    pub cert_code: Option<String>,
    pub cert_expires_at: Option<DateTime<Utc>>,
}

#[api_model]
pub struct InviteRequest {
    pub email: String,
    pub course_id: Uuid,
}

impl Validate for InviteRequest {
    fn validate(&self) -> Result<(), Cow<'static, str>> {
        validate::email("email", &self.email)
    }
}

#[api_model(deny_unknown_fields = false)]
pub struct InviteView {
    pub id: Uuid,
    pub org_id: Uuid,
    pub course_id: Uuid,
    pub email: String,
    /// Code the invitee enters to claim the seat
    pub code: String,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[api_model]
pub struct ClaimRequest {
    pub code: String,
}

impl Validate for ClaimRequest {
    fn validate(&self) -> Result<(), Cow<'static, str>> {
        validate::non_blank("code", &self.code)
    }
}

#[api_model]
pub struct ClaimResponse {
    /// Enrollment created for the claimant
    pub enrollment_id: Uuid,
}
