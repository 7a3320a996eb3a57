use crate::Organization;
use crate::error::OrganizationError;
use crate::membership::{can_assign, member_role, require_permission};
use crate::model::{
    AddMemberRequest, ClaimRequest, ClaimResponse, InviteRequest, InviteView, MemberView,
    RosterEntry, SeatSummary,
};
use crate::service;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use feq_derive::api_handler;
use feq_identity::CurrentUser;
use feq_kernel::domain::constants::ORGANIZATION_TAG;
use feq_kernel::domain::roles::Permission;
use feq_kernel::prelude::*;
use feq_mailer::{Email, escape_html};
use serde_json::json;
use uuid::Uuid;

async fn authorize(
    state: &ApiState,
    current: &CurrentUser,
    org_id: &str,
    permission: Permission,
) -> Result<Uuid, ApiError> {
    let org_id = ResourceGuard::id(org_id, "organization")?;
    require_permission(&state.database, org_id, current.id(), permission).await?;
    Ok(org_id)
}

#[api_handler(
    get,
    path = "/api/orgs/{org_id}/seats",
    params(("org_id" = Uuid, Path, description = "Organization id")),
    responses(
        (status = OK, description = "Seat pools per course", body = [SeatSummary]),
        (status = FORBIDDEN, description = "Not allowed", body = ErrorBody),
    ),
    tag = ORGANIZATION_TAG,
)]
pub(crate) async fn seats_handler(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(org_id): Path<String>,
) -> Result<Json<Vec<SeatSummary>>, ApiError> {
    let org_id = authorize(&state, &current, &org_id, Permission::VIEW_ROSTER).await?;
    Ok(Json(service::seats(&state.database, org_id).await?))
}

#[api_handler(
    get,
    path = "/api/orgs/{org_id}/members",
    params(("org_id" = Uuid, Path, description = "Organization id")),
    responses(
        (status = OK, description = "Organization members", body = [MemberView]),
        (status = FORBIDDEN, description = "Not allowed", body = ErrorBody),
    ),
    tag = ORGANIZATION_TAG,
)]
pub(crate) async fn members_handler(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(org_id): Path<String>,
) -> Result<Json<Vec<MemberView>>, ApiError> {
    let org_id = authorize(&state, &current, &org_id, Permission::VIEW_ROSTER).await?;
    Ok(Json(service::members(&state.database, org_id).await?))
}

#[api_handler(
    post,
    path = "/api/orgs/{org_id}/members",
    params(("org_id" = Uuid, Path, description = "Organization id")),
    request_body = AddMemberRequest,
    responses(
        (status = NO_CONTENT, description = "Member added or role changed"),
        (status = FORBIDDEN, description = "Not allowed", body = ErrorBody),
    ),
    tag = ORGANIZATION_TAG,
)]
pub(crate) async fn add_member_handler(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(org_id): Path<String>,
    ValidJson(body): ValidJson<AddMemberRequest>,
) -> Result<StatusCode, ApiError> {
    let org_id = ResourceGuard::id(&org_id, "organization")?;
    let actor =
        require_permission(&state.database, org_id, current.id(), Permission::MANAGE_MEMBERS)
            .await?;
    let current_role = member_role(&state.database, org_id, body.user_id).await?;
    if !can_assign(actor, current_role, body.role) {
        return Err(OrganizationError::Forbidden {
            message: "only owners can grant or change ownership".into(),
            context: None,
        }
        .into());
    }

    service::upsert_member(&state.database, org_id, body.user_id, body.role).await?;
    feq_audit::trail(&state)
        .record(
            Some(current.id()),
            "org.member.upsert",
            "org_members",
            Some(&body.user_id.to_string()),
            json!({ "org_id": org_id, "role": body.role.as_str() }),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

#[api_handler(
    get,
    path = "/api/orgs/{org_id}/roster",
    params(("org_id" = Uuid, Path, description = "Organization id")),
    responses(
        (status = OK, description = "Enrollments with progress", body = [RosterEntry]),
        (status = FORBIDDEN, description = "Not allowed", body = ErrorBody),
    ),
    tag = ORGANIZATION_TAG,
)]
pub(crate) async fn roster_handler(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(org_id): Path<String>,
) -> Result<Json<Vec<RosterEntry>>, ApiError> {
    let org_id = authorize(&state, &current, &org_id, Permission::VIEW_ROSTER).await?;
    Ok(Json(service::roster(&state.database, org_id).await?))
}

#[api_handler(
    post,
    path = "/api/orgs/{org_id}/invites",
    params(("org_id" = Uuid, Path, description = "Organization id")),
    request_body = InviteRequest,
    responses(
        (status = CREATED, description = "Seat reserved and invitation sent", body = InviteView),
        (status = FORBIDDEN, description = "Not allowed", body = ErrorBody),
        (status = CONFLICT, description = "No seats left", body = ErrorBody),
    ),
    tag = ORGANIZATION_TAG,
)]
pub(crate) async fn invite_handler(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(org_id): Path<String>,
    ValidJson(body): ValidJson<InviteRequest>,
) -> Result<(StatusCode, Json<InviteView>), ApiError> {
    let org_id = authorize(&state, &current, &org_id, Permission::MANAGE_SEATS).await?;
    let slice = state.try_get_slice::<Organization>()?;

    let invite =
        service::create_invite(&state.database, org_id, body.course_id, &body.email, current.id())
            .await?;

    let link = slice.claim_url(&invite.code);
    let email = Email::new(&invite.email, "You have been invited to forklift operator training")
        .html(format!(
            "<p>You have a training seat waiting.</p>\
             <p>Sign in and claim it at <a href=\"{link}\">{link}</a> \
             or enter the code <strong>{code}</strong>.</p>",
            link = escape_html(&link),
            code = invite.code,
        ));
    state.mailer.send_or_log(&email).await;

    feq_audit::trail(&state)
        .record(
            Some(current.id()),
            "seat.invite",
            "seat_invites",
            Some(&invite.id.to_string()),
            json!({ "org_id": org_id, "course_id": invite.course_id, "email": invite.email }),
        )
        .await;

    Ok((StatusCode::CREATED, Json(invite)))
}

#[api_handler(
    post,
    path = "/api/invites/claim",
    request_body = ClaimRequest,
    responses(
        (status = OK, description = "Seat claimed and enrollment created", body = ClaimResponse),
        (status = UNAUTHORIZED, description = "Sign in required", body = ErrorBody),
        (status = NOT_FOUND, description = "Unknown or used code", body = ErrorBody),
    ),
    tag = ORGANIZATION_TAG,
)]
pub(crate) async fn claim_handler(
    State(state): State<ApiState>,
    current: CurrentUser,
    ValidJson(body): ValidJson<ClaimRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let code = ResourceGuard::code(&body.code)?;
    let enrollment_id = service::claim_invite(&state.database, &code, current.id()).await?;

    feq_audit::trail(&state)
        .record(
            Some(current.id()),
            "seat.claim",
            "enrollments",
            Some(&enrollment_id.to_string()),
            json!({ "code": code }),
        )
        .await;

    Ok(Json(ClaimResponse { enrollment_id }))
}
