//! Role lookups and permission checks.

use crate::error::{OrganizationError, OrganizationErrorExt};
use feq_database::Database;
use feq_kernel::domain::constants::ORG_MEMBERS;
use feq_kernel::domain::roles::{Permission, Role};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct RoleRow {
    role: String,
}

/// Role of `user_id` in `org_id`, if they belong to it.
///
/// Unknown role names grant nothing.
///
/// # Errors
/// [`OrganizationError::Database`] when the lookup fails.
pub async fn member_role(
    db: &Database,
    org_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Role>, OrganizationError> {
    let row: Option<RoleRow> = db
        .service()
        .from(ORG_MEMBERS)
        .select("role")
        .eq("org_id", org_id)
        .eq("user_id", user_id)
        .fetch_optional()
        .await
        .context("Loading membership")?;

    Ok(row.map(|row| {
        row.role.parse().unwrap_or_else(|err| {
            warn!(%org_id, %user_id, error = %err, "Unknown organization role");
            Role::Member
        })
    }))
}

/// Requires `permission` of `user_id` inside `org_id`.
///
/// # Errors
/// [`OrganizationError::Forbidden`] for non-members and roles lacking `permission`.
pub async fn require_permission(
    db: &Database,
    org_id: Uuid,
    user_id: Uuid,
    permission: Permission,
) -> Result<Role, OrganizationError> {
    match member_role(db, org_id, user_id).await? {
        Some(role) if role.allows(permission) => Ok(role),
        Some(role) => Err(OrganizationError::Forbidden {
            message: format!("the {role} role cannot do this").into(),
            context: None,
        }),
        None => Err(OrganizationError::Forbidden {
            message: "not a member of this organization".into(),
            context: None,
        }),
    }
}

/// Whether `actor` may move a member from `current` to `target`. Only owners hand out
/// ownership or change an owner's role.
#[must_use]
pub fn can_assign(actor: Role, current: Option<Role>, target: Role) -> bool {
    let touches_owner = target == Role::Owner || current == Some(Role::Owner);
    actor.allows(Permission::MANAGE_MEMBERS) && (!touches_owner || actor == Role::Owner)
}
