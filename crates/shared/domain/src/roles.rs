//! Organization roles and the permissions they grant.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Actions a member may perform inside an organization.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permission: u32 {
        const MANAGE_SEATS = 1 << 0;
        const MANAGE_MEMBERS = 1 << 1;
        const VIEW_ROSTER = 1 << 2;
        const EVALUATE_PRACTICAL = 1 << 3;
        const MANAGE_BILLING = 1 << 4;
    }
}

/// Role stored in `org_members.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Trainer,
    Member,
}

impl Role {
    #[must_use]
    pub const fn permissions(self) -> Permission {
        match self {
            Self::Owner => Permission::all(),
            Self::Admin => Permission::MANAGE_SEATS
                .union(Permission::MANAGE_MEMBERS)
                .union(Permission::VIEW_ROSTER)
                .union(Permission::EVALUATE_PRACTICAL),
            Self::Trainer => Permission::VIEW_ROSTER.union(Permission::EVALUATE_PRACTICAL),
            Self::Member => Permission::empty(),
        }
    }

    #[must_use]
    pub const fn allows(self, permission: Permission) -> bool {
        self.permissions().contains(permission)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Trainer => "trainer",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown role name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "trainer" => Ok(Self::Trainer),
            "member" => Ok(Self::Member),
            other => Err(UnknownRole(other.to_owned())),
        }
    }
}
