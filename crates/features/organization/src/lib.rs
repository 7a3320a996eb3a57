//! Organizations feature slice.
//!
//! Companies buy training seats in bulk and hand them to their operators. Seat counts
//! and invitation claims are changed only through database functions, which keeps
//! allocation atomic without any coordination in this process.

mod error;
mod handlers;
pub mod membership;
pub mod model;
mod service;

pub use crate::error::{OrganizationError, OrganizationErrorExt};
pub use crate::membership::{member_role, require_permission};

use feq_kernel::domain::config::ApiConfig;
use feq_kernel::domain::registry::InitializedSlice;
use feq_kernel::server::ApiState;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Organization feature state.
#[feq_derive::feq_slice]
pub struct Organization {
    pub site_url: String,
}

impl OrganizationInner {
    /// Page where an invitee claims a seat.
    #[must_use]
    pub fn claim_url(&self, code: &str) -> String {
        format!("{}/claim?code={code}", self.site_url.trim_end_matches('/'))
    }
}

/// Initialize the organization feature.
pub fn init(config: &ApiConfig) -> InitializedSlice {
    tracing::info!("Organization slice initialized");
    Organization::new(OrganizationInner { site_url: config.site.base_url.clone() }).into_slice()
}

/// Seat, member, roster and invitation routes.
pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::seats_handler))
        .routes(routes!(handlers::members_handler, handlers::add_member_handler))
        .routes(routes!(handlers::roster_handler))
        .routes(routes!(handlers::invite_handler))
        .routes(routes!(handlers::claim_handler))
}
