//! Audit feature slice.
//!
//! Both the audit trail and the client error log are best effort: a failed write is
//! logged and the request carries on.

mod error;
mod handlers;
mod trail;

pub use crate::error::{AuditError, AuditErrorExt};
pub use crate::handlers::ClientErrorReport;
pub use crate::trail::AuditTrail;

use feq_database::Database;
use feq_kernel::domain::registry::InitializedSlice;
use feq_kernel::server::ApiState;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Audit feature state.
#[feq_derive::feq_slice]
pub struct Audit {
    pub trail: AuditTrail,
}

/// Initialize the audit feature.
pub fn init(database: &Database) -> InitializedSlice {
    tracing::info!("Audit slice initialized");
    Audit::new(AuditInner { trail: AuditTrail::new(database.clone()) }).into_slice()
}

/// The registered audit trail, or one bound to the state's database.
#[must_use]
pub fn trail(state: &ApiState) -> AuditTrail {
    state
        .get_slice::<Audit>()
        .map_or_else(|| AuditTrail::new(state.database.clone()), |audit| audit.trail.clone())
}

/// Client error reporting route.
pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new().routes(routes!(handlers::log_error_handler))
}
