//! Facade crate for the Flat Earth Equipment platform.
//! Re-exports domain/kernel primitives and aggregates feature initialization.
//! Keep this crate thin: it composes the feature crates, it does not implement business logic.
//!
//! ## Usage
//! - Call [`init`] to build every feature slice, register them on the `ApiState` builder.
//! - Merge [`api_router`] into the application router.

use feq_database::Database;
pub use feq_domain as domain;
use feq_domain::config::ApiConfig;
use feq_domain::registry::InitializedSlice;
pub use feq_kernel as kernel;
use feq_kernel::server::ApiState;
use std::borrow::Cow;
use utoipa_axum::router::OpenApiRouter;

pub mod server {
    pub mod router {
        pub use feq_kernel::server::router::system_router;
    }
}

/// Feature registry for runtime introspection.
pub mod features {
    pub use feq_audit as audit;
    pub use feq_certificates as certificates;
    pub use feq_commerce as commerce;
    pub use feq_identity as identity;
    pub use feq_organization as organization;
    pub use feq_training as training;

    /// Feature slices wired by [`crate::init`].
    pub const ENABLED: &[&str] =
        &["identity", "audit", "certificates", "organization", "training", "commerce"];

    #[must_use]
    pub fn is_enabled(name: &str) -> bool {
        ENABLED.contains(&name)
    }
}

#[feq_derive::feq_error]
pub enum BootstrapError {
    #[status(source)]
    #[error("Certificates bootstrap failed{}: {source}", format_context(.context))]
    Certificates { source: feq_certificates::CertificateError, context: Option<Cow<'static, str>> },

    #[status(source)]
    #[error("Commerce bootstrap failed{}: {source}", format_context(.context))]
    Commerce { source: feq_commerce::CommerceError, context: Option<Cow<'static, str>> },
}

/// Initialize every feature slice.
///
/// # Errors
/// Fails when a slice rejects its configuration (e.g. a blank certificate secret).
pub fn init(config: &ApiConfig, database: &Database) -> Result<Vec<InitializedSlice>, BootstrapError> {
    let slices = vec![
        features::identity::init(config),
        features::audit::init(database),
        features::certificates::init(config).context("certificates")?,
        features::organization::init(config),
        features::training::init(config),
        features::commerce::init(config).context("commerce")?,
    ];

    tracing::info!(slices = slices.len(), "Feature slices initialized");
    Ok(slices)
}

/// System routes plus every feature router.
pub fn api_router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .merge(server::router::system_router())
        .merge(features::identity::router())
        .merge(features::audit::router())
        .merge(features::certificates::router())
        .merge(features::organization::router())
        .merge(features::training::router())
        .merge(features::commerce::router())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_slice_is_listed() {
        for name in ["identity", "audit", "certificates", "organization", "training", "commerce"] {
            assert!(features::is_enabled(name), "{name}");
        }
        assert!(!features::is_enabled("rentals"));
    }
}
