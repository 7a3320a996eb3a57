//! # Certificates
//!
//! Operator certificates issued when a learner passes the final exam.
//!
//! A certificate is a JSON payload signed with HMAC-SHA256 under a server secret and
//! stored verbatim on its enrollment together with a short public code. Anyone holding
//! the code can check it through `GET /api/certificates/{code}`; a printed payload and
//! signature can be checked through `POST /api/certificates/verify`.

mod error;
mod handlers;
pub mod model;
mod service;
pub mod signing;

pub use crate::error::{CertificateError, CertificateErrorExt};
pub use crate::model::{CertificatePayload, Issued, StoredCertificate};
pub use crate::signing::{CertificateSigner, SignedPayload};

use feq_kernel::domain::config::ApiConfig;
use feq_kernel::domain::registry::InitializedSlice;
use feq_kernel::server::ApiState;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Certificate slice state.
#[feq_derive::feq_slice]
pub struct Certificates {
    pub signer: CertificateSigner,
    pub validity_days: i64,
    pub site_url: String,
}

/// Initializes the slice from `certificates` and `site` settings.
///
/// # Errors
/// [`CertificateError::Config`] when the signing secret is empty.
pub fn init(config: &ApiConfig) -> Result<InitializedSlice, CertificateError> {
    let signer = CertificateSigner::new(config.certificates.secret.expose())?;
    tracing::info!(validity_days = config.certificates.validity_days, "Certificates slice initialized");

    Ok(Certificates::new(CertificatesInner {
        signer,
        validity_days: config.certificates.validity_days,
        site_url: config.site.base_url.clone(),
    })
    .into_slice())
}

/// Public verification routes.
pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::verify_handler))
        .routes(routes!(handlers::lookup_handler))
}
