use feq_kernel::server::ApiError;
use std::borrow::Cow;

/// Errors of the certificate slice.
#[feq_derive::feq_error]
pub enum CertificateError {
    /// Signing secret missing.
    #[error("Certificate configuration error{}: {message}", format_context(.context))]
    Config { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[status(404)]
    #[error("Certificate not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The enrollment has not passed its exam.
    #[status(409)]
    #[error("Certificate not available{}: {message}", format_context(.context))]
    NotEligible { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[status(400)]
    #[error("Invalid certificate request{}: {message}", format_context(.context))]
    Invalid { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[status(source)]
    #[error("Certificate storage error{}: {source}", format_context(.context))]
    Database { source: feq_database::DatabaseError, context: Option<Cow<'static, str>> },

    #[error("Certificate encoding error{}: {source}", format_context(.context))]
    Encoding { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Internal certificate error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl From<CertificateError> for ApiError {
    fn from(err: CertificateError) -> Self {
        Self::from_status(err.status_code(), &err)
    }
}
