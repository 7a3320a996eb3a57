use feq_kernel::server::ApiError;
use std::borrow::Cow;

/// Training error type.
#[feq_derive::feq_error]
pub enum TrainingError {
    /// Someone else's enrollment or session, a locked module, or a missing permission.
    #[status(403)]
    #[error("Forbidden{}: {message}", format_context(.context))]
    Forbidden { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[status(404)]
    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The request does not fit the current state (exam already submitted, expired, ...).
    #[status(409)]
    #[error("Conflict{}: {message}", format_context(.context))]
    Conflict { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[status(400)]
    #[error("Invalid request{}: {message}", format_context(.context))]
    Invalid { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[status(source)]
    #[error("Training storage error{}: {source}", format_context(.context))]
    Database { source: feq_database::DatabaseError, context: Option<Cow<'static, str>> },

    #[status(source)]
    #[error("Certificate error{}: {source}", format_context(.context))]
    Certificate { source: feq_certificates::CertificateError, context: Option<Cow<'static, str>> },

    #[status(source)]
    #[error("Organization error{}: {source}", format_context(.context))]
    Organization {
        source: feq_organization::OrganizationError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl TrainingError {
    pub(crate) fn forbidden(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Forbidden { message: message.into(), context: None }
    }

    pub(crate) fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound { message: message.into(), context: None }
    }

    pub(crate) fn conflict(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Conflict { message: message.into(), context: None }
    }
}

impl From<TrainingError> for ApiError {
    fn from(err: TrainingError) -> Self {
        Self::from_status(err.status_code(), &err)
    }
}
