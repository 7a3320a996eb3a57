use feq_kernel::server::ApiError;
use std::borrow::Cow;

/// Storefront error type.
#[feq_derive::feq_error]
pub enum CommerceError {
    #[error("Payments configuration error{}: {message}", format_context(.context))]
    Config { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[status(400)]
    #[error("Invalid request{}: {message}", format_context(.context))]
    Invalid { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[status(403)]
    #[error("Forbidden{}: {message}", format_context(.context))]
    Forbidden { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[status(404)]
    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Webhook signature missing, malformed, stale or wrong.
    #[status(400)]
    #[error("Invalid webhook signature{}: {message}", format_context(.context))]
    Signature { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The payment provider refused the request.
    #[status(502)]
    #[error("Payment provider error{} ({status}): {message}", format_context(.context))]
    Provider { status: u16, message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[status(source)]
    #[error("Storefront storage error{}: {source}", format_context(.context))]
    Database { source: feq_database::DatabaseError, context: Option<Cow<'static, str>> },

    #[status(source)]
    #[error("Organization error{}: {source}", format_context(.context))]
    Organization {
        source: feq_organization::OrganizationError,
        context: Option<Cow<'static, str>>,
    },

    #[status(502)]
    #[error("Payment provider unreachable{}: {source}", format_context(.context))]
    Http { source: reqwest::Error, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl CommerceError {
    pub(crate) fn signature(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Signature { message: message.into(), context: None }
    }

    pub(crate) fn invalid(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Invalid { message: message.into(), context: None }
    }

    pub(crate) fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound { message: message.into(), context: None }
    }
}

impl From<CommerceError> for ApiError {
    fn from(err: CommerceError) -> Self {
        Self::from_status(err.status_code(), &err)
    }
}
