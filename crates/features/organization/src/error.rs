use feq_kernel::server::ApiError;
use std::borrow::Cow;

/// Organizations error type.
#[feq_derive::feq_error]
pub enum OrganizationError {
    /// Not a member, or the role lacks the permission.
    #[status(403)]
    #[error("Forbidden{}: {message}", format_context(.context))]
    Forbidden { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[status(404)]
    #[error("Not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Every purchased seat for the course is in use.
    #[status(409)]
    #[error("No seats available for this course")]
    NoSeats {},

    #[status(400)]
    #[error("Invalid request{}: {message}", format_context(.context))]
    Invalid { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[status(source)]
    #[error("Organization storage error{}: {source}", format_context(.context))]
    Database { source: feq_database::DatabaseError, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl From<OrganizationError> for ApiError {
    fn from(err: OrganizationError) -> Self {
        Self::from_status(err.status_code(), &err)
    }
}
