use feq_kernel::server::ApiError;
use std::borrow::Cow;

/// A specialized [`IdentityError`] enum of this crate.
#[feq_derive::feq_error]
pub enum IdentityError {
    /// Wrong email or password.
    #[status(401)]
    #[error("Invalid email or password")]
    InvalidCredentials {},
    /// Missing or rejected access token.
    #[status(401)]
    #[error("Authentication required{}: {message}", format_context(.context))]
    Unauthenticated { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
    #[status(source)]
    #[error("Identity backend error{}: {source}", format_context(.context))]
    Database { source: feq_database::DatabaseError, context: Option<Cow<'static, str>> },
    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal identity error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        Self::from_status(err.status_code(), &err)
    }
}
