use crate::config::ConfigError;
use crate::security::ResourceGuardError;
use crate::server::state::ApiStateError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use feq_database::DatabaseError;
use feq_derive::api_model;
use std::borrow::Cow;
use std::fmt;
use tracing::error;

const GENERIC_MESSAGE: &str = "Internal server error";

/// JSON error body returned by every endpoint.
#[api_model]
pub struct ErrorBody {
    /// Human readable reason
    pub error: String,
}

/// An error ready to be rendered as `{"error": message}` with its HTTP status.
///
/// Server-side failures never expose their details: the full error is logged where the
/// `ApiError` is created and the client only sees a generic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: Cow<'static, str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_MESSAGE)
    }

    /// Converts a slice error reporting `status` (see `feq_error`'s `#[status]`).
    ///
    /// Client errors keep their message; anything else is logged and masked.
    pub fn from_status(status: u16, err: &(impl fmt::Display + ?Sized)) -> Self {
        match StatusCode::from_u16(status) {
            Ok(code) if code.is_client_error() => Self::new(code, err.to_string()),
            _ => {
                error!(status, error = %err, "Request failed");
                Self::internal()
            },
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message.into_owned() })).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        Self::from_status(err.status_code(), &err)
    }
}

impl From<ResourceGuardError> for ApiError {
    fn from(err: ResourceGuardError) -> Self {
        Self::from_status(err.status_code(), &err)
    }
}

impl From<ApiStateError> for ApiError {
    fn from(err: ApiStateError) -> Self {
        Self::from_status(err.status_code(), &err)
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        Self::from_status(err.status_code(), &err)
    }
}
