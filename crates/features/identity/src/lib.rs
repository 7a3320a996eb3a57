//! Identity feature slice.
//!
//! Passwords and tokens are handled by the hosted auth service; this slice only moves
//! tokens between the auth service and `HttpOnly` cookies and resolves the current user
//! of a request through [`CurrentUser`].

mod error;
mod extract;
mod handlers;

pub use crate::error::{IdentityError, IdentityErrorExt};
pub use crate::extract::{CurrentUser, access_token};
pub use crate::handlers::{LoginRequest, LoginResponse, SessionUser};

use feq_kernel::domain::config::ApiConfig;
use feq_kernel::domain::registry::InitializedSlice;
use feq_kernel::server::ApiState;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Identity feature state
#[feq_derive::feq_slice]
pub struct Identity {
    /// Cookie carrying the access token of browser sessions.
    pub access_cookie: String,
}

/// Initialize the identity feature.
pub fn init(config: &ApiConfig) -> InitializedSlice {
    let session = &config.session;
    if !session.secure {
        tracing::warn!("Session cookies are not marked Secure; use only for local development");
    }
    tracing::info!(cookie = %session.access_cookie, "Identity slice initialized");

    Identity::new(IdentityInner { access_cookie: session.access_cookie.clone() }).into_slice()
}

/// Sign-in, sign-out and session routes.
pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::login_handler))
        .routes(routes!(handlers::logout_handler))
        .routes(routes!(handlers::session_handler))
}
