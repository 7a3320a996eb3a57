use crate::error::IdentityError;
use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use crate::Identity;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum_extra::extract::CookieJar;
use feq_database::AuthUser;
use feq_kernel::server::{ApiError, ApiState};
use tracing::debug;
use uuid::Uuid;

/// The signed-in user, verified against the auth service.
///
/// The access token comes from `Authorization: Bearer ...` or, for browser requests, the
/// session access cookie. Verified tokens are cached by the database client, so repeated
/// requests do not reach the auth service until the cache entry expires.
///
/// Use `Option<CurrentUser>` on endpoints that also serve anonymous visitors.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: AuthUser,
    pub access_token: String,
}

impl CurrentUser {
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.user.id
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.user.email.as_deref()
    }
}

/// Reads the access token of a request, preferring the bearer header.
#[must_use]
pub fn access_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    bearer.map(str::to_owned).or_else(|| {
        CookieJar::from_headers(headers)
            .get(cookie_name)
            .map(|cookie| cookie.value().to_owned())
            .filter(|token| !token.is_empty())
    })
}

impl FromRequestParts<ApiState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ApiState) -> Result<Self, Self::Rejection> {
        let identity = state.try_get_slice::<Identity>()?;
        let token = access_token(&parts.headers, &identity.access_cookie).ok_or_else(|| {
            IdentityError::Unauthenticated { message: "sign in required".into(), context: None }
        })?;

        let user = state.database.user_for_token(&token).await.map_err(|err| {
            if err.status_code() == StatusCode::UNAUTHORIZED.as_u16() {
                debug!("Access token rejected");
                IdentityError::Unauthenticated { message: "session expired".into(), context: None }
            } else {
                err.into()
            }
        })?;

        Ok(Self { user, access_token: token })
    }
}

impl OptionalFromRequestParts<ApiState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Option<Self>, Self::Rejection> {
        match <Self as FromRequestParts<ApiState>>::from_request_parts(parts, state).await {
            Ok(user) => Ok(Some(user)),
            Err(err) if err.status() == StatusCode::UNAUTHORIZED => Ok(None),
            Err(err) => Err(err),
        }
    }
}
