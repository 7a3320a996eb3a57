use crate::error::IdentityError;
use crate::extract::{CurrentUser, access_token};
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum_extra::extract::CookieJar;
use feq_database::AuthUser;
use feq_derive::{api_handler, api_model};
use feq_kernel::domain::constants::{DEFAULT_AFTER_LOGIN, IDENTITY_TAG};
use feq_kernel::prelude::*;
use feq_kernel::server::cookies::{self, CookieSpec};
use std::borrow::Cow;
use tracing::{info, instrument};
use uuid::Uuid;

const DAY_SECS: i64 = 24 * 60 * 60;

#[api_model]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Same-site path to continue to after signing in
    pub next: Option<String>,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), Cow<'static, str>> {
        validate::email("email", &self.email)?;
        validate::non_blank("password", &self.password)?;
        validate::max_len("password", &self.password, 256)
    }
}

#[api_model]
pub struct SessionUser {
    pub id: Uuid,
    pub email: Option<String>,
}

impl From<&AuthUser> for SessionUser {
    fn from(user: &AuthUser) -> Self {
        Self { id: user.id, email: user.email.clone() }
    }
}

#[api_model]
pub struct LoginResponse {
    /// Where the browser should go next
    pub redirect: String,
    pub user: SessionUser,
}

#[api_model]
pub struct LogoutResponse {
    pub ok: bool,
}

#[api_handler(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = OK, description = "Signed in; session cookies set", body = LoginResponse),
        (status = BAD_REQUEST, description = "Malformed request", body = ErrorBody),
        (status = UNAUTHORIZED, description = "Invalid email or password", body = ErrorBody),
    ),
    tag = IDENTITY_TAG,
)]
#[instrument(skip_all)]
pub(crate) async fn login_handler(
    State(state): State<ApiState>,
    jar: CookieJar,
    ValidJson(body): ValidJson<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let email = body.email.trim().to_lowercase();
    let session = state.database.sign_in_with_password(&email, &body.password).await.map_err(
        |err| -> IdentityError {
            if err.status_code() == 401 { IdentityError::InvalidCredentials {} } else { err.into() }
        },
    )?;

    let cfg = &state.config.session;
    let jar = jar
        .add(cookies::build(CookieSpec {
            name: &cfg.access_cookie,
            value: &session.access_token,
            max_age_secs: session.expires_in.max(0),
            http_only: true,
            secure: cfg.secure,
        }))
        .add(cookies::build(CookieSpec {
            name: &cfg.refresh_cookie,
            value: &session.refresh_token,
            max_age_secs: cfg.refresh_max_age_days * DAY_SECS,
            http_only: true,
            secure: cfg.secure,
        }));

    info!(user_id = %session.user.id, "User signed in");

    Ok((
        jar,
        Json(LoginResponse {
            redirect: safe_next(body.next.as_deref(), DEFAULT_AFTER_LOGIN),
            user: SessionUser::from(&session.user),
        }),
    ))
}

#[api_handler(
    post,
    path = "/api/auth/logout",
    responses((status = OK, description = "Session cookies cleared", body = LogoutResponse)),
    tag = IDENTITY_TAG,
)]
pub(crate) async fn logout_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> (CookieJar, Json<LogoutResponse>) {
    let cfg = &state.config.session;
    if let Some(token) = access_token(&headers, &cfg.access_cookie) {
        state.database.sign_out(&token).await;
    }

    let jar = CookieJar::from_headers(&headers)
        .remove(cookies::removal(&cfg.access_cookie))
        .remove(cookies::removal(&cfg.refresh_cookie));

    (jar, Json(LogoutResponse { ok: true }))
}

#[api_handler(
    get,
    path = "/api/auth/session",
    responses(
        (status = OK, description = "The signed-in user", body = SessionUser),
        (status = UNAUTHORIZED, description = "No valid session", body = ErrorBody),
    ),
    tag = IDENTITY_TAG,
)]
pub(crate) async fn session_handler(current: CurrentUser) -> Json<SessionUser> {
    Json(SessionUser::from(&current.user))
}
