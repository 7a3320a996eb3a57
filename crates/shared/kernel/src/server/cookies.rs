//! `Set-Cookie` construction shared by sessions and experiments.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Attributes of a first-party cookie scoped to `/` with `SameSite=Lax`.
#[derive(Debug, Clone, Copy)]
pub struct CookieSpec<'a> {
    pub name: &'a str,
    pub value: &'a str,
    pub max_age_secs: i64,
    pub http_only: bool,
    pub secure: bool,
}

/// Builds the cookie described by `spec`.
#[must_use]
pub fn build(spec: CookieSpec<'_>) -> Cookie<'static> {
    Cookie::build((spec.name.to_owned(), spec.value.to_owned()))
        .path("/")
        .max_age(Duration::seconds(spec.max_age_secs))
        .same_site(SameSite::Lax)
        .http_only(spec.http_only)
        .secure(spec.secure)
        .build()
}

/// A cookie that, handed to `CookieJar::remove`, expires `name` on the client.
#[must_use]
pub fn removal(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_owned(), "")).path("/").build()
}
