//! A/B bucketing persisted in a first-party cookie.

use crate::domain::constants::{AB_VARIANT_COOKIE, AB_VARIANT_MAX_AGE_SECS, SYSTEM_TAG};
use crate::server::cookies::{self, CookieSpec};
use axum::Json;
use axum_extra::extract::CookieJar;
use feq_derive::{api_handler, api_model};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Experiment bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    A,
    B,
    C,
}

impl Variant {
    pub const ALL: [Self; 3] = [Self::A, Self::B, Self::C];

    /// Uniformly random bucket.
    #[must_use]
    pub fn random() -> Self {
        Self::ALL[rand::rng().random_range(0..Self::ALL.len())]
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
            Self::C => "c",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" => Ok(Self::A),
            "b" => Ok(Self::B),
            "c" => Ok(Self::C),
            _ => Err(()),
        }
    }
}

/// Reuses a valid stored bucket, otherwise draws a new one.
///
/// Returns the bucket and whether it was freshly assigned.
#[must_use]
pub fn assign_variant(stored: Option<&str>) -> (Variant, bool) {
    stored
        .and_then(|value| value.parse().ok())
        .map_or_else(|| (Variant::random(), true), |variant| (variant, false))
}

#[api_model]
pub struct VariantResponse {
    pub variant: Variant,
}

#[api_handler(
    get,
    path = "/api/ab",
    responses((status = OK, description = "Current A/B bucket, assigned on first visit", body = VariantResponse)),
    tag = SYSTEM_TAG,
)]
pub(super) async fn variant_handler(jar: CookieJar) -> (CookieJar, Json<VariantResponse>) {
    let (variant, fresh) = assign_variant(jar.get(AB_VARIANT_COOKIE).map(|c| c.value()));

    let jar = if fresh {
        jar.add(cookies::build(CookieSpec {
            name: AB_VARIANT_COOKIE,
            value: variant.as_str(),
            max_age_secs: AB_VARIANT_MAX_AGE_SECS,
            http_only: false,
            secure: false,
        }))
    } else {
        jar
    };

    (jar, Json(VariantResponse { variant }))
}
