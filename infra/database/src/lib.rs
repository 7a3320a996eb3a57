//! # Database Infrastructure
//!
//! Thin typed client for a hosted Postgres exposed through `PostgREST` (tables and RPC) and
//! `GoTrue` (authentication). Durability, uniqueness, row level security and atomic
//! multi-row changes stay in the database; this crate only shapes requests and maps answers.
//!
//! Three credentials are available, in increasing privilege:
//! * [`Database::anon`] - public reads allowed by row level security,
//! * [`Database::as_user`] - the signed-in user's access token,
//! * [`Database::service`] - the service role, bypassing row level security.
//!
//! ## Example
//!
//! ```rust,no_run
//! use feq_database::{Database, DatabaseError};
//! use serde_json::Value;
//!
//! # async fn run() -> Result<(), DatabaseError> {
//! let db = Database::builder()
//!     .url("https://project.supabase.co")
//!     .anon_key("anon")
//!     .service_role_key("service")
//!     .init()?;
//!
//! let parts: Vec<Value> = db.anon().from("parts").eq("in_stock", true).limit(10).fetch().await?;
//! # Ok(())
//! # }
//! ```

mod auth;
mod error;
mod rest;

pub use crate::auth::{AuthSession, AuthUser};

use crate::auth::{CachedUser, TokenExpiry};
pub use crate::error::{DatabaseError, DatabaseErrorExt};
pub use crate::rest::{Client, Page, Query, Returning};

use moka::future::Cache;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const REST_PATH: &str = "/rest/v1";
const AUTH_PATH: &str = "/auth/v1";

/// Shared state of a [`Database`] handle.
#[derive(Debug)]
pub struct DatabaseInner {
    http: reqwest::Client,
    rest_url: String,
    auth_url: String,
    anon_key: String,
    service_role_key: String,
    users: Cache<String, CachedUser>,
}

/// Cloneable handle to the hosted database.
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::default()
    }

    /// Client using the public anon key.
    #[must_use]
    pub fn anon(&self) -> Client<'_> {
        Client::new(&self.inner, &self.inner.anon_key, &self.inner.anon_key)
    }

    /// Client acting as the user owning `access_token`; row level security applies.
    #[must_use]
    pub fn as_user<'a>(&'a self, access_token: &'a str) -> Client<'a> {
        Client::new(&self.inner, &self.inner.anon_key, access_token)
    }

    /// Client using the service role. Reserve for server-side bookkeeping.
    #[must_use]
    pub fn service(&self) -> Client<'_> {
        Client::new(&self.inner, &self.inner.service_role_key, &self.inner.service_role_key)
    }
}

impl Deref for Database {
    type Target = DatabaseInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Builder for [`Database`]. Building performs no network I/O.
#[must_use = "builders do nothing unless you call .init()"]
#[derive(Debug)]
pub struct DatabaseBuilder {
    url: Option<String>,
    anon_key: Option<String>,
    service_role_key: Option<String>,
    timeout: Duration,
    cache_capacity: u64,
    cache_ttl: Duration,
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            service_role_key: None,
            timeout: Duration::from_secs(15),
            cache_capacity: 10_000,
            cache_ttl: Duration::from_secs(300),
        }
    }
}

impl DatabaseBuilder {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn anon_key(mut self, key: impl Into<String>) -> Self {
        self.anon_key = Some(key.into());
        self
    }

    pub fn service_role_key(mut self, key: impl Into<String>) -> Self {
        self.service_role_key = Some(key.into());
        self
    }

    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bounds the verified access token cache.
    pub const fn token_cache(mut self, capacity: u64, ttl: Duration) -> Self {
        self.cache_capacity = capacity;
        self.cache_ttl = ttl;
        self
    }

    /// Validates the settings and prepares the HTTP client.
    ///
    /// # Errors
    /// [`DatabaseError::Config`] when the URL or a key is missing, or the HTTP client cannot
    /// be created.
    pub fn init(self) -> Result<Database, DatabaseError> {
        let url = required(self.url, "url")?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(DatabaseError::Config {
                message: format!("url must be http(s), got '{url}'").into(),
                context: None,
            });
        }
        let anon_key = required(self.anon_key, "anon_key")?;
        let service_role_key = required(self.service_role_key, "service_role_key")?;

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .context("Building HTTP client")?;

        let base = url.trim_end_matches('/');
        let users = Cache::builder()
            .max_capacity(self.cache_capacity)
            .expire_after(TokenExpiry { ttl: self.cache_ttl })
            .build();

        info!(url = %base, "Database client ready");

        Ok(Database {
            inner: Arc::new(DatabaseInner {
                http,
                rest_url: format!("{base}{REST_PATH}"),
                auth_url: format!("{base}{AUTH_PATH}"),
                anon_key,
                service_role_key,
                users,
            }),
        })
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, DatabaseError> {
    value.filter(|v| !v.trim().is_empty()).ok_or_else(|| DatabaseError::Config {
        message: format!("{name} is required").into(),
        context: None,
    })
}
