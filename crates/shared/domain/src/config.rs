use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Application configuration. Every section falls back to its defaults.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfigInner {
    pub server: ServerConfig,
    pub site: SiteConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub certificates: CertificateConfig,
    pub exam: ExamConfig,
    pub payments: PaymentsConfig,
    pub mailer: MailerConfig,
    pub logging: LoggingConfig,
}

/// Arc-wrapped config, cheap to clone into handlers and slices.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(flatten, default)]
    inner: Arc<ApiConfigInner>,
}

impl Deref for ApiConfig {
    type Target = ApiConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ApiConfig {
    fn deref_mut(&mut self) -> &mut ApiConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// A credential that never shows up in `Debug` output.
#[derive(Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() { f.write_str("Secret(<empty>)") } else { f.write_str("Secret(***)") }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub ssl: Option<SslConfig>,
}

/// TLS certificate/key paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SslConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Public site, used to build absolute links in emails and Stripe redirects.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    pub name: String,
}

/// Supabase project (`PostgREST` + `GoTrue`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub anon_key: Secret,
    pub service_role_key: Secret,
    pub timeout_seconds: u64,
    pub token_cache_capacity: u64,
    pub token_cache_ttl_seconds: u64,
}

/// Auth cookies.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub access_cookie: String,
    pub refresh_cookie: String,
    pub secure: bool,
    pub refresh_max_age_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CertificateConfig {
    /// HMAC key for certificate signatures. Must be set outside development.
    pub secret: Secret,
    pub validity_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExamConfig {
    pub question_count: usize,
    pub time_limit_minutes: i64,
}

/// Stripe.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    pub api_url: String,
    pub secret_key: Secret,
    pub webhook_secret: Secret,
    pub webhook_tolerance_seconds: i64,
    pub currency: String,
    pub success_path: String,
    pub cancel_path: String,
}

/// Transactional email API. Without an API key messages are logged and skipped.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailerConfig {
    pub api_url: String,
    pub api_key: Option<Secret>,
    pub from: String,
    pub sales_inbox: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub filter: Option<String>,
    pub console: bool,
    pub json: bool,
    pub directory: Option<PathBuf>,
}

// --- Default ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 4583, ssl: None }
    }
}

impl Default for SslConfig {
    fn default() -> Self {
        Self { cert: PathBuf::from("cert.pem"), key: PathBuf::from("key.pem") }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_owned(),
            name: "Flat Earth Equipment".to_owned(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_owned(),
            anon_key: Secret::default(),
            service_role_key: Secret::default(),
            timeout_seconds: 15,
            token_cache_capacity: 10_000,
            token_cache_ttl_seconds: 300,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_cookie: "sb-access-token".to_owned(),
            refresh_cookie: "sb-refresh-token".to_owned(),
            secure: true,
            refresh_max_age_days: 30,
        }
    }
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self { secret: Secret::default(), validity_days: 1095 }
    }
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self { question_count: 50, time_limit_minutes: 60 }
    }
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.stripe.com".to_owned(),
            secret_key: Secret::default(),
            webhook_secret: Secret::default(),
            webhook_tolerance_seconds: 300,
            currency: "usd".to_owned(),
            success_path: "/checkout/success".to_owned(),
            cancel_path: "/checkout/cancel".to_owned(),
        }
    }
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.resend.com/emails".to_owned(),
            api_key: None,
            from: "Flat Earth Equipment <no-reply@flatearthequipment.com>".to_owned(),
            sales_inbox: "sales@flatearthequipment.com".to_owned(),
            timeout_seconds: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            filter: None,
            console: true,
            json: false,
            directory: None,
        }
    }
}
