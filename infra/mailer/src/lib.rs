//! # Mailer
//!
//! Sends transactional email through an HTTP API accepting
//! `{from, to, subject, html}` with a bearer key (Resend compatible).
//!
//! A mailer without an API key is valid: every message is logged and skipped, so
//! development setups and tests never reach the network.
//!
//! ```rust,no_run
//! use feq_mailer::{Email, Mailer};
//!
//! # async fn run() -> Result<(), feq_mailer::MailerError> {
//! let mailer = Mailer::builder().from("Sales <sales@example.com>").init()?;
//! let email = Email::new("buyer@example.com", "Your rental request")
//!     .html(format!("<p>Hello {}</p>", feq_mailer::escape_html("<Ann>")));
//! mailer.send_or_log(&email).await;
//! # Ok(())
//! # }
//! ```

mod error;

pub use crate::error::{MailerError, MailerErrorExt};

use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

const DEFAULT_API_URL: &str = "https://api.resend.com/emails";

/// A message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub reply_to: Option<String>,
}

impl Email {
    pub fn new(to: impl Into<String>, subject: impl Into<String>) -> Self {
        Self { to: vec![to.into()], subject: subject.into(), html: String::new(), reply_to: None }
    }

    #[must_use]
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = html.into();
        self
    }

    #[must_use]
    pub fn reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to = Some(address.into());
        self
    }
}

/// Outcome of [`Mailer::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Accepted by the API, with its message id when reported.
    Sent(Option<String>),
    /// No API key configured.
    Skipped,
}

#[derive(Serialize)]
struct Outgoing<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

#[derive(Deserialize)]
struct Accepted {
    id: Option<String>,
}

#[derive(Debug)]
pub struct MailerInner {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
}

/// Cloneable email client.
#[derive(Debug, Clone)]
pub struct Mailer {
    inner: Arc<MailerInner>,
}

impl Deref for Mailer {
    type Target = MailerInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[must_use = "builders do nothing unless you call .init()"]
#[derive(Debug)]
pub struct MailerBuilder {
    api_url: String,
    api_key: Option<String>,
    from: Option<String>,
    timeout: Duration,
}

impl Default for MailerBuilder {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            api_key: None,
            from: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl MailerBuilder {
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Blank keys are treated as absent.
    pub fn api_key(mut self, key: Option<impl Into<String>>) -> Self {
        self.api_key = key.map(Into::into).filter(|k: &String| !k.trim().is_empty());
        self
    }

    pub fn from(mut self, sender: impl Into<String>) -> Self {
        self.from = Some(sender.into());
        self
    }

    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// # Errors
    /// [`MailerError::Config`] without a sender address.
    pub fn init(self) -> Result<Mailer, MailerError> {
        let from = self.from.filter(|f| f.contains('@')).ok_or_else(|| MailerError::Config {
            message: "a sender address is required".into(),
            context: None,
        })?;
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .context("Building HTTP client")?;

        if self.api_key.is_none() {
            info!("Mailer has no API key; emails will be logged and skipped");
        }

        Ok(Mailer {
            inner: Arc::new(MailerInner { http, api_url: self.api_url, api_key: self.api_key, from }),
        })
    }
}

impl Mailer {
    pub fn builder() -> MailerBuilder {
        MailerBuilder::default()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.api_key.is_some()
    }

    /// Sends `email`.
    ///
    /// # Errors
    /// [`MailerError::Invalid`] for an email without recipients or subject,
    /// [`MailerError::Rejected`] when the API answers with a non-success status.
    #[instrument(skip(self, email), fields(subject = %email.subject, recipients = email.to.len()))]
    pub async fn send(&self, email: &Email) -> Result<Delivery, MailerError> {
        if email.to.iter().all(|to| !to.contains('@')) || email.subject.trim().is_empty() {
            return Err(MailerError::Invalid {
                message: "an email needs a recipient and a subject".into(),
                context: None,
            });
        }

        let Some(key) = &self.api_key else {
            info!("Email skipped (mailer disabled)");
            return Ok(Delivery::Skipped);
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(key)
            .json(&Outgoing {
                from: &self.from,
                to: &email.to,
                subject: &email.subject,
                html: &email.html,
                reply_to: email.reply_to.as_deref(),
            })
            .send()
            .await
            .context("Posting email")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Rejected {
                status: status.as_u16(),
                message: body.into(),
                context: None,
            });
        }

        let accepted: Option<Accepted> = response.json().await.ok();
        Ok(Delivery::Sent(accepted.and_then(|a| a.id)))
    }

    /// Sends `email`, logging instead of failing. Used where email is a courtesy.
    pub async fn send_or_log(&self, email: &Email) -> Option<Delivery> {
        match self.send(email).await {
            Ok(delivery) => Some(delivery),
            Err(err) => {
                warn!(error = %err, subject = %email.subject, "Email delivery failed");
                None
            },
        }
    }
}

/// Escapes text for interpolation into HTML bodies.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_is_escaped() {
        assert_eq!(escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#), "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;");
    }

    #[test]
    fn sender_is_required() {
        assert!(matches!(Mailer::builder().init(), Err(MailerError::Config { .. })));
        assert!(Mailer::builder().from("nobody").init().is_err());
    }

    #[test]
    fn blank_keys_disable_delivery() {
        let mailer = Mailer::builder().from("a@b.co").api_key(Some("  ")).init().unwrap();
        assert!(!mailer.is_enabled());
    }
}
