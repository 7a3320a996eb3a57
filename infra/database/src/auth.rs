//! `GoTrue` password sign-in and access token verification.

use crate::error::{DatabaseError, DatabaseErrorExt};
use crate::Database;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use moka::Expiry;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// A user as reported by `GoTrue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Tokens issued by a successful sign-in.
#[derive(Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: AuthUser,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("expires_in", &self.expires_in)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Cache entry for a verified token. `lifetime` is what is left of the token itself.
#[derive(Debug, Clone)]
pub(crate) struct CachedUser {
    user: AuthUser,
    lifetime: Option<Duration>,
}

/// Expires cached users at the earlier of the cache TTL and the token expiry.
pub(crate) struct TokenExpiry {
    pub(crate) ttl: Duration,
}

impl Expiry<String, CachedUser> for TokenExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedUser,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.lifetime.map_or(self.ttl, |left| left.min(self.ttl)))
    }
}

#[derive(Deserialize)]
struct TokenClaims {
    #[serde(default)]
    exp: Option<i64>,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

impl Database {
    /// Exchanges email and password for a session.
    ///
    /// # Errors
    /// [`DatabaseError::Unauthorized`] for wrong credentials or unconfirmed accounts.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, DatabaseError> {
        let url = format!("{}/token", self.auth_url);
        let response = self
            .http
            .post(url)
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&PasswordGrant { email, password })
            .send()
            .await
            .context("Signing in")?;

        let status = response.status();
        if status.is_client_error() {
            debug!(%status, "Password grant rejected");
            return Err(DatabaseError::Unauthorized {
                message: "Invalid email or password".into(),
                context: None,
            });
        }
        if !status.is_success() {
            return Err(DatabaseError::Upstream {
                status: status.as_u16(),
                message: "Auth service failure".into(),
                context: Some("sign in".into()),
            });
        }

        let session: AuthSession = response.json().await.context("Decoding auth session")?;
        let lifetime = remaining_lifetime(&session.access_token)
            .or_else(|| u64::try_from(session.expires_in).ok().map(Duration::from_secs));
        let entry = CachedUser { user: session.user.clone(), lifetime };
        self.users.insert(token_key(&session.access_token), entry).await;
        Ok(session)
    }

    /// Resolves the user owning `access_token`.
    ///
    /// Verified tokens are cached, keyed by their SHA-256 digest, until the cache TTL or
    /// the token's own `exp` claim runs out, whichever comes first.
    ///
    /// # Errors
    /// [`DatabaseError::Unauthorized`] when the token is expired, revoked or malformed.
    #[instrument(skip_all)]
    pub async fn user_for_token(&self, access_token: &str) -> Result<AuthUser, DatabaseError> {
        if access_token.trim().is_empty() {
            return Err(DatabaseError::Unauthorized {
                message: "Missing access token".into(),
                context: None,
            });
        }

        let lifetime = remaining_lifetime(access_token);
        if lifetime == Some(Duration::ZERO) {
            return Err(DatabaseError::Unauthorized {
                message: "Invalid or expired session".into(),
                context: None,
            });
        }

        let lookup = async {
            let user = self.fetch_user(access_token).await?;
            Ok::<_, DatabaseError>(CachedUser { user, lifetime })
        };
        self.users
            .try_get_with(token_key(access_token), lookup)
            .await
            .map(|entry| entry.user)
            .map_err(|shared: Arc<DatabaseError>| {
                Arc::try_unwrap(shared).unwrap_or_else(|arc| match arc.status_code() {
                    401 => DatabaseError::Unauthorized { message: arc.to_string().into(), context: None },
                    _ => DatabaseError::Internal {
                        message: arc.to_string().into(),
                        context: Some("Shared token lookup failure".into()),
                    },
                })
            })
    }

    /// Revokes the session behind `access_token`. Failures are logged only.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) {
        self.users.invalidate(&token_key(access_token)).await;

        let result = self
            .http
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {},
            Ok(response) => debug!(status = %response.status(), "Sign out not acknowledged"),
            Err(err) => warn!(error = %err, "Sign out request failed"),
        }
    }

    async fn fetch_user(&self, access_token: &str) -> Result<AuthUser, DatabaseError> {
        let response = self
            .http
            .get(format!("{}/user", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .context("Verifying access token")?;

        let status = response.status();
        if status.is_client_error() {
            return Err(DatabaseError::Unauthorized {
                message: "Invalid or expired session".into(),
                context: None,
            });
        }
        if !status.is_success() {
            return Err(DatabaseError::Upstream {
                status: status.as_u16(),
                message: "Auth service failure".into(),
                context: Some("token verification".into()),
            });
        }

        response.json().await.context("Decoding auth user")
    }
}

/// Time left before the `exp` claim of a JWT. `None` when the token carries no readable claim.
fn remaining_lifetime(token: &str) -> Option<Duration> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let exp = serde_json::from_slice::<TokenClaims>(&bytes).ok()?.exp?;
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    Some(Duration::from_secs(u64::try_from(exp).unwrap_or(0).saturating_sub(now)))
}

fn token_key(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
