//! Access tokens for the GitHub REST API.
//!
//! Two sources are supported:
//! - a static token (personal access token or `GITHUB_TOKEN`, handy in development)
//! - GitHub App installation tokens, obtained by signing a short-lived RS256
//!   JWT with the app's private key and exchanging it at
//!   `POST /app/installations/{id}/access_tokens`
//!
//! Installation tokens live for one hour. The provider caches the current
//! token and refreshes it shortly before it expires.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use rollup::{AppId, InstallationId};

/// Tokens are refreshed this long before GitHub says they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

/// GitHub rejects app JWTs that expire more than ten minutes out.
const JWT_LIFETIME_SECS: i64 = 540;

/// Backdates `iat` to tolerate clock drift between us and GitHub.
const JWT_CLOCK_SKEW_SECS: i64 = 60;

/// Failure to obtain an access token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The private key is not a valid RSA PEM key.
    #[error("invalid GitHub App private key: {0}")]
    InvalidKey(String),

    /// The app JWT could not be signed.
    #[error("failed to sign GitHub App JWT: {0}")]
    Signing(String),

    /// The token exchange request could not be sent.
    #[error("installation token request failed: {0}")]
    Transport(String),

    /// GitHub refused the token exchange.
    #[error("installation token request returned status {0}")]
    UnexpectedStatus(u16),

    /// The token exchange response could not be decoded.
    #[error("invalid installation token response: {0}")]
    InvalidResponse(String),
}

// ---------------------------------------------------------------------------
// App credentials
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct Claims {
    iat: i64,
    exp: i64,
    iss: String,
}

/// Identity and signing key of this service's GitHub App installation.
pub struct AppCredentials {
    app_id: AppId,
    installation_id: InstallationId,
    key: EncodingKey,
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("installation_id", &self.installation_id)
            .finish_non_exhaustive()
    }
}

impl AppCredentials {
    /// Parses an RSA private key in PEM format (PKCS#1 or PKCS#8).
    pub fn from_pem(
        app_id: AppId,
        installation_id: InstallationId,
        pem: &[u8],
    ) -> Result<Self, AuthError> {
        let key = EncodingKey::from_rsa_pem(pem).map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        Ok(Self {
            app_id,
            installation_id,
            key,
        })
    }

    pub fn app_id(&self) -> AppId {
        self.app_id
    }

    pub fn installation_id(&self) -> InstallationId {
        self.installation_id
    }

    /// Signs the app JWT used to authenticate as the app itself.
    pub fn jwt(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            iat: now.timestamp() - JWT_CLOCK_SKEW_SECS,
            exp: now.timestamp() + JWT_LIFETIME_SECS,
            iss: self.app_id.to_string(),
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Installation tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct InstallationToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

/// Exchanges app credentials for installation tokens and caches the result.
pub struct InstallationTokenProvider {
    credentials: AppCredentials,
    cache: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for InstallationTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationTokenProvider")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl InstallationTokenProvider {
    pub fn new(credentials: AppCredentials) -> Self {
        Self {
            credentials,
            cache: Mutex::new(None),
        }
    }

    /// Returns a valid installation token, exchanging a new one if needed.
    ///
    /// Concurrent callers wait on the cache lock so only one exchange is in
    /// flight at a time.
    pub async fn token(&self, http: &reqwest::Client, base_url: &str) -> Result<String, AuthError> {
        let mut cache = self.cache.lock().await;
        let now = Utc::now();
        if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh(now)) {
            return Ok(cached.token.clone());
        }

        let installation_id = self.credentials.installation_id();
        debug!(%installation_id, "Requesting installation access token");

        let jwt = self.credentials.jwt(now)?;
        let url = format!("{base_url}/app/installations/{installation_id}/access_tokens");
        let response = http
            .post(url)
            .bearer_auth(jwt)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if response.status() != StatusCode::CREATED {
            return Err(AuthError::UnexpectedStatus(response.status().as_u16()));
        }

        let body: InstallationToken = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        *cache = Some(CachedToken {
            token: body.token.clone(),
            expires_at: body.expires_at,
        });
        Ok(body.token)
    }
}

// ---------------------------------------------------------------------------
// Token source
// ---------------------------------------------------------------------------

/// Where [`crate::GitHubClient`] gets its bearer token from.
pub enum TokenSource {
    /// A fixed token.
    Static(String),
    /// GitHub App installation tokens.
    App(InstallationTokenProvider),
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(_) => f.write_str("Static(<redacted>)"),
            Self::App(provider) => f.debug_tuple("App").field(provider).finish(),
        }
    }
}

impl TokenSource {
    /// Creates a static token source.
    pub fn static_token(token: impl Into<String>) -> Self {
        Self::Static(token.into())
    }

    /// Creates an installation token source from app credentials.
    pub fn app(credentials: AppCredentials) -> Self {
        Self::App(InstallationTokenProvider::new(credentials))
    }

    /// Returns the token to send with the next request.
    pub async fn token(&self, http: &reqwest::Client, base_url: &str) -> Result<String, AuthError> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::App(provider) => provider.token(http, base_url).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_key() {
        let err = AppCredentials::from_pem(AppId::new(1), InstallationId::new(2), b"not a key")
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidKey(_)));
    }

    #[test]
    fn cached_token_goes_stale_before_expiry() {
        let now = Utc::now();
        let token = CachedToken {
            token: "t".into(),
            expires_at: now + Duration::seconds(30),
        };
        assert!(!token.is_fresh(now));

        let token = CachedToken {
            token: "t".into(),
            expires_at: now + Duration::minutes(30),
        };
        assert!(token.is_fresh(now));
    }

    #[test]
    fn static_source_debug_hides_token() {
        let source = TokenSource::static_token("ghp_secret");
        assert!(!format!("{source:?}").contains("ghp_secret"));
    }
}
