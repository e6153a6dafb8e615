use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::error::{DbError, DbResult};

// ============================================================================
// Realtime Database Credentials
// ============================================================================
//
// Two ways to authorize REST calls:
// - Static token, sent as the `auth` query parameter (emulator, database secret)
// - Service account, exchanged for an OAuth2 access token through the
//   JWT-bearer grant and sent as a Bearer header; cached until shortly
//   before expiry
//
// Streaming requests are redirected to another host, and the redirect drops
// the Authorization header, so a Bearer token travels as `access_token` there.
//
// ============================================================================

const SCOPES: &str =
    "https://www.googleapis.com/auth/firebase.database https://www.googleapis.com/auth/userinfo.email";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub client_email: String,
    #[serde(default)]
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccount {
    pub fn from_file(path: &Path) -> DbResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DbError::Config(format!("failed to read service account {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| DbError::Config(format!("malformed service account {}: {e}", path.display())))
    }

    /// Usable only with a project id, a client email and a private key.
    pub fn is_complete(&self) -> bool {
        !self.project_id.is_empty() && !self.client_email.is_empty() && !self.private_key.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum Credentials {
    Static(String),
    ServiceAccount(ServiceAccount),
}

/// How a token is attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessToken {
    Query(String),
    Bearer(String),
}

impl AccessToken {
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            AccessToken::Query(token) => request.query(&[("auth", token)]),
            AccessToken::Bearer(token) => request.bearer_auth(token),
        }
    }

    /// Query-parameter form only, so the token survives a cross-host redirect.
    pub fn apply_to_stream(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            AccessToken::Query(token) => request.query(&[("auth", token)]),
            AccessToken::Bearer(token) => request.query(&[("access_token", token)]),
        }
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

pub struct TokenProvider {
    credentials: Credentials,
    client: Client,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(credentials: Credentials, client: Client) -> Self {
        Self {
            credentials,
            client,
            cached: RwLock::new(None),
        }
    }

    pub async fn token(&self) -> DbResult<AccessToken> {
        let account = match &self.credentials {
            Credentials::Static(token) => return Ok(AccessToken::Query(token.clone())),
            Credentials::ServiceAccount(account) => account,
        };

        if let Some(cached) = self.cached.read().await.as_ref() {
            if cached.expires_at > Instant::now() + EXPIRY_MARGIN {
                return Ok(AccessToken::Bearer(cached.token.clone()));
            }
        }

        let mut cached = self.cached.write().await;
        // Another caller may have refreshed while we waited for the write lock
        if let Some(existing) = cached.as_ref() {
            if existing.expires_at > Instant::now() + EXPIRY_MARGIN {
                return Ok(AccessToken::Bearer(existing.token.clone()));
            }
        }

        let fresh = self.exchange(account).await?;
        let token = fresh.access_token.clone();
        *cached = Some(CachedToken {
            token: fresh.access_token,
            expires_at: Instant::now() + Duration::from_secs(fresh.expires_in),
        });
        tracing::debug!(client_email = %account.client_email, "Obtained realtime database access token");
        Ok(AccessToken::Bearer(token))
    }

    async fn exchange(&self, account: &ServiceAccount) -> DbResult<TokenResponse> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &account.client_email,
            scope: SCOPES,
            aud: &account.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| DbError::Config(format!("invalid service account key: {e}")))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| DbError::Config(format!("failed to sign token request: {e}")))?;

        let response = self
            .client
            .post(&account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DbError::Document(format!("token exchange failed ({status}): {body}")));
        }
        Ok(response.json().await?)
    }
}
