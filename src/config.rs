use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DbError, DbResult};
use crate::store::StoreKey;
use crate::sync::SyncTrigger;

// ============================================================================
// Application Configuration
// ============================================================================
//
// Loaded once at startup: optional TOML file first, then environment
// overrides. Routing table and sync rules are immutable afterwards.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Profile selector for the relational store ("development" | "production")
    pub environment: String,
    /// entity name -> owning store
    pub routing: BTreeMap<String, StoreKey>,
    pub sync: SyncConfig,
    pub postgres: PostgresProfiles,
    pub firebase: FirebaseConfig,
    pub auth: AuthConfig,
}

/// Session tokens issued on login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret; login fails with a config error while unset
    pub jwt_secret: Option<String>,
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub enabled: bool,
    pub rules: Vec<SyncRuleConfig>,
}

/// A rule as written in configuration: `{ from, to, fields?, trigger }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRuleConfig {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    pub trigger: SyncTrigger,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresProfiles {
    pub development: PostgresConfig,
    pub production: PostgresConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    /// Takes precedence over the discrete fields when set
    pub connection_string: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub idle_timeout_ms: u64,
    pub acquire_timeout_ms: u64,
    pub ssl: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentMode {
    /// Firebase Realtime Database over REST
    Firebase,
    /// In-process tree, nothing leaves the process
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebaseConfig {
    pub mode: DocumentMode,
    /// Service-account JSON. Absent or incomplete -> stub handle.
    pub service_account_path: Option<PathBuf>,
    pub database_url: String,
    pub storage_bucket: String,
    /// Static token (emulator "owner" or a database secret); skips the OAuth grant
    pub auth_token: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let routing = [
            ("courses", StoreKey::Postgres),
            ("users", StoreKey::Postgres),
            ("lessons", StoreKey::Postgres),
            ("enrollments", StoreKey::Postgres),
            ("quizzes", StoreKey::Postgres),
            ("progress_snapshots", StoreKey::Postgres),
            ("progress", StoreKey::Firebase),
            ("comments", StoreKey::Firebase),
            ("notifications", StoreKey::Firebase),
            ("media", StoreKey::Firebase),
        ]
        .into_iter()
        .map(|(entity, store)| (entity.to_string(), store))
        .collect();

        Self {
            environment: "development".to_string(),
            routing,
            sync: SyncConfig::default(),
            postgres: PostgresProfiles::default(),
            firebase: FirebaseConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rules: vec![
                SyncRuleConfig {
                    from: "postgres.users".to_string(),
                    to: "firebase.users".to_string(),
                    fields: Some(vec!["id".to_string(), "name".to_string(), "avatar".to_string()]),
                    trigger: SyncTrigger::OnCreate,
                },
                SyncRuleConfig {
                    from: "firebase.progress".to_string(),
                    to: "postgres.progress_snapshots".to_string(),
                    fields: None,
                    trigger: SyncTrigger::OnComplete,
                },
            ],
        }
    }
}

impl Default for PostgresProfiles {
    fn default() -> Self {
        Self {
            development: PostgresConfig::default(),
            production: PostgresConfig {
                ssl: true,
                ..PostgresConfig::default()
            },
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            host: "localhost".to_string(),
            port: 5432,
            database: "edumedibor_dev".to_string(),
            user: "postgres".to_string(),
            password: "admin".to_string(),
            max_connections: 20,
            idle_timeout_ms: 30_000,
            acquire_timeout_ms: 5_000,
            ssl: false,
        }
    }
}

impl PostgresConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            mode: DocumentMode::Firebase,
            service_account_path: None,
            database_url: String::new(),
            storage_bucket: String::new(),
            auth_token: None,
            request_timeout_ms: 10_000,
        }
    }
}

impl FirebaseConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl AppConfig {
    /// Reads `path` (TOML) when given, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> DbResult<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    DbError::Config(format!("failed to read {}: {e}", path.display()))
                })?;
                let parsed = Self::from_toml(&raw)?;
                tracing::info!(path = %path.display(), "Loaded configuration file");
                parsed
            }
            None => {
                tracing::info!("No configuration file given, using built-in defaults");
                Self::default()
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> DbResult<Self> {
        toml::from_str(raw).map_err(|e| DbError::Config(format!("invalid TOML: {e}")))
    }

    /// Applies overrides from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            let value = lookup(key);
            if value.is_none() {
                tracing::debug!("{key} not set, keeping configured value");
            }
            value
        };

        if let Some(env) = var("APP_ENV") {
            self.environment = env;
        }
        if let Some(url) = var("DATABASE_URL") {
            self.postgres.production.connection_string = Some(url);
        }
        if let Some(path) = var("FIREBASE_SERVICE_ACCOUNT_KEY_PATH") {
            self.firebase.service_account_path = Some(PathBuf::from(path));
        }
        if let Some(url) = var("FIREBASE_DATABASE_URL") {
            self.firebase.database_url = url;
        }
        if let Some(bucket) = var("FIREBASE_STORAGE_BUCKET") {
            self.firebase.storage_bucket = bucket;
        }
        if let Some(token) = var("FIREBASE_AUTH_TOKEN") {
            self.firebase.auth_token = Some(token);
        }
        if let Some(secret) = var("JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(enabled) = var("SYNC_ENABLED") {
            match enabled.parse::<bool>() {
                Ok(enabled) => self.sync.enabled = enabled,
                Err(e) => tracing::warn!("Invalid SYNC_ENABLED value '{enabled}': {e}"),
            }
        }
    }

    /// The relational profile selected by `environment`.
    pub fn postgres_profile(&self) -> &PostgresConfig {
        match self.environment.as_str() {
            "production" => &self.postgres.production,
            _ => &self.postgres.development,
        }
    }
}
