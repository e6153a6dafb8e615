// ============================================================================
// Document / Real-Time Store
// ============================================================================
//
// Path-addressed JSON tree with live subscriptions. The adapter hands out one
// shared `DocumentHandle`; which backend sits behind it is decided once, at
// connect time:
// - firebase: REST backend, needs a database URL and credentials
// - memory:   in-process tree (local development, tests)
// - stub:     credentials missing or incomplete; every call is rejected
//
// ============================================================================

mod auth;
mod firebase;
mod memory;
mod path;
mod push_id;
mod sse;
mod stub;
mod subscription;
mod tree;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

pub use auth::{AccessToken, Credentials, ServiceAccount, TokenProvider};
pub use firebase::FirebaseRestBackend;
pub use memory::MemoryBackend;
pub use path::DocPath;
pub use stub::StubBackend;
pub use subscription::Subscription;

use super::{HandleCell, StoreAdapter, StoreKey};
use crate::config::{DocumentMode, FirebaseConfig};
use crate::error::DbResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Firebase,
    Memory,
    Stub,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Firebase => "firebase",
            BackendKind::Memory => "memory",
            BackendKind::Stub => "stub",
        })
    }
}

/// Operations every document backend supports.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Value at `path`, `Value::Null` when nothing is stored there.
    async fn once(&self, path: &DocPath) -> DbResult<Value>;

    /// Replace the value at `path` (null deletes).
    async fn set(&self, path: &DocPath, value: Value) -> DbResult<()>;

    /// Merge `fields` into `path`. Keys may be relative paths (`a/b`).
    async fn update(&self, path: &DocPath, fields: Map<String, Value>) -> DbResult<()>;

    /// Append `value` under a new time-ordered key; returns the key.
    async fn push(&self, path: &DocPath, value: Value) -> DbResult<String>;

    async fn remove(&self, path: &DocPath) -> DbResult<()>;

    async fn subscribe(&self, path: &DocPath) -> DbResult<Subscription>;
}

pub type DocumentHandle = Arc<dyn DocumentBackend>;

pub struct DocumentAdapter {
    config: FirebaseConfig,
    handle: HandleCell<DocumentHandle>,
}

impl DocumentAdapter {
    pub fn new(config: FirebaseConfig) -> Self {
        Self {
            config,
            handle: HandleCell::new(),
        }
    }

    /// Adapter backed by the in-process tree.
    pub fn in_memory() -> Self {
        Self::new(FirebaseConfig {
            mode: DocumentMode::Memory,
            ..FirebaseConfig::default()
        })
    }

    pub fn storage_bucket(&self) -> &str {
        &self.config.storage_bucket
    }

    /// The live handle without connecting.
    pub async fn current_handle(&self) -> Option<DocumentHandle> {
        self.handle.current().await
    }

    fn open_backend(&self) -> DbResult<DocumentHandle> {
        if self.config.mode == DocumentMode::Memory {
            tracing::info!("📦 Document store running in memory");
            return Ok(Arc::new(MemoryBackend::new()));
        }

        let Some(credentials) = self.resolve_credentials() else {
            return Ok(Arc::new(StubBackend));
        };
        if self.config.database_url.is_empty() {
            tracing::warn!("Firebase database URL not configured – using stub document store");
            return Ok(Arc::new(StubBackend));
        }

        let timeout = self.config.request_timeout();
        let token_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::error::DbError::Config(format!("failed to create HTTP client: {e}")))?;
        let backend = FirebaseRestBackend::new(
            &self.config.database_url,
            TokenProvider::new(credentials, token_client),
            timeout,
        )?;

        tracing::info!(database_url = %self.config.database_url, "✅ Firebase connected successfully");
        Ok(Arc::new(backend))
    }

    fn resolve_credentials(&self) -> Option<Credentials> {
        if let Some(token) = self.config.auth_token.as_ref().filter(|t| !t.is_empty()) {
            return Some(Credentials::Static(token.clone()));
        }

        let Some(path) = self.config.service_account_path.as_ref() else {
            tracing::warn!("Firebase service account not provided – skipping Firebase init");
            return None;
        };

        match ServiceAccount::from_file(path) {
            Ok(account) if account.is_complete() => Some(Credentials::ServiceAccount(account)),
            Ok(_) => {
                tracing::warn!(path = %path.display(), "Firebase service account incomplete – skipping Firebase init");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load Firebase service account file");
                None
            }
        }
    }
}

#[async_trait]
impl StoreAdapter for DocumentAdapter {
    type Handle = DocumentHandle;

    fn key(&self) -> StoreKey {
        StoreKey::Firebase
    }

    async fn connect(&self) -> DbResult<DocumentHandle> {
        self.handle.get_or_connect(|| async { self.open_backend() }).await
    }

    async fn disconnect(&self) {
        if let Some(handle) = self.handle.take().await {
            tracing::info!(backend = %handle.kind(), "Document store handle released");
        }
    }

    async fn is_connected(&self) -> bool {
        self.handle.is_set().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_missing_credentials_degrade_to_stub() {
        let adapter = DocumentAdapter::new(FirebaseConfig {
            database_url: "https://lms.firebaseio.com".to_string(),
            ..FirebaseConfig::default()
        });

        let handle = adapter.get_instance().await.unwrap();
        assert_eq!(handle.kind(), BackendKind::Stub);

        let err = handle.once(&DocPath::parse("progress").unwrap()).await.unwrap_err();
        assert!(matches!(err, crate::error::DbError::NotConnected(StoreKey::Firebase)));
    }

    #[tokio::test]
    async fn test_incomplete_service_account_degrades_to_stub() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"client_email": "svc@x"}}"#).unwrap();

        let adapter = DocumentAdapter::new(FirebaseConfig {
            service_account_path: Some(file.path().to_path_buf()),
            database_url: "https://lms.firebaseio.com".to_string(),
            ..FirebaseConfig::default()
        });
        assert_eq!(adapter.connect().await.unwrap().kind(), BackendKind::Stub);
    }

    #[tokio::test]
    async fn test_unreadable_service_account_degrades_to_stub() {
        let adapter = DocumentAdapter::new(FirebaseConfig {
            service_account_path: Some(PathBuf::from("/nonexistent/firebase.json")),
            database_url: "https://lms.firebaseio.com".to_string(),
            ..FirebaseConfig::default()
        });
        assert_eq!(adapter.connect().await.unwrap().kind(), BackendKind::Stub);
    }

    #[tokio::test]
    async fn test_static_token_selects_rest_backend() {
        let adapter = DocumentAdapter::new(FirebaseConfig {
            auth_token: Some("owner".to_string()),
            database_url: "http://127.0.0.1:9000".to_string(),
            ..FirebaseConfig::default()
        });
        assert_eq!(adapter.connect().await.unwrap().kind(), BackendKind::Firebase);
    }

    #[tokio::test]
    async fn test_get_instance_returns_same_handle() {
        let adapter = DocumentAdapter::in_memory();
        assert!(!adapter.is_connected().await);

        let first = adapter.get_instance().await.unwrap();
        let second = adapter.connect().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        adapter.disconnect().await;
        adapter.disconnect().await;
        assert!(!adapter.is_connected().await);

        let third = adapter.get_instance().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[tokio::test]
    async fn test_concurrent_connect_yields_one_handle() {
        let adapter = Arc::new(DocumentAdapter::in_memory());
        let handles = futures_util::future::join_all((0..8).map(|_| {
            let adapter = adapter.clone();
            async move { adapter.connect().await.unwrap() }
        }))
        .await;
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
    }
}
