// ============================================================================
// Store Adapters
// ============================================================================
//
// One adapter per backend. Each memoizes a single live handle and connects on
// first use: `get_instance()` is `connect()` for every adapter, so callers
// never have to order connect calls themselves.
//
// ============================================================================

pub mod document;
mod handle;
mod key;
mod postgres;

use async_trait::async_trait;
use std::sync::Arc;

pub use document::{DocPath, DocumentAdapter, DocumentBackend, DocumentHandle, Subscription};
pub use handle::HandleCell;
pub use key::{EntityRef, StoreKey};
pub use postgres::PostgresAdapter;

use crate::error::DbResult;
use crate::metrics::Metrics;

#[async_trait]
pub trait StoreAdapter: Send + Sync {
    type Handle: Clone + Send + Sync + 'static;

    fn key(&self) -> StoreKey;

    /// Open the handle, or return the one already open.
    async fn connect(&self) -> DbResult<Self::Handle>;

    /// Release the handle. No-op when not connected.
    async fn disconnect(&self);

    /// Memoized handle; connects on first call.
    async fn get_instance(&self) -> DbResult<Self::Handle> {
        self.connect().await
    }

    async fn is_connected(&self) -> bool;
}

/// Lets the router warm up a store without knowing its handle type.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn ensure_connected(&self, store: StoreKey) -> DbResult<()>;
}

/// The process-wide set of adapters.
pub struct Stores {
    pub postgres: Arc<PostgresAdapter>,
    pub document: Arc<DocumentAdapter>,
    metrics: Option<Arc<Metrics>>,
}

impl Stores {
    pub fn new(postgres: Arc<PostgresAdapter>, document: Arc<DocumentAdapter>) -> Self {
        Self {
            postgres,
            document,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn is_connected(&self, store: StoreKey) -> bool {
        match store {
            StoreKey::Postgres => self.postgres.is_connected().await,
            StoreKey::Firebase => self.document.is_connected().await,
        }
    }

    /// Connect every store. Failures are logged, never returned: entities
    /// on healthy stores stay usable.
    pub async fn connect_all(&self) {
        for store in StoreKey::ALL {
            if let Err(e) = self.ensure_connected(store).await {
                tracing::warn!(store = %store, error = %e, "Store unavailable at startup");
            }
        }
    }

    pub async fn disconnect_all(&self) {
        self.postgres.disconnect().await;
        self.document.disconnect().await;
    }
}

#[async_trait]
impl StoreConnector for Stores {
    async fn ensure_connected(&self, store: StoreKey) -> DbResult<()> {
        let result = match store {
            StoreKey::Postgres => self.postgres.connect().await.map(|_| ()),
            StoreKey::Firebase => self.document.connect().await.map(|_| ()),
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_store_connect(store, result.is_ok());
        }
        result
    }
}
