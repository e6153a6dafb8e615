use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{BackendKind, DocPath, DocumentBackend, Subscription};
use crate::error::{DbError, DbResult};
use crate::store::StoreKey;

/// Stand-in handle used when no usable credentials are configured.
/// Construction always succeeds; every operation is rejected.
#[derive(Debug, Default)]
pub struct StubBackend;

impl StubBackend {
    fn reject<T>(&self, operation: &str, path: &DocPath) -> DbResult<T> {
        tracing::debug!(operation, path = %path, "Document store in stub mode, rejecting");
        Err(DbError::NotConnected(StoreKey::Firebase))
    }
}

#[async_trait]
impl DocumentBackend for StubBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Stub
    }

    async fn once(&self, path: &DocPath) -> DbResult<Value> {
        self.reject("once", path)
    }

    async fn set(&self, path: &DocPath, _value: Value) -> DbResult<()> {
        self.reject("set", path)
    }

    async fn update(&self, path: &DocPath, _fields: Map<String, Value>) -> DbResult<()> {
        self.reject("update", path)
    }

    async fn push(&self, path: &DocPath, _value: Value) -> DbResult<String> {
        self.reject("push", path)
    }

    async fn remove(&self, path: &DocPath) -> DbResult<()> {
        self.reject("remove", path)
    }

    async fn subscribe(&self, path: &DocPath) -> DbResult<Subscription> {
        self.reject("subscribe", path)
    }
}
