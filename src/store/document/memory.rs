use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock};
use tokio::sync::{broadcast, mpsc};

use super::push_id::PushIdGenerator;
use super::{tree, BackendKind, DocPath, DocumentBackend, Subscription};
use crate::error::{DbError, DbResult};

// ============================================================================
// In-Memory Document Backend
// ============================================================================
//
// Whole tree lives in one JSON value guarded by a lock. Every write bumps a
// broadcast notification; subscribers re-read their path and emit only when
// the value at that path actually changed.
//
// ============================================================================

const SUBSCRIPTION_BUFFER: usize = 32;

struct MemoryTree {
    root: RwLock<Value>,
    changes: broadcast::Sender<()>,
}

impl MemoryTree {
    fn read(&self, path: &DocPath) -> DbResult<Value> {
        let root = self
            .root
            .read()
            .map_err(|_| DbError::Document("memory tree lock poisoned".to_string()))?;
        Ok(tree::get_at(&root, path.segments()))
    }

    fn write<F>(&self, mutate: F) -> DbResult<()>
    where
        F: FnOnce(&mut Value),
    {
        {
            let mut root = self
                .root
                .write()
                .map_err(|_| DbError::Document("memory tree lock poisoned".to_string()))?;
            mutate(&mut root);
        }
        // No receivers is fine
        let _ = self.changes.send(());
        Ok(())
    }
}

pub struct MemoryBackend {
    tree: Arc<MemoryTree>,
    push_ids: PushIdGenerator,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            tree: Arc::new(MemoryTree {
                root: RwLock::new(Value::Null),
                changes,
            }),
            push_ids: PushIdGenerator::new(),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn once(&self, path: &DocPath) -> DbResult<Value> {
        self.tree.read(path)
    }

    async fn set(&self, path: &DocPath, value: Value) -> DbResult<()> {
        self.tree.write(|root| tree::set_at(root, path.segments(), value))
    }

    async fn update(&self, path: &DocPath, fields: Map<String, Value>) -> DbResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        self.tree.write(|root| tree::update_at(root, path.segments(), fields))
    }

    async fn push(&self, path: &DocPath, value: Value) -> DbResult<String> {
        let key = self.push_ids.next_id();
        let target = path.child(&key)?;
        self.set(&target, value).await?;
        Ok(key)
    }

    async fn remove(&self, path: &DocPath) -> DbResult<()> {
        self.tree.write(|root| tree::set_at(root, path.segments(), Value::Null))
    }

    async fn subscribe(&self, path: &DocPath) -> DbResult<Subscription> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let mut changes = self.tree.changes.subscribe();
        let initial = self.tree.read(path)?;
        tx.send(initial.clone())
            .await
            .map_err(|_| DbError::Document("subscriber went away".to_string()))?;

        let tree = self.tree.clone();
        let watched = path.clone();
        let feed = tokio::spawn(async move {
            let mut last = initial;
            loop {
                match changes.recv().await {
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                let current = match tree.read(&watched) {
                    Ok(value) => value,
                    Err(e) => {
                        tracing::error!(path = %watched, error = %e, "Subscription read failed");
                        break;
                    }
                };
                if current != last {
                    if tx.send(current.clone()).await.is_err() {
                        break;
                    }
                    last = current;
                }
            }
        });

        tracing::debug!(path = %path, "Subscribed to in-memory path");
        Ok(Subscription::new(path.clone(), rx, feed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn p(raw: &str) -> DocPath {
        DocPath::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_once_missing_is_null() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.once(&p("progress/u1/c1")).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_push_appends_under_generated_keys() {
        let backend = MemoryBackend::new();
        let k1 = backend.push(&p("comments/l1"), json!({ "text": "first" })).await.unwrap();
        let k2 = backend.push(&p("comments/l1"), json!({ "text": "second" })).await.unwrap();
        assert!(k1 < k2);

        let all = backend.once(&p("comments/l1")).await.unwrap();
        let map = all.as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&k2]["text"], "second");
    }

    #[tokio::test]
    async fn test_update_merges_and_remove_deletes() {
        let backend = MemoryBackend::new();
        backend.set(&p("users/u1"), json!({ "name": "A", "avatar": "x" })).await.unwrap();
        backend
            .update(&p("users/u1"), json!({ "name": "B" }).as_object().unwrap().clone())
            .await
            .unwrap();
        assert_eq!(backend.once(&p("users/u1")).await.unwrap(), json!({ "name": "B", "avatar": "x" }));

        backend.remove(&p("users/u1")).await.unwrap();
        assert_eq!(backend.once(&p("users")).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_subscription_yields_current_then_changes() {
        let backend = MemoryBackend::new();
        backend.set(&p("comments/l1/a"), json!("hi")).await.unwrap();

        let mut sub = backend.subscribe(&p("comments/l1")).await.unwrap();
        assert_eq!(sub.next().await.unwrap(), json!({ "a": "hi" }));

        // Unrelated path does not produce a snapshot
        backend.set(&p("comments/l2/z"), json!("other")).await.unwrap();
        backend.set(&p("comments/l1/b"), json!("there")).await.unwrap();

        let next = tokio::time::timeout(Duration::from_secs(1), sub.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next, json!({ "a": "hi", "b": "there" }));
        sub.unsubscribe();
    }

    #[tokio::test]
    async fn test_dropped_subscription_stops_feed() {
        let backend = MemoryBackend::new();
        let sub = backend.subscribe(&p("progress/u1")).await.unwrap();
        drop(sub);
        // Writes after the drop must not panic or block
        backend.set(&p("progress/u1/c1"), json!({ "x": 1 })).await.unwrap();
    }
}
