use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::DocPath;

/// Live subscription to a document path.
///
/// Yields the full value at the path: first the current value, then a new
/// snapshot after every change. The feed stops on `unsubscribe()` or drop.
pub struct Subscription {
    path: DocPath,
    snapshots: mpsc::Receiver<Value>,
    feed: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(path: DocPath, snapshots: mpsc::Receiver<Value>, feed: JoinHandle<()>) -> Self {
        Self {
            path,
            snapshots,
            feed: Some(feed),
        }
    }

    pub fn path(&self) -> &DocPath {
        &self.path
    }

    /// Next snapshot; `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<Value> {
        self.snapshots.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.abort();
            tracing::debug!(path = %self.path, "Subscription cancelled");
        }
        self.snapshots.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}
