use std::future::Future;
use tokio::sync::Mutex;

use crate::error::DbResult;

// ============================================================================
// Memoized Store Handle
// ============================================================================
//
// At most one live handle per adapter. The first caller runs the connect
// future while holding the lock; concurrent callers wait on the lock and then
// reuse the stored handle. A failed connect leaves the slot empty so the next
// caller retries.
//
// ============================================================================

pub struct HandleCell<H> {
    slot: Mutex<Option<H>>,
}

impl<H: Clone> HandleCell<H> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Return the live handle, running `connect` only if there is none.
    pub async fn get_or_connect<F, Fut>(&self, connect: F) -> DbResult<H>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DbResult<H>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(handle) = slot.as_ref() {
            return Ok(handle.clone());
        }

        let handle = connect().await?;
        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// Cell that starts out holding `handle`.
    pub fn with_handle(handle: H) -> Self {
        Self {
            slot: Mutex::new(Some(handle)),
        }
    }

    pub async fn current(&self) -> Option<H> {
        self.slot.lock().await.clone()
    }

    /// Remove and return the live handle, if any.
    pub async fn take(&self) -> Option<H> {
        self.slot.lock().await.take()
    }

    pub async fn is_set(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

impl<H: Clone> Default for HandleCell<H> {
    fn default() -> Self {
        Self::new()
    }
}
