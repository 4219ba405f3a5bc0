use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::store::{Collection, DocumentStore, Filter, StoreError};


const MAX_RETRY_DELAY_MS: u64 = 10000;


/// Retries backend failures with exponential backoff. `NotFound` and
/// serialization errors are returned immediately.
pub struct RetryingStore<S> {
    inner: S,
    max_retries: u32,
    initial_delay: Duration,
}

impl<S: DocumentStore> RetryingStore<S> {
    pub fn new(inner: S, max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            inner,
            max_retries: max_retries.max(1),
            initial_delay,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn with_retry<T, F, Fut>(&self, op: &str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, StoreError>> + Send,
        T: Send,
    {
        let mut last_error = None;
        let mut delay = self.initial_delay;

        for attempt in 1..=self.max_retries {
            match call().await {
                Ok(result) => return Ok(result),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempt < self.max_retries {
                        debug!("{} failed (attempt {}), retrying: {}", op, attempt, e);
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(Duration::from_millis(MAX_RETRY_DELAY_MS));
                    } else {
                        warn!("{} failed (final attempt {}): {}", op, attempt, e);
                    }
                    last_error = Some(e.to_string());
                }
            }
        }

        Err(StoreError::RetryExhausted(
            self.max_retries,
            last_error.unwrap_or_else(|| "Unknown error".to_string()),
        ))
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for RetryingStore<S> {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        self.with_retry("get", || self.inner.get(collection, id)).await
    }

    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        self.with_retry("find", || self.inner.find(collection, filter)).await
    }

    async fn insert(&self, collection: Collection, doc: Value) -> Result<(), StoreError> {
        self.with_retry("insert", || self.inner.insert(collection, doc.clone())).await
    }

    async fn update(&self, collection: Collection, doc: Value) -> Result<(), StoreError> {
        self.with_retry("update", || self.inner.update(collection, doc.clone())).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        self.with_retry("delete", || self.inner.delete(collection, id)).await
    }

    async fn delete_where(&self, collection: Collection, filter: &Filter) -> Result<usize, StoreError> {
        self.with_retry("delete_where", || self.inner.delete_where(collection, filter)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        inner: InMemoryStore,
        failures_left: AtomicU32,
    }

    #[async_trait]
    impl DocumentStore for Flaky {
        async fn get(&self, c: Collection, id: &str) -> Result<Option<Value>, StoreError> {
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(StoreError::Backend("connection reset".to_string()));
            }
            self.inner.get(c, id).await
        }
        async fn find(&self, c: Collection, f: &Filter) -> Result<Vec<Value>, StoreError> {
            self.inner.find(c, f).await
        }
        async fn insert(&self, c: Collection, d: Value) -> Result<(), StoreError> {
            self.inner.insert(c, d).await
        }
        async fn update(&self, c: Collection, d: Value) -> Result<(), StoreError> {
            self.inner.update(c, d).await
        }
        async fn delete(&self, c: Collection, id: &str) -> Result<bool, StoreError> {
            self.inner.delete(c, id).await
        }
        async fn delete_where(&self, c: Collection, f: &Filter) -> Result<usize, StoreError> {
            self.inner.delete_where(c, f).await
        }
    }

    fn flaky(failures: u32) -> Flaky {
        Flaky {
            inner: InMemoryStore::new(),
            failures_left: AtomicU32::new(failures),
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let store = RetryingStore::new(flaky(2), 3, Duration::from_millis(1));
        store.insert(Collection::Teams, json!({"id": "t1"})).await.unwrap();
        let doc = store.get(Collection::Teams, "t1").await.unwrap();
        assert!(doc.is_some());
    }

    #[tokio::test]
    async fn test_exhausts_retries() {
        let store = RetryingStore::new(flaky(5), 3, Duration::from_millis(1));
        let err = store.get(Collection::Teams, "t1").await.unwrap_err();
        assert!(matches!(err, StoreError::RetryExhausted(3, _)));
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let store = RetryingStore::new(flaky(0), 3, Duration::from_millis(1));
        let err = store
            .update(Collection::Teams, json!({"id": "missing"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(..)));
    }
}
