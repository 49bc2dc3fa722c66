use futures_util::future::{AbortHandle, Abortable, Aborted};
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use tokio::sync::RwLock;

use crate::api::{ApiError, OrderPage};
use crate::store::OrderStore;

// ============================================================================
// Latest-wins list queries
// ============================================================================
//
// A query takes the next store generation when it is issued and registers
// an abort handle. Registering a newer generation aborts the older query's
// transport future. Whatever survives is applied only if its generation is
// still current when it completes.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Response written to the store
    Applied,
    /// A newer query was issued; the response (or error) was dropped
    Superseded,
    /// Aborted by the caller without a replacement
    Cancelled,
    /// Latest query failed; store left untouched
    Failed(ApiError),
}

impl QueryOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            QueryOutcome::Applied => "applied",
            QueryOutcome::Superseded => "superseded",
            QueryOutcome::Cancelled => "cancelled",
            QueryOutcome::Failed(_) => "failed",
        }
    }
}

#[derive(Default)]
pub struct QueryTracker {
    pending: Mutex<Option<(u64, AbortHandle)>>,
}

impl QueryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `generation` the pending query, aborting an older one. If a
    /// newer query registered first, `handle` itself is aborted.
    fn register(&self, generation: u64, handle: AbortHandle) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match pending.take() {
            Some((newer, newer_handle)) if newer > generation => {
                handle.abort();
                *pending = Some((newer, newer_handle));
            }
            Some((older, older_handle)) => {
                tracing::debug!(aborted = older, by = generation, "Aborting superseded query");
                older_handle.abort();
                *pending = Some((generation, handle));
            }
            None => *pending = Some((generation, handle)),
        }
    }

    fn finish(&self, generation: u64) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*pending, Some((g, _)) if g == generation) {
            *pending = None;
        }
    }

    /// Abort the pending query, if any, without issuing a new one
    pub fn cancel(&self) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match pending.take() {
            Some((generation, handle)) => {
                tracing::debug!(generation = generation, "Query cancelled");
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Run one list query against `store` with latest-wins semantics
    pub async fn run<F>(&self, store: &RwLock<OrderStore>, query: F) -> QueryOutcome
    where
        F: Future<Output = Result<OrderPage, ApiError>>,
    {
        let generation = store.write().await.begin_query();
        let (handle, registration) = AbortHandle::new_pair();
        self.register(generation, handle);

        let result = Abortable::new(query, registration).await;
        self.finish(generation);

        match result {
            Err(Aborted) => {
                if store.read().await.is_current(generation) {
                    QueryOutcome::Cancelled
                } else {
                    QueryOutcome::Superseded
                }
            }
            Ok(Err(error)) => {
                if store.read().await.is_current(generation) {
                    tracing::warn!(generation = generation, error = %error, "❌ List query failed");
                    QueryOutcome::Failed(error)
                } else {
                    QueryOutcome::Superseded
                }
            }
            Ok(Ok(page)) => {
                if store.write().await.apply_listing(generation, page) {
                    QueryOutcome::Applied
                } else {
                    QueryOutcome::Superseded
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Pagination;
    use crate::domain::order::aggregate::tests::sample_order;
    use crate::domain::order::{OrderId, OrderStatus};
    use std::sync::Arc;
    use tokio::sync::oneshot;

    fn page(id: &str) -> OrderPage {
        OrderPage {
            orders: vec![sample_order(id, OrderStatus::OrderPlaced)],
            pagination: Pagination { page: 1, limit: 20, total: 1, total_pages: 1 },
        }
    }

    #[tokio::test]
    async fn test_single_query_applied() {
        let tracker = QueryTracker::new();
        let store = RwLock::new(OrderStore::new());

        let outcome = tracker.run(&store, async { Ok(page("a")) }).await;

        assert_eq!(outcome, QueryOutcome::Applied);
        assert_eq!(store.read().await.orders()[0].id, OrderId::new("a"));
        assert!(!tracker.has_pending());
    }

    #[tokio::test]
    async fn test_failed_query_leaves_store() {
        let tracker = QueryTracker::new();
        let store = RwLock::new(OrderStore::with_page(page("kept")));

        let outcome = tracker.run(&store, async { Err(ApiError::Timeout) }).await;

        assert_eq!(outcome, QueryOutcome::Failed(ApiError::Timeout));
        assert_eq!(store.read().await.orders()[0].id, OrderId::new("kept"));
    }

    #[tokio::test]
    async fn test_newer_query_supersedes_outstanding_one() {
        let tracker = Arc::new(QueryTracker::new());
        let store = Arc::new(RwLock::new(OrderStore::new()));
        let (tx1, rx1) = oneshot::channel::<Result<OrderPage, ApiError>>();

        let first = {
            let tracker = tracker.clone();
            let store = store.clone();
            tokio::spawn(async move {
                tracker
                    .run(&store, async move { rx1.await.unwrap_or(Err(ApiError::Timeout)) })
                    .await
            })
        };

        while store.read().await.current_generation() < 1 {
            tokio::task::yield_now().await;
        }

        let second = tracker.run(&store, async { Ok(page("q2")) }).await;
        assert_eq!(second, QueryOutcome::Applied);

        // Q1's answer arrives late, if its transport is still around at all
        let _ = tx1.send(Ok(page("q1")));

        assert_eq!(first.await.unwrap(), QueryOutcome::Superseded);
        let store = store.read().await;
        assert_eq!(store.orders().len(), 1);
        assert_eq!(store.orders()[0].id, OrderId::new("q2"));
    }

    #[tokio::test]
    async fn test_cancel_pending_query() {
        let tracker = Arc::new(QueryTracker::new());
        let store = Arc::new(RwLock::new(OrderStore::with_page(page("kept"))));
        let (_tx, rx) = oneshot::channel::<Result<OrderPage, ApiError>>();

        let running = {
            let tracker = tracker.clone();
            let store = store.clone();
            tokio::spawn(async move {
                tracker
                    .run(&store, async move { rx.await.unwrap_or(Err(ApiError::Timeout)) })
                    .await
            })
        };

        while !tracker.has_pending() {
            tokio::task::yield_now().await;
        }
        assert!(tracker.cancel());

        assert_eq!(running.await.unwrap(), QueryOutcome::Cancelled);
        assert_eq!(store.read().await.orders()[0].id, OrderId::new("kept"));
    }
}
