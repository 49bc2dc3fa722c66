// ============================================================================
// Request Coordinator
// ============================================================================
//
// Wraps every mutation and every list query:
// - guard/ - per (order, action) in-flight permits for mutations
// - query/ - store generations plus abort handles for list queries
//
// Mutations on different orders never block each other.
//
// ============================================================================

mod guard;
mod query;

use std::future::Future;
use tokio::sync::RwLock;

use crate::api::{ApiError, OrderPage};
use crate::domain::order::{ActionKind, OrderId};
use crate::store::OrderStore;

pub use guard::{Busy, InFlightPermit, MutationGuard};
pub use query::{QueryOutcome, QueryTracker};

#[derive(Default)]
pub struct RequestCoordinator {
    mutations: MutationGuard,
    queries: QueryTracker,
}

impl RequestCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_mutation(&self, order_id: &OrderId, action: ActionKind) -> Result<InFlightPermit, Busy> {
        self.mutations.try_acquire(order_id, action)
    }

    pub fn begin_bulk_mutation(
        &self,
        order_ids: &[OrderId],
        action: ActionKind,
    ) -> Result<Vec<InFlightPermit>, Busy> {
        self.mutations.try_acquire_many(order_ids, action)
    }

    pub fn is_in_flight(&self, order_id: &OrderId, action: ActionKind) -> bool {
        self.mutations.is_in_flight(order_id, action)
    }

    pub async fn run_query<F>(&self, store: &RwLock<OrderStore>, query: F) -> QueryOutcome
    where
        F: Future<Output = Result<OrderPage, ApiError>>,
    {
        self.queries.run(store, query).await
    }

    pub fn cancel_query(&self) -> bool {
        self.queries.cancel()
    }
}
