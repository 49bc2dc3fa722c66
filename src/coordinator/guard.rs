use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::order::{ActionKind, OrderId};

// ============================================================================
// Mutation Guard - at most one outstanding mutation per (order, action)
// ============================================================================
//
// Each acquired key holds a token. The permit removes its own token on drop,
// so a permit can never release a slot that someone else now owns. A second
// acquire while the key is held is refused, not queued.
//
// ============================================================================

type Key = (OrderId, ActionKind);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{action} already in progress for order {order_id}, please wait")]
pub struct Busy {
    pub order_id: OrderId,
    pub action: ActionKind,
}

#[derive(Clone, Default)]
pub struct MutationGuard {
    in_flight: Arc<DashMap<Key, Uuid>>,
}

impl MutationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, order_id: &OrderId, action: ActionKind) -> Result<InFlightPermit, Busy> {
        let key = (order_id.clone(), action);
        let token = Uuid::new_v4();

        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(_) => {
                tracing::debug!(order_id = %order_id, action = %action, "⏳ Mutation already in flight");
                Err(Busy { order_id: order_id.clone(), action })
            }
            Entry::Vacant(slot) => {
                slot.insert(token);
                Ok(InFlightPermit {
                    in_flight: self.in_flight.clone(),
                    key,
                    token,
                })
            }
        }
    }

    /// Acquire a permit for every order or none of them
    pub fn try_acquire_many(
        &self,
        order_ids: &[OrderId],
        action: ActionKind,
    ) -> Result<Vec<InFlightPermit>, Busy> {
        // Permits taken so far are released by drop if a later one fails
        order_ids
            .iter()
            .map(|id| self.try_acquire(id, action))
            .collect()
    }

    pub fn is_in_flight(&self, order_id: &OrderId, action: ActionKind) -> bool {
        self.in_flight.contains_key(&(order_id.clone(), action))
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

/// Held for the duration of one mutation
#[derive(Debug)]
pub struct InFlightPermit {
    in_flight: Arc<DashMap<Key, Uuid>>,
    key: Key,
    token: Uuid,
}

impl InFlightPermit {
    pub fn action(&self) -> ActionKind {
        self.key.1
    }
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        let token = self.token;
        self.in_flight.remove_if(&self.key, |_, held| *held == token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_busy() {
        let guard = MutationGuard::new();
        let id = OrderId::new("o1");

        let _permit = guard.try_acquire(&id, ActionKind::Invoice).unwrap();
        let second = guard.try_acquire(&id, ActionKind::Invoice);

        assert_eq!(second.unwrap_err(), Busy { order_id: id.clone(), action: ActionKind::Invoice });
        assert!(guard.is_in_flight(&id, ActionKind::Invoice));
    }

    #[test]
    fn test_drop_releases_permit() {
        let guard = MutationGuard::new();
        let id = OrderId::new("o1");

        {
            let permit = guard.try_acquire(&id, ActionKind::Rejection).unwrap();
            assert_eq!(permit.action(), ActionKind::Rejection);
        }

        assert!(!guard.is_in_flight(&id, ActionKind::Rejection));
        assert!(guard.try_acquire(&id, ActionKind::Rejection).is_ok());
    }

    #[test]
    fn test_actions_and_orders_are_independent() {
        let guard = MutationGuard::new();
        let a = OrderId::new("a");
        let b = OrderId::new("b");

        let _p1 = guard.try_acquire(&a, ActionKind::StatusUpdate).unwrap();
        let _p2 = guard.try_acquire(&a, ActionKind::DeliveryEdit).unwrap();
        let _p3 = guard.try_acquire(&b, ActionKind::StatusUpdate).unwrap();

        assert_eq!(guard.in_flight_count(), 3);
    }

    #[test]
    fn test_acquire_many_is_all_or_nothing() {
        let guard = MutationGuard::new();
        let ids = vec![OrderId::new("a"), OrderId::new("b"), OrderId::new("c")];

        let _held = guard.try_acquire(&ids[2], ActionKind::Invoice).unwrap();
        let result = guard.try_acquire_many(&ids, ActionKind::Invoice);

        assert_eq!(result.unwrap_err().order_id, OrderId::new("c"));
        assert!(!guard.is_in_flight(&ids[0], ActionKind::Invoice));
        assert!(!guard.is_in_flight(&ids[1], ActionKind::Invoice));
        assert_eq!(guard.in_flight_count(), 1);
    }
}
