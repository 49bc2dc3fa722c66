use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::order::{OrderEvent, OrderId};
use super::envelope::EventEnvelope;

// ============================================================================
// Notification Outbox
// ============================================================================
//
// Every confirmed mutation leaves one envelope here. The notifier drains the
// queue on its own schedule, so ordering and retries of customer
// notifications are decoupled from the state machine.
//
// ============================================================================

#[derive(Clone, Default)]
pub struct NotificationOutbox {
    inner: Arc<Mutex<OutboxState>>,
}

#[derive(Default)]
struct OutboxState {
    next_sequence: u64,
    pending: VecDeque<EventEnvelope<OrderEvent>>,
}

impl NotificationOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a post-commit event. Returns its sequence number.
    pub async fn record(
        &self,
        order_id: OrderId,
        event: OrderEvent,
        correlation_id: Uuid,
    ) -> u64 {
        let mut state = self.inner.lock().await;
        state.next_sequence += 1;
        let sequence = state.next_sequence;

        let envelope = EventEnvelope::new(
            order_id,
            sequence,
            event.name().to_string(),
            event,
            correlation_id,
        )
        .with_metadata("send_notification", "true");

        tracing::info!(
            order_id = %envelope.order_id,
            event_type = %envelope.event_type,
            sequence = sequence,
            "📬 Notification queued"
        );

        state.pending.push_back(envelope);
        sequence
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.pending.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.pending.is_empty()
    }

    /// Snapshot without consuming
    pub async fn pending(&self) -> Vec<EventEnvelope<OrderEvent>> {
        self.inner.lock().await.pending.iter().cloned().collect()
    }

    /// Hand every pending envelope to the caller, oldest first
    pub async fn drain(&self) -> Vec<EventEnvelope<OrderEvent>> {
        self.inner.lock().await.pending.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderInvoiced;

    fn invoiced(n: &str) -> OrderEvent {
        OrderEvent::Invoiced(OrderInvoiced { invoice_number: n.to_string() })
    }

    #[tokio::test]
    async fn test_record_assigns_increasing_sequence() {
        let outbox = NotificationOutbox::new();
        let correlation = Uuid::new_v4();

        let first = outbox.record(OrderId::new("o1"), invoiced("A"), correlation).await;
        let second = outbox.record(OrderId::new("o2"), invoiced("B"), correlation).await;

        assert!(second > first);
        assert_eq!(outbox.len().await, 2);
    }

    #[tokio::test]
    async fn test_drain_empties_in_order() {
        let outbox = NotificationOutbox::new();
        outbox.record(OrderId::new("o1"), invoiced("A"), Uuid::new_v4()).await;
        outbox.record(OrderId::new("o2"), invoiced("B"), Uuid::new_v4()).await;

        assert_eq!(outbox.pending().await.len(), 2);

        let drained = outbox.drain().await;
        assert_eq!(drained[0].order_id, OrderId::new("o1"));
        assert_eq!(drained[1].order_id, OrderId::new("o2"));
        assert!(outbox.is_empty().await);
    }
}
