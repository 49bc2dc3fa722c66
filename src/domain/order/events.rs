use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::outbox::DomainEvent;
use super::value_objects::{DeliveryInfo, DeliveryTimeSlot, OrderStatus};

// ============================================================================
// Order Events - emitted after a confirmed mutation
// ============================================================================
//
// Each event stands for one customer notification the backend was asked to
// send. They are written to the outbox; delivering the notification itself
// is someone else's job.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    StatusChanged(OrderStatusChanged),
    Rejected(OrderRejected),
    Invoiced(OrderInvoiced),
    DeliveryRescheduled(OrderDeliveryRescheduled),
}

impl OrderEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OrderEvent::StatusChanged(_) => OrderStatusChanged::event_type(),
            OrderEvent::Rejected(_) => OrderRejected::event_type(),
            OrderEvent::Invoiced(_) => OrderInvoiced::event_type(),
            OrderEvent::DeliveryRescheduled(_) => OrderDeliveryRescheduled::event_type(),
        }
    }
}

impl DomainEvent for OrderEvent {
    fn event_type() -> &'static str { "OrderEvent" }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Status moved forward. `skipped` lists the stages jumped over, for the
/// notification copy only.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderStatusChanged {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub skipped: Vec<OrderStatus>,
    pub delivery: Option<DeliveryInfo>,
}

impl DomainEvent for OrderStatusChanged {
    fn event_type() -> &'static str { "OrderStatusChanged" }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderRejected {
    pub reason: String,
    pub rejected_at: DateTime<Utc>,
}

impl DomainEvent for OrderRejected {
    fn event_type() -> &'static str { "OrderRejected" }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderInvoiced {
    pub invoice_number: String,
}

impl DomainEvent for OrderInvoiced {
    fn event_type() -> &'static str { "OrderInvoiced" }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderDeliveryRescheduled {
    pub expected_delivery: DateTime<Utc>,
    pub time_slot: DeliveryTimeSlot,
    pub reason: String,
}

impl DomainEvent for OrderDeliveryRescheduled {
    fn event_type() -> &'static str { "OrderDeliveryRescheduled" }
}
