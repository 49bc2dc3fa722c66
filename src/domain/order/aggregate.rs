use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use super::invoicing::InvoiceDispatcher;
use super::rejection::RejectionHandler;
use super::value_objects::{CustomerRef, DeliveryInfo, OrderId, OrderStatus};

// ============================================================================
// Order - locally cached summary of a server-owned order
// ============================================================================
//
// The client never invents state for an order. Every change arrives as an
// `OrderPatch` built from a confirmed server response and is applied here.
// `last_updated` is the server's clock; a patch older than the record is a
// late answer to a superseded request and is ignored.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    // Identity
    pub id: OrderId,
    pub order_number: String,

    // Placement (immutable)
    pub placed_at: DateTime<Utc>,
    pub total_amount: f64,
    pub customer: CustomerRef,

    // Lifecycle
    pub status: OrderStatus,
    #[serde(default)]
    pub is_invoiced: bool,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivery: Option<DeliveryInfo>,

    // Server clock
    pub last_updated: DateTime<Utc>,
}

/// Fields confirmed by a successful mutation
#[derive(Debug, Clone, PartialEq)]
pub enum OrderPatch {
    StatusUpdated {
        status: OrderStatus,
        delivery: Option<DeliveryInfo>,
        last_updated: DateTime<Utc>,
    },
    Rejected {
        reason: String,
        rejected_at: DateTime<Utc>,
        last_updated: DateTime<Utc>,
    },
    Invoiced {
        invoice_number: String,
    },
    DeliveryRescheduled {
        delivery: DeliveryInfo,
        last_updated: DateTime<Utc>,
    },
}

impl OrderPatch {
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        match self {
            OrderPatch::StatusUpdated { last_updated, .. }
            | OrderPatch::Rejected { last_updated, .. }
            | OrderPatch::DeliveryRescheduled { last_updated, .. } => Some(*last_updated),
            OrderPatch::Invoiced { .. } => None,
        }
    }
}

impl Order {
    pub fn is_closed(&self) -> bool {
        self.status.is_closed()
    }

    pub fn can_reject(&self) -> bool {
        RejectionHandler::can_reject(self.status)
    }

    pub fn can_invoice(&self) -> bool {
        InvoiceDispatcher::check(self.status, self.is_invoiced).is_ok()
    }

    /// True when `other` carries a strictly older server timestamp
    pub fn is_newer_than(&self, other: DateTime<Utc>) -> bool {
        self.last_updated > other
    }

    /// Whether this cached record must win over a listing row for the same
    /// order. Invoicing carries no timestamp, so an invoiced record also
    /// wins over a row that is not invoiced yet.
    pub fn supersedes(&self, row: &Order) -> bool {
        self.is_newer_than(row.last_updated) || (self.is_invoiced && !row.is_invoiced)
    }

    /// Apply a confirmed patch. Returns false when the patch was stale and
    /// nothing changed.
    pub fn apply(&mut self, patch: &OrderPatch) -> bool {
        if let Some(ts) = patch.last_updated() {
            if self.is_newer_than(ts) {
                tracing::debug!(
                    order_id = %self.id,
                    record = %self.last_updated,
                    patch = %ts,
                    "Ignoring stale patch"
                );
                return false;
            }
        }

        match patch {
            OrderPatch::StatusUpdated { status, delivery, last_updated } => {
                self.status = *status;
                if let Some(delivery) = delivery {
                    self.delivery = Some(delivery.clone());
                }
                self.last_updated = *last_updated;
            }
            OrderPatch::Rejected { reason, rejected_at, last_updated } => {
                self.status = OrderStatus::Rejected;
                self.rejection_reason = Some(reason.clone());
                self.rejected_at = Some(*rejected_at);
                self.last_updated = *last_updated;
            }
            OrderPatch::Invoiced { invoice_number } => {
                // Assigned at most once
                if self.invoice_number.is_none() {
                    self.invoice_number = Some(invoice_number.clone());
                }
                self.is_invoiced = true;
            }
            OrderPatch::DeliveryRescheduled { delivery, last_updated } => {
                self.delivery = Some(delivery.clone());
                self.last_updated = *last_updated;
            }
        }

        true
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::order::value_objects::{DeliveryDateType, DeliveryTimeSlot};
    use chrono::{Duration, TimeZone};

    pub(crate) fn sample_order(id: &str, status: OrderStatus) -> Order {
        let placed_at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        Order {
            id: OrderId::new(id),
            order_number: format!("WO-{id}"),
            placed_at,
            total_amount: 1250.0,
            customer: CustomerRef {
                id: "c-1".to_string(),
                name: "Harbor Foods".to_string(),
                email: Some("orders@harbor.example".to_string()),
            },
            status,
            is_invoiced: false,
            invoice_number: None,
            rejection_reason: None,
            rejected_at: None,
            delivery: None,
            last_updated: placed_at,
        }
    }

    fn delivery() -> DeliveryInfo {
        DeliveryInfo {
            expected_delivery: Some(Utc.with_ymd_and_hms(2026, 3, 5, 0, 0, 0).unwrap()),
            delivered_at: None,
            delivery_time_slot: DeliveryTimeSlot::Morning,
            delivery_date_type: DeliveryDateType::Custom,
            is_manually_set: false,
            estimated_range: None,
        }
    }

    #[test]
    fn test_status_patch_applies_delivery_and_clock() {
        let mut order = sample_order("o1", OrderStatus::OrderConfirmed);
        let ts = order.last_updated + Duration::minutes(5);

        let applied = order.apply(&OrderPatch::StatusUpdated {
            status: OrderStatus::InTransit,
            delivery: Some(delivery()),
            last_updated: ts,
        });

        assert!(applied);
        assert_eq!(order.status, OrderStatus::InTransit);
        assert_eq!(order.delivery, Some(delivery()));
        assert_eq!(order.last_updated, ts);
    }

    #[test]
    fn test_stale_patch_is_ignored() {
        let mut order = sample_order("o1", OrderStatus::Delivered);
        let before = order.clone();

        let applied = order.apply(&OrderPatch::StatusUpdated {
            status: OrderStatus::InTransit,
            delivery: None,
            last_updated: order.last_updated - Duration::seconds(1),
        });

        assert!(!applied);
        assert_eq!(order, before);
    }

    #[test]
    fn test_rejection_patch() {
        let mut order = sample_order("o1", OrderStatus::Delivered);
        let ts = order.last_updated + Duration::hours(1);

        order.apply(&OrderPatch::Rejected {
            reason: "wrong address".to_string(),
            rejected_at: ts,
            last_updated: ts,
        });

        assert_eq!(order.status, OrderStatus::Rejected);
        assert_eq!(order.rejection_reason.as_deref(), Some("wrong address"));
        assert_eq!(order.rejected_at, Some(ts));
        assert!(order.is_closed());
        assert!(!order.can_reject());
    }

    #[test]
    fn test_invoice_number_assigned_once() {
        let mut order = sample_order("o1", OrderStatus::Delivered);
        assert!(order.can_invoice());

        order.apply(&OrderPatch::Invoiced { invoice_number: "INV-1".to_string() });
        order.apply(&OrderPatch::Invoiced { invoice_number: "INV-2".to_string() });

        assert!(order.is_invoiced);
        assert_eq!(order.invoice_number.as_deref(), Some("INV-1"));
        assert!(!order.can_invoice());
    }

    #[test]
    fn test_order_wire_format() {
        let json = r#"{
            "id": "665f1c",
            "orderNumber": "WO-1001",
            "placedAt": "2026-03-01T09:00:00Z",
            "totalAmount": 480.5,
            "customer": {"id": "c-9", "name": "Corner Deli"},
            "status": "order_confirmed",
            "isInvoiced": false,
            "invoiceNumber": null,
            "lastUpdated": "2026-03-01T10:00:00Z"
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.id, OrderId::new("665f1c"));
        assert_eq!(order.status, OrderStatus::OrderConfirmed);
        assert!(order.delivery.is_none());
        assert!(order.can_invoice());
    }
}
