use super::value_objects::OrderStatus;

// ============================================================================
// Order Business Rule Errors
// ============================================================================
//
// Local validation failures. All of these are raised before any network
// call is made and leave the order store untouched.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("Cannot move order from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error("Skipping ahead must be confirmed (skipped: {})", format_statuses(.0))]
    SkipNotConfirmed(Vec<OrderStatus>),

    #[error("A delivery date is required before the order can go in transit")]
    DeliveryRequired,

    #[error("Please select a delivery date")]
    MissingDeliveryDate,

    #[error("Invalid delivery date: {0}")]
    InvalidDeliveryDate(String),

    #[error("Rejection reason cannot be empty")]
    EmptyRejectionReason,

    #[error("Order is closed in status: {0}")]
    OrderClosed(OrderStatus),

    #[error("Order cannot be invoiced in status: {0}")]
    NotInvoiceable(OrderStatus),

    #[error("Order is already invoiced")]
    AlreadyInvoiced,

    #[error("No orders selected")]
    EmptySelection,
}

fn format_statuses(statuses: &[OrderStatus]) -> String {
    statuses
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
