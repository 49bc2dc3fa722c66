use serde::{Deserialize, Serialize};

use super::errors::OrderError;
use super::value_objects::OrderStatus;

// ============================================================================
// Rejection - one-way escape to the terminal rejected state
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionRequest {
    pub reason: String,
}

pub struct RejectionHandler;

impl RejectionHandler {
    /// Whether the reject action should be offered at all
    pub fn can_reject(status: OrderStatus) -> bool {
        !status.is_closed()
    }

    pub fn prepare(status: OrderStatus, reason: &str) -> Result<RejectionRequest, OrderError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(OrderError::EmptyRejectionReason);
        }

        if !Self::can_reject(status) {
            return Err(OrderError::OrderClosed(status));
        }

        Ok(RejectionRequest { reason: reason.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_allowed_from_every_open_status() {
        for status in [
            OrderStatus::OrderPlaced,
            OrderStatus::OrderConfirmed,
            OrderStatus::InTransit,
            OrderStatus::Delivered,
        ] {
            let request = RejectionHandler::prepare(status, "wrong address").unwrap();
            assert_eq!(request.reason, "wrong address");
        }
    }

    #[test]
    fn test_reject_blocked_once_closed() {
        assert_eq!(
            RejectionHandler::prepare(OrderStatus::Invoiced, "late"),
            Err(OrderError::OrderClosed(OrderStatus::Invoiced))
        );
        assert_eq!(
            RejectionHandler::prepare(OrderStatus::Rejected, "again"),
            Err(OrderError::OrderClosed(OrderStatus::Rejected))
        );
    }

    #[test]
    fn test_blank_reason_rejected() {
        assert_eq!(
            RejectionHandler::prepare(OrderStatus::OrderPlaced, "  \t "),
            Err(OrderError::EmptyRejectionReason)
        );
    }

    #[test]
    fn test_reason_is_trimmed() {
        let request = RejectionHandler::prepare(OrderStatus::OrderPlaced, "  damaged goods \n").unwrap();
        assert_eq!(request.reason, "damaged goods");
    }
}
