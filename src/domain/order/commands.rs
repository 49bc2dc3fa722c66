use serde::{Deserialize, Serialize};
use std::fmt;

use super::value_objects::{DeliverySelection, OrderStatus};

// ============================================================================
// Order Commands - Represent operator intent
// ============================================================================

#[derive(Debug, Clone)]
pub enum OrderCommand {
    ChangeStatus {
        target: OrderStatus,
        /// Operator acknowledged the skipped stages
        skip_confirmed: bool,
        delivery: Option<DeliverySelection>,
    },
    Reject {
        reason: String,
    },
    SendInvoice,
    RescheduleDelivery {
        selection: DeliverySelection,
        reason: String,
    },
}

impl OrderCommand {
    pub fn action(&self) -> ActionKind {
        match self {
            OrderCommand::ChangeStatus { .. } => ActionKind::StatusUpdate,
            OrderCommand::Reject { .. } => ActionKind::Rejection,
            OrderCommand::SendInvoice => ActionKind::Invoice,
            OrderCommand::RescheduleDelivery { .. } => ActionKind::DeliveryEdit,
        }
    }
}

/// Families of mutating actions, each guarded independently per order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    StatusUpdate,
    Rejection,
    Invoice,
    DeliveryEdit,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::StatusUpdate => "status_update",
            ActionKind::Rejection => "rejection",
            ActionKind::Invoice => "invoice",
            ActionKind::DeliveryEdit => "delivery_edit",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
