use serde::{Deserialize, Serialize};

use super::errors::OrderError;
use super::value_objects::{DeliveryInfo, OrderStatus};

// ============================================================================
// Status Transition Engine
// ============================================================================
//
// Classifies a requested status change against the fixed progression:
//
//   order_placed -> order_confirmed -> in_transit -> delivered -> invoiced
//
// Moving more than one step is allowed but every skipped stage must be
// disclosed to (and confirmed by) the operator. Skipped stages are carried
// in the payload for the notification only; they are never persisted as
// individual transitions. Landing on in_transit additionally requires a
// concrete delivery.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Backward, repeated, or involving the rejected side-state
    Illegal,
    /// Exactly one step forward
    DirectNext,
    /// More than one step forward
    SkipAhead { skipped: Vec<OrderStatus> },
    /// Lands on in_transit; commit deferred until a delivery is resolved
    RequiresDelivery { skipped: Vec<OrderStatus> },
}

impl Transition {
    pub fn is_legal(&self) -> bool {
        !matches!(self, Transition::Illegal)
    }

    pub fn skipped(&self) -> &[OrderStatus] {
        match self {
            Transition::SkipAhead { skipped } | Transition::RequiresDelivery { skipped } => skipped,
            Transition::Illegal | Transition::DirectNext => &[],
        }
    }

    pub fn requires_delivery(&self) -> bool {
        matches!(self, Transition::RequiresDelivery { .. })
    }
}

/// Payload committed to the backend for a status change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
    pub skipped_statuses: Vec<OrderStatus>,
    pub send_notification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryInfo>,
}

pub struct StatusTransitionEngine;

impl StatusTransitionEngine {
    /// Classify a requested move. Pure, never fails.
    pub fn classify(current: OrderStatus, target: OrderStatus) -> Transition {
        let (Some(i), Some(j)) = (current.index(), target.index()) else {
            return Transition::Illegal;
        };

        if j <= i {
            return Transition::Illegal;
        }

        let base = if j == i + 1 {
            Transition::DirectNext
        } else {
            Transition::SkipAhead {
                skipped: OrderStatus::PROGRESSION[i + 1..j].to_vec(),
            }
        };

        // Evaluated after the skip check so a jump onto in_transit keeps its list
        if target == OrderStatus::InTransit {
            return Transition::RequiresDelivery {
                skipped: base.skipped().to_vec(),
            };
        }

        base
    }

    /// Validate a classification against the operator's input and build the
    /// commit payload.
    ///
    /// `skip_confirmed` is the operator's explicit acknowledgement of the
    /// skipped stages; it is ignored for single-step moves.
    pub fn plan(
        current: OrderStatus,
        target: OrderStatus,
        skip_confirmed: bool,
        delivery: Option<DeliveryInfo>,
    ) -> Result<StatusUpdateRequest, OrderError> {
        let transition = Self::classify(current, target);

        tracing::debug!(
            from = %current,
            to = %target,
            transition = ?transition,
            "Classified status transition"
        );

        if !transition.is_legal() {
            return Err(OrderError::IllegalTransition { from: current, to: target });
        }

        let skipped = transition.skipped().to_vec();
        if !skipped.is_empty() && !skip_confirmed {
            return Err(OrderError::SkipNotConfirmed(skipped));
        }

        let delivery = if transition.requires_delivery() {
            match delivery {
                Some(info) if info.expected_delivery.is_some() => Some(info),
                _ => return Err(OrderError::DeliveryRequired),
            }
        } else {
            delivery
        };

        Ok(StatusUpdateRequest {
            status: target,
            skipped_statuses: skipped,
            send_notification: true,
            delivery,
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
