use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Opaque order identifier assigned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only reference to the customer who placed the order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRef {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

// ============================================================================
// Order Status - fixed fulfillment progression plus the rejected side-state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    OrderPlaced,
    OrderConfirmed,
    InTransit,
    Delivered,
    Invoiced,
    Rejected,
}

impl OrderStatus {
    /// The fulfillment progression. `Rejected` is deliberately absent.
    pub const PROGRESSION: [OrderStatus; 5] = [
        OrderStatus::OrderPlaced,
        OrderStatus::OrderConfirmed,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
        OrderStatus::Invoiced,
    ];

    /// Position along the progression, `None` for `Rejected`
    pub fn index(self) -> Option<usize> {
        match self {
            OrderStatus::OrderPlaced => Some(0),
            OrderStatus::OrderConfirmed => Some(1),
            OrderStatus::InTransit => Some(2),
            OrderStatus::Delivered => Some(3),
            OrderStatus::Invoiced => Some(4),
            OrderStatus::Rejected => None,
        }
    }

    /// No further mutation of any kind is permitted
    pub fn is_closed(self) -> bool {
        matches!(self, OrderStatus::Rejected | OrderStatus::Invoiced)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::OrderPlaced => "order_placed",
            OrderStatus::OrderConfirmed => "order_confirmed",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Invoiced => "invoiced",
            OrderStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Delivery
// ============================================================================

/// Symbolic delivery date selector, resolved later to a concrete timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryDateType {
    Today,
    Tomorrow,
    DayAfterTomorrow,
    Custom,
}

impl DeliveryDateType {
    /// Calendar offset in days for the relative selectors
    pub fn day_offset(self) -> Option<i64> {
        match self {
            DeliveryDateType::Today => Some(0),
            DeliveryDateType::Tomorrow => Some(1),
            DeliveryDateType::DayAfterTomorrow => Some(2),
            DeliveryDateType::Custom => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryTimeSlot {
    #[serde(rename = "09:00-12:00")]
    Morning,
    #[serde(rename = "12:00-15:00")]
    Midday,
    #[serde(rename = "15:00-18:00")]
    Afternoon,
    #[serde(rename = "18:00-21:00")]
    Evening,
}

impl DeliveryTimeSlot {
    pub const ALL: [DeliveryTimeSlot; 4] = [
        DeliveryTimeSlot::Morning,
        DeliveryTimeSlot::Midday,
        DeliveryTimeSlot::Afternoon,
        DeliveryTimeSlot::Evening,
    ];

    /// Start and end hour of the slot
    pub fn hours(self) -> (u32, u32) {
        match self {
            DeliveryTimeSlot::Morning => (9, 12),
            DeliveryTimeSlot::Midday => (12, 15),
            DeliveryTimeSlot::Afternoon => (15, 18),
            DeliveryTimeSlot::Evening => (18, 21),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DeliveryTimeSlot::Morning => "09:00-12:00",
            DeliveryTimeSlot::Midday => "12:00-15:00",
            DeliveryTimeSlot::Afternoon => "15:00-18:00",
            DeliveryTimeSlot::Evening => "18:00-21:00",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.label() == label.trim())
    }
}

impl fmt::Display for DeliveryTimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatedRange {
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInfo {
    pub expected_delivery: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    pub delivery_time_slot: DeliveryTimeSlot,
    pub delivery_date_type: DeliveryDateType,
    #[serde(default)]
    pub is_manually_set: bool,
    #[serde(default)]
    pub estimated_range: Option<EstimatedRange>,
}

/// Operator's symbolic delivery choice, as entered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySelection {
    pub date_type: DeliveryDateType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_date: Option<String>,
    pub time_slot: DeliveryTimeSlot,
}

impl DeliverySelection {
    pub fn relative(date_type: DeliveryDateType, time_slot: DeliveryTimeSlot) -> Self {
        Self { date_type, custom_date: None, time_slot }
    }

    pub fn custom(date: impl Into<String>, time_slot: DeliveryTimeSlot) -> Self {
        Self {
            date_type: DeliveryDateType::Custom,
            custom_date: Some(date.into()),
            time_slot,
        }
    }
}

/// Which path produced a delivery record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryProvenance {
    /// Derived while committing a status transition
    Transition,
    /// Written by the standalone delivery-edit action
    Manual,
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progression_indices_match_table() {
        for (i, status) in OrderStatus::PROGRESSION.iter().enumerate() {
            assert_eq!(status.index(), Some(i));
        }
        assert_eq!(OrderStatus::Rejected.index(), None);
    }

    #[test]
    fn test_closed_statuses() {
        assert!(OrderStatus::Rejected.is_closed());
        assert!(OrderStatus::Invoiced.is_closed());
        assert!(!OrderStatus::Delivered.is_closed());
        assert!(!OrderStatus::OrderPlaced.is_closed());
    }

    #[test]
    fn test_order_status_wire_format() {
        let json = serde_json::to_string(&OrderStatus::InTransit).unwrap();
        assert_eq!(json, "\"in_transit\"");

        let status: OrderStatus = serde_json::from_str("\"order_confirmed\"").unwrap();
        assert_eq!(status, OrderStatus::OrderConfirmed);
    }

    #[test]
    fn test_time_slot_wire_format() {
        let json = serde_json::to_string(&DeliveryTimeSlot::Morning).unwrap();
        assert_eq!(json, "\"09:00-12:00\"");

        let slot: DeliveryTimeSlot = serde_json::from_str("\"18:00-21:00\"").unwrap();
        assert_eq!(slot, DeliveryTimeSlot::Evening);
    }

    #[test]
    fn test_time_slot_parse_and_label_agree() {
        for slot in DeliveryTimeSlot::ALL {
            assert_eq!(DeliveryTimeSlot::parse(slot.label()), Some(slot));
        }
        assert_eq!(DeliveryTimeSlot::parse("07:00-09:00"), None);
    }

    #[test]
    fn test_date_type_offsets() {
        assert_eq!(DeliveryDateType::Today.day_offset(), Some(0));
        assert_eq!(DeliveryDateType::Tomorrow.day_offset(), Some(1));
        assert_eq!(DeliveryDateType::DayAfterTomorrow.day_offset(), Some(2));
        assert_eq!(DeliveryDateType::Custom.day_offset(), None);

        let json = serde_json::to_string(&DeliveryDateType::DayAfterTomorrow).unwrap();
        assert_eq!(json, "\"day_after_tomorrow\"");
    }

    #[test]
    fn test_delivery_info_camel_case() {
        let info = DeliveryInfo {
            expected_delivery: None,
            delivered_at: None,
            delivery_time_slot: DeliveryTimeSlot::Midday,
            delivery_date_type: DeliveryDateType::Today,
            is_manually_set: true,
            estimated_range: None,
        };

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["isManuallySet"], true);
        assert_eq!(value["deliveryTimeSlot"], "12:00-15:00");
        assert_eq!(value["deliveryDateType"], "today");
    }
}
