use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::domain::order::{Order, OrderStatus, RescheduledDelivery};

// ============================================================================
// Wire types for the order backend (camelCase JSON)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedStatus {
    pub status: OrderStatus,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdateResponse {
    pub order: ConfirmedStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedRejection {
    pub status: OrderStatus,
    pub rejection_reason: String,
    pub rejected_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionResponse {
    pub order: ConfirmedRejection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedClock {
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryUpdateResponse {
    pub order: ConfirmedClock,
    pub new_delivery: RescheduledDelivery,
}

// ============================================================================
// Listing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    PlacedAt,
    OrderNumber,
    TotalAmount,
    Status,
    LastUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            search: None,
            status: None,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl ListQuery {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.trim().is_empty() { None } else { Some(search.trim().to_string()) };
        self.page = 1;
        self
    }

    pub fn with_status(mut self, status: Option<OrderStatus>) -> Self {
        self.status = status;
        self.page = 1;
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn sorted_by(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = field;
        self.sort_order = order;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_wire_format() {
        let query = ListQuery::default()
            .with_search("  harbor ")
            .with_status(Some(OrderStatus::InTransit))
            .sorted_by(SortField::TotalAmount, SortOrder::Asc);

        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["search"], "harbor");
        assert_eq!(value["status"], "in_transit");
        assert_eq!(value["sortBy"], "totalAmount");
        assert_eq!(value["sortOrder"], "asc");
        assert_eq!(value["page"], 1);
    }

    #[test]
    fn test_blank_search_is_dropped() {
        let query = ListQuery::default().with_page(4).with_search("   ");
        assert!(query.search.is_none());
        assert_eq!(query.page, 1);
    }

    #[test]
    fn test_rejection_response_parses() {
        let json = r#"{"order": {
            "status": "rejected",
            "rejectionReason": "wrong address",
            "rejectedAt": "2026-03-02T08:00:00Z",
            "lastUpdated": "2026-03-02T08:00:00Z"
        }}"#;
        let response: RejectionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.order.status, OrderStatus::Rejected);
        assert_eq!(response.order.rejection_reason, "wrong address");
    }
}
