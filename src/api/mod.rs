// ============================================================================
// Order Backend API
// ============================================================================
//
// The authoritative backend is slow and can fail at any point. Everything
// the client knows about an order comes back through this trait.
//
// Implementations:
// - http/   - reqwest JSON client for the real backend
// - memory/ - in-process backend enforcing the same rules (demo, tests)
//
// ============================================================================

mod http;
mod memory;
mod types;

use async_trait::async_trait;

use crate::domain::order::{
    BulkInvoiceResponse, DeliveryUpdateRequest, InvoiceResponse, OrderId, RejectionRequest,
    StatusUpdateRequest,
};
use crate::utils::IsTransient;

pub use http::HttpOrderApi;
pub use memory::{InMemoryOrderApi, InjectedFailure};
pub use types::*;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Order not found: {0}")]
    NotFound(OrderId),

    #[error("Request rejected by server: {0}")]
    Rejected(String),

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Short label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            ApiError::Network(_) => "network",
            ApiError::Timeout => "timeout",
            ApiError::Server { .. } => "server",
            ApiError::NotFound(_) => "not_found",
            ApiError::Rejected(_) => "rejected",
            ApiError::Decode(_) => "decode",
        }
    }
}

impl IsTransient for ApiError {
    fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::Timeout => true,
            ApiError::Server { status, .. } => *status >= 500 || *status == 429,
            ApiError::NotFound(_) | ApiError::Rejected(_) | ApiError::Decode(_) => false,
        }
    }
}

/// Request/response calls against the order backend. Each of the mutating
/// calls obliges the backend to notify the customer.
#[async_trait]
pub trait OrderApi: Send + Sync {
    async fn update_status(
        &self,
        order_id: &OrderId,
        request: &StatusUpdateRequest,
    ) -> Result<StatusUpdateResponse, ApiError>;

    async fn reject(
        &self,
        order_id: &OrderId,
        request: &RejectionRequest,
    ) -> Result<RejectionResponse, ApiError>;

    async fn send_invoice(&self, order_id: &OrderId) -> Result<InvoiceResponse, ApiError>;

    async fn send_invoices_bulk(&self, order_ids: &[OrderId]) -> Result<BulkInvoiceResponse, ApiError>;

    async fn update_delivery(
        &self,
        order_id: &OrderId,
        request: &DeliveryUpdateRequest,
    ) -> Result<DeliveryUpdateResponse, ApiError>;

    async fn list_orders(&self, query: &ListQuery) -> Result<OrderPage, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ApiError::Timeout.is_transient());
        assert!(ApiError::Network("reset".into()).is_transient());
        assert!(ApiError::Server { status: 503, message: String::new() }.is_transient());
        assert!(ApiError::Server { status: 429, message: String::new() }.is_transient());
        assert!(!ApiError::Server { status: 400, message: String::new() }.is_transient());
        assert!(!ApiError::Rejected("already invoiced".into()).is_transient());
        assert!(!ApiError::NotFound(OrderId::new("x")).is_transient());
    }
}
