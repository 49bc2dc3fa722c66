use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::errors::OrderError;
use super::value_objects::{OrderId, OrderStatus};

// ============================================================================
// Invoicing
// ============================================================================
//
// `isInvoiced` is independent of the status progression: an order can be
// invoiced while confirmed, in transit or delivered. Bulk invoicing is not
// atomic; each member succeeds or fails on its own.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub success: bool,
    #[serde(default)]
    pub invoice_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResult {
    pub order_id: OrderId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    pub success_count: usize,
    pub error_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkInvoiceResponse {
    pub success: bool,
    pub summary: InvoiceSummary,
    pub results: Vec<InvoiceResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOutcome {
    AllSucceeded,
    Partial,
    AllFailed,
}

/// Bulk result reconciled against the ids the operator asked for
#[derive(Debug, Clone, PartialEq)]
pub struct BulkInvoiceReport {
    pub results: Vec<InvoiceResult>,
    pub summary: InvoiceSummary,
}

impl BulkInvoiceReport {
    /// One entry per requested id, in request order. Ids the server did not
    /// report on count as failures; results for ids we never asked about
    /// are dropped.
    pub fn reconcile(requested: &[OrderId], response: BulkInvoiceResponse) -> Self {
        let mut by_id: HashMap<OrderId, InvoiceResult> = response
            .results
            .into_iter()
            .map(|r| (r.order_id.clone(), r))
            .collect();

        let results: Vec<InvoiceResult> = requested
            .iter()
            .map(|id| match by_id.remove(id) {
                // Success without an invoice number cannot be recorded
                Some(result) if result.success && result.invoice_number.is_none() => InvoiceResult {
                    success: false,
                    error: Some("succeeded without invoice number".to_string()),
                    ..result
                },
                Some(result) => result,
                None => InvoiceResult {
                    order_id: id.clone(),
                    success: false,
                    invoice_number: None,
                    error: Some("missing from server response".to_string()),
                },
            })
            .collect();

        let summary = Self::summarize(&results);
        if summary != response.summary {
            tracing::warn!(
                reported_success = response.summary.success_count,
                reported_errors = response.summary.error_count,
                success = summary.success_count,
                errors = summary.error_count,
                "Bulk invoice summary disagrees with per-order results, using results"
            );
        }

        Self { results, summary }
    }

    fn summarize(results: &[InvoiceResult]) -> InvoiceSummary {
        let success_count = results.iter().filter(|r| r.success).count();
        InvoiceSummary {
            success_count,
            error_count: results.len() - success_count,
        }
    }

    pub fn outcome(&self) -> BulkOutcome {
        match (self.summary.success_count, self.summary.error_count) {
            (_, 0) => BulkOutcome::AllSucceeded,
            (0, _) => BulkOutcome::AllFailed,
            _ => BulkOutcome::Partial,
        }
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &InvoiceResult> {
        self.results.iter().filter(|r| r.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &InvoiceResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

pub struct InvoiceDispatcher;

impl InvoiceDispatcher {
    pub fn is_invoiceable(status: OrderStatus) -> bool {
        matches!(
            status,
            OrderStatus::OrderConfirmed | OrderStatus::InTransit | OrderStatus::Delivered
        )
    }

    pub fn check(status: OrderStatus, is_invoiced: bool) -> Result<(), OrderError> {
        if is_invoiced {
            return Err(OrderError::AlreadyInvoiced);
        }
        if !Self::is_invoiceable(status) {
            return Err(OrderError::NotInvoiceable(status));
        }
        Ok(())
    }

    /// De-duplicate a bulk selection while keeping its order
    pub fn prepare_batch(ids: &[OrderId]) -> Result<Vec<OrderId>, OrderError> {
        let mut seen = std::collections::HashSet::new();
        let batch: Vec<OrderId> = ids
            .iter()
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect();

        if batch.is_empty() {
            return Err(OrderError::EmptySelection);
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<OrderId> {
        raw.iter().map(|s| OrderId::new(*s)).collect()
    }

    fn ok(id: &str, number: &str) -> InvoiceResult {
        InvoiceResult {
            order_id: OrderId::new(id),
            success: true,
            invoice_number: Some(number.to_string()),
            error: None,
        }
    }

    fn failed(id: &str) -> InvoiceResult {
        InvoiceResult {
            order_id: OrderId::new(id),
            success: false,
            invoice_number: None,
            error: Some("not invoiceable".to_string()),
        }
    }

    #[test]
    fn test_invoiceable_statuses() {
        assert!(InvoiceDispatcher::check(OrderStatus::OrderConfirmed, false).is_ok());
        assert!(InvoiceDispatcher::check(OrderStatus::InTransit, false).is_ok());
        assert!(InvoiceDispatcher::check(OrderStatus::Delivered, false).is_ok());

        assert_eq!(
            InvoiceDispatcher::check(OrderStatus::OrderPlaced, false),
            Err(OrderError::NotInvoiceable(OrderStatus::OrderPlaced))
        );
        assert_eq!(
            InvoiceDispatcher::check(OrderStatus::Rejected, false),
            Err(OrderError::NotInvoiceable(OrderStatus::Rejected))
        );
        assert_eq!(
            InvoiceDispatcher::check(OrderStatus::Delivered, true),
            Err(OrderError::AlreadyInvoiced)
        );
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        assert_eq!(InvoiceDispatcher::prepare_batch(&[]), Err(OrderError::EmptySelection));
    }

    #[test]
    fn test_batch_dedup_keeps_order() {
        let batch = InvoiceDispatcher::prepare_batch(&ids(&["b", "a", "b", "c"])).unwrap();
        assert_eq!(batch, ids(&["b", "a", "c"]));
    }

    #[test]
    fn test_partial_failure_report() {
        let requested = ids(&["o1", "o2", "o3"]);
        let response = BulkInvoiceResponse {
            success: true,
            summary: InvoiceSummary { success_count: 2, error_count: 1 },
            results: vec![ok("o1", "INV-1"), failed("o2"), ok("o3", "INV-3")],
        };

        let report = BulkInvoiceReport::reconcile(&requested, response);
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.summary, InvoiceSummary { success_count: 2, error_count: 1 });
        assert_eq!(report.outcome(), BulkOutcome::Partial);
        assert_eq!(report.succeeded().count(), report.summary.success_count);
    }

    #[test]
    fn test_missing_and_unknown_entries() {
        let requested = ids(&["o1", "o2"]);
        let response = BulkInvoiceResponse {
            success: true,
            summary: InvoiceSummary { success_count: 2, error_count: 0 },
            results: vec![ok("o1", "INV-1"), ok("stranger", "INV-9")],
        };

        let report = BulkInvoiceReport::reconcile(&requested, response);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[1].order_id, OrderId::new("o2"));
        assert!(!report.results[1].success);
        assert_eq!(report.summary, InvoiceSummary { success_count: 1, error_count: 1 });
    }

    #[test]
    fn test_success_without_invoice_number_counts_as_failed() {
        let requested = ids(&["o1", "o2"]);
        let mut unnumbered = ok("o2", "unused");
        unnumbered.invoice_number = None;
        let response = BulkInvoiceResponse {
            success: true,
            summary: InvoiceSummary { success_count: 2, error_count: 0 },
            results: vec![ok("o1", "INV-1"), unnumbered],
        };

        let report = BulkInvoiceReport::reconcile(&requested, response);
        assert_eq!(report.summary, InvoiceSummary { success_count: 1, error_count: 1 });
        assert_eq!(report.outcome(), BulkOutcome::Partial);
        assert!(!report.results[1].success);
        assert_eq!(report.results[1].error.as_deref(), Some("succeeded without invoice number"));
        assert!(report.succeeded().all(|r| r.invoice_number.is_some()));
    }

    #[test]
    fn test_outcome_classification() {
        let requested = ids(&["o1", "o2"]);
        let all_ok = BulkInvoiceReport::reconcile(
            &requested,
            BulkInvoiceResponse {
                success: true,
                summary: InvoiceSummary { success_count: 2, error_count: 0 },
                results: vec![ok("o1", "A"), ok("o2", "B")],
            },
        );
        assert_eq!(all_ok.outcome(), BulkOutcome::AllSucceeded);

        let all_failed = BulkInvoiceReport::reconcile(
            &requested,
            BulkInvoiceResponse {
                success: false,
                summary: InvoiceSummary { success_count: 0, error_count: 2 },
                results: vec![failed("o1")],
            },
        );
        assert_eq!(all_failed.outcome(), BulkOutcome::AllFailed);
        assert_eq!(all_failed.summary.error_count, 2);
    }

    #[test]
    fn test_bulk_response_wire_format() {
        let json = r#"{
            "success": true,
            "summary": {"successCount": 1, "errorCount": 1},
            "results": [
                {"orderId": "o1", "success": true, "invoiceNumber": "INV-2026-00001"},
                {"orderId": "o2", "success": false, "error": "already invoiced"}
            ]
        }"#;

        let response: BulkInvoiceResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.summary.success_count, 1);
        assert_eq!(response.results[0].invoice_number.as_deref(), Some("INV-2026-00001"));
        assert_eq!(response.results[1].error.as_deref(), Some("already invoiced"));
    }
}
