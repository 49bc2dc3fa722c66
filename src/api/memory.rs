use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{
    ApiError, ConfirmedClock, ConfirmedRejection, ConfirmedStatus, DeliveryUpdateResponse,
    ListQuery, OrderApi, OrderPage, Pagination, RejectionResponse, SortField, SortOrder,
    StatusUpdateResponse,
};
use crate::domain::order::{
    BulkInvoiceResponse, DeliveryProvenance, DeliveryScheduler, DeliverySelection,
    DeliveryUpdateRequest, InvoiceDispatcher, InvoiceResponse, InvoiceResult, InvoiceSummary,
    Order, OrderId, OrderStatus, RejectionHandler, RejectionRequest, RescheduledDelivery,
    StatusTransitionEngine, StatusUpdateRequest,
};

// ============================================================================
// In-Memory Order Backend
// ============================================================================
//
// Enforces the same rules as the real backend so the client can be driven
// end to end without a network: forward-only status moves, terminal
// rejection, single invoice numbers, per-order bulk results. Supports
// artificial latency and failure injection.
//
// ============================================================================

#[derive(Debug, Clone)]
pub enum InjectedFailure {
    /// The next call, whatever it is, fails with this error
    NextCall(ApiError),
    /// Invoicing this order fails, alone or inside a batch
    InvoiceFor(OrderId),
}

#[derive(Default)]
struct ServerState {
    orders: BTreeMap<OrderId, Order>,
    invoice_sequence: u32,
    clock: Option<DateTime<Utc>>,
    next_call_failure: Option<ApiError>,
    invoice_failures: HashSet<OrderId>,
    calls: HashMap<&'static str, usize>,
}

impl ServerState {
    /// Strictly increasing server timestamp
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.clock {
            Some(last) if last >= now => last + ChronoDuration::milliseconds(1),
            _ => now,
        };
        self.clock = Some(next);
        next
    }

    fn order_mut(&mut self, order_id: &OrderId) -> Result<&mut Order, ApiError> {
        self.orders
            .get_mut(order_id)
            .ok_or_else(|| ApiError::NotFound(order_id.clone()))
    }

    fn issue_invoice(&mut self, order_id: &OrderId) -> Result<String, ApiError> {
        if self.invoice_failures.contains(order_id) {
            return Err(ApiError::Server {
                status: 500,
                message: "invoice generation failed".to_string(),
            });
        }

        let order = self.order_mut(order_id)?;
        InvoiceDispatcher::check(order.status, order.is_invoiced)
            .map_err(|e| ApiError::Rejected(e.to_string()))?;

        self.invoice_sequence += 1;
        let number = format!("INV-{}-{:05}", Utc::now().year(), self.invoice_sequence);

        let order = self.order_mut(order_id)?;
        order.is_invoiced = true;
        order.invoice_number = Some(number.clone());
        Ok(number)
    }
}

#[derive(Clone)]
pub struct InMemoryOrderApi {
    state: Arc<Mutex<ServerState>>,
    latency: Duration,
    listing_delay: Duration,
    scheduler: DeliveryScheduler,
}

impl Default for InMemoryOrderApi {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl InMemoryOrderApi {
    pub fn new(orders: Vec<Order>) -> Self {
        // The server clock never runs behind the records it was seeded with
        let clock = orders.iter().map(|o| o.last_updated).max();
        let state = ServerState {
            orders: orders.into_iter().map(|o| (o.id.clone(), o)).collect(),
            clock,
            ..ServerState::default()
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            latency: Duration::ZERO,
            listing_delay: Duration::ZERO,
            scheduler: DeliveryScheduler::default(),
        }
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Hold list responses for `delay` after the snapshot is taken, so
    /// mutations can land while a stale page is still in flight
    pub fn with_listing_delay(mut self, delay: Duration) -> Self {
        self.listing_delay = delay;
        self
    }

    pub fn with_scheduler(mut self, scheduler: DeliveryScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub async fn inject(&self, failure: InjectedFailure) {
        let mut state = self.state.lock().await;
        match failure {
            InjectedFailure::NextCall(error) => state.next_call_failure = Some(error),
            InjectedFailure::InvoiceFor(order_id) => {
                state.invoice_failures.insert(order_id);
            }
        }
    }

    /// Server-side copy of an order
    pub async fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.state.lock().await.orders.get(order_id).cloned()
    }

    /// Number of times `call` ("update_status", "list_orders", ...) reached the server
    pub async fn call_count(&self, call: &str) -> usize {
        self.state.lock().await.calls.get(call).copied().unwrap_or(0)
    }

    /// Common prologue: latency, call accounting, injected failure
    async fn enter(&self, call: &'static str) -> Result<tokio::sync::MutexGuard<'_, ServerState>, ApiError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut state = self.state.lock().await;
        *state.calls.entry(call).or_insert(0) += 1;

        if let Some(error) = state.next_call_failure.take() {
            tracing::debug!(call = call, error = %error, "Injected failure");
            return Err(error);
        }
        Ok(state)
    }
}

#[async_trait]
impl OrderApi for InMemoryOrderApi {
    async fn update_status(
        &self,
        order_id: &OrderId,
        request: &StatusUpdateRequest,
    ) -> Result<StatusUpdateResponse, ApiError> {
        let mut state = self.enter("update_status").await?;
        let current = state.order_mut(order_id)?.status;

        // Same rules as the client, skips are already acknowledged by the request
        StatusTransitionEngine::plan(current, request.status, true, request.delivery.clone())
            .map_err(|e| ApiError::Rejected(e.to_string()))?;

        let last_updated = state.tick();
        let order = state.order_mut(order_id)?;
        order.status = request.status;
        if let Some(delivery) = &request.delivery {
            order.delivery = Some(delivery.clone());
        }
        if request.status == OrderStatus::Delivered {
            if let Some(delivery) = order.delivery.as_mut() {
                delivery.delivered_at = Some(last_updated);
            }
        }
        order.last_updated = last_updated;

        Ok(StatusUpdateResponse {
            order: ConfirmedStatus { status: order.status, last_updated },
        })
    }

    async fn reject(
        &self,
        order_id: &OrderId,
        request: &RejectionRequest,
    ) -> Result<RejectionResponse, ApiError> {
        let mut state = self.enter("reject").await?;
        let current = state.order_mut(order_id)?.status;

        let request = RejectionHandler::prepare(current, &request.reason)
            .map_err(|e| ApiError::Rejected(e.to_string()))?;

        let now = state.tick();
        let order = state.order_mut(order_id)?;
        order.status = OrderStatus::Rejected;
        order.rejection_reason = Some(request.reason.clone());
        order.rejected_at = Some(now);
        order.last_updated = now;

        Ok(RejectionResponse {
            order: ConfirmedRejection {
                status: OrderStatus::Rejected,
                rejection_reason: request.reason,
                rejected_at: now,
                last_updated: now,
            },
        })
    }

    async fn send_invoice(&self, order_id: &OrderId) -> Result<InvoiceResponse, ApiError> {
        let mut state = self.enter("send_invoice").await?;
        let number = state.issue_invoice(order_id)?;

        Ok(InvoiceResponse { success: true, invoice_number: Some(number) })
    }

    async fn send_invoices_bulk(&self, order_ids: &[OrderId]) -> Result<BulkInvoiceResponse, ApiError> {
        let mut state = self.enter("send_invoices_bulk").await?;

        let results: Vec<InvoiceResult> = order_ids
            .iter()
            .map(|id| match state.issue_invoice(id) {
                Ok(number) => InvoiceResult {
                    order_id: id.clone(),
                    success: true,
                    invoice_number: Some(number),
                    error: None,
                },
                Err(e) => InvoiceResult {
                    order_id: id.clone(),
                    success: false,
                    invoice_number: None,
                    error: Some(e.to_string()),
                },
            })
            .collect();

        let success_count = results.iter().filter(|r| r.success).count();
        Ok(BulkInvoiceResponse {
            success: success_count > 0,
            summary: InvoiceSummary {
                success_count,
                error_count: results.len() - success_count,
            },
            results,
        })
    }

    async fn update_delivery(
        &self,
        order_id: &OrderId,
        request: &DeliveryUpdateRequest,
    ) -> Result<DeliveryUpdateResponse, ApiError> {
        let mut state = self.enter("update_delivery").await?;
        let order = state.order_mut(order_id)?;
        if order.is_closed() {
            return Err(ApiError::Rejected(format!("order is {}", order.status)));
        }

        let selection = DeliverySelection {
            date_type: request.delivery_date_type,
            custom_date: request.custom_delivery_date.clone(),
            time_slot: request.delivery_time_slot,
        };
        let resolved = self
            .scheduler
            .resolve(&selection, DeliveryProvenance::Manual, Utc::now())
            .map_err(|e| ApiError::Rejected(e.to_string()))?;
        let expected = resolved
            .expected_delivery
            .ok_or_else(|| ApiError::Rejected("delivery date could not be resolved".to_string()))?;

        let last_updated = state.tick();
        let order = state.order_mut(order_id)?;
        let delivered_at = order.delivery.as_ref().and_then(|d| d.delivered_at);
        order.delivery = Some(crate::domain::order::DeliveryInfo { delivered_at, ..resolved });
        order.last_updated = last_updated;

        Ok(DeliveryUpdateResponse {
            order: ConfirmedClock { last_updated },
            new_delivery: RescheduledDelivery {
                expected_delivery: expected,
                delivery_time_slot: request.delivery_time_slot,
                delivery_date_type: request.delivery_date_type,
            },
        })
    }

    async fn list_orders(&self, query: &ListQuery) -> Result<OrderPage, ApiError> {
        let page = self.snapshot_page(query).await?;

        if !self.listing_delay.is_zero() {
            tokio::time::sleep(self.listing_delay).await;
        }
        Ok(page)
    }
}

impl InMemoryOrderApi {
    async fn snapshot_page(&self, query: &ListQuery) -> Result<OrderPage, ApiError> {
        let state = self.enter("list_orders").await?;

        let needle = query.search.as_deref().map(str::to_lowercase);
        let mut matching: Vec<Order> = state
            .orders
            .values()
            .filter(|o| query.status.map_or(true, |s| o.status == s))
            .filter(|o| match &needle {
                Some(n) => {
                    o.order_number.to_lowercase().contains(n)
                        || o.customer.name.to_lowercase().contains(n)
                }
                None => true,
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let ordering = match query.sort_by {
                SortField::PlacedAt => a.placed_at.cmp(&b.placed_at),
                SortField::OrderNumber => a.order_number.cmp(&b.order_number),
                SortField::TotalAmount => a.total_amount.total_cmp(&b.total_amount),
                SortField::Status => a.status.index().cmp(&b.status.index()),
                SortField::LastUpdated => a.last_updated.cmp(&b.last_updated),
            };
            match query.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let limit = query.limit.max(1);
        let page = query.page.max(1);
        let total = matching.len() as u64;
        let total_pages = matching.len().div_ceil(limit as usize) as u32;

        let orders = matching
            .into_iter()
            .skip((page as usize - 1).saturating_mul(limit as usize))
            .take(limit as usize)
            .collect();

        Ok(OrderPage {
            orders,
            pagination: Pagination { page, limit, total, total_pages },
        })
    }
}
