use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::api::{ApiError, ListQuery, OrderApi};
use crate::coordinator::{Busy, QueryOutcome, RequestCoordinator};
use crate::metrics::Metrics;
use crate::outbox::NotificationOutbox;
use crate::store::OrderStore;
use crate::utils::{retry_on_transient, RetryConfig};

use super::aggregate::{Order, OrderPatch};
use super::commands::{ActionKind, OrderCommand};
use super::delivery::{DeliveryScheduler, DeliveryUpdateRequest};
use super::errors::OrderError;
use super::events::{
    OrderDeliveryRescheduled, OrderEvent, OrderInvoiced, OrderRejected, OrderStatusChanged,
};
use super::invoicing::{BulkInvoiceReport, BulkOutcome, InvoiceDispatcher};
use super::rejection::{RejectionHandler, RejectionRequest};
use super::transitions::{StatusTransitionEngine, StatusUpdateRequest, Transition};
use super::value_objects::{DeliveryInfo, DeliveryProvenance, DeliverySelection, OrderId, OrderStatus};

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Orchestrates: Command → Local validation → In-flight permit → Backend
//               → Store patch → Outbox → Metrics
//
// The store is only written after the backend confirmed the change, and
// only with the fields it confirmed.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] OrderError),

    #[error(transparent)]
    Busy(#[from] Busy),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Order is not loaded: {0}")]
    NotFound(OrderId),
}

/// Result of a confirmed single-order mutation
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub correlation_id: Uuid,
    pub event: OrderEvent,
    /// Outbox sequence of the queued notification
    pub notification_sequence: u64,
    /// False when the local record was already newer than the confirmation
    pub store_updated: bool,
}

/// Validated backend call for one command
enum Mutation {
    Status(StatusUpdateRequest),
    Reject(RejectionRequest),
    Invoice,
    Delivery(DeliveryUpdateRequest),
}

pub struct OrderCommandHandler {
    api: Arc<dyn OrderApi>,
    store: Arc<RwLock<OrderStore>>,
    coordinator: Arc<RequestCoordinator>,
    outbox: NotificationOutbox,
    metrics: Arc<Metrics>,
    scheduler: DeliveryScheduler,
    retry: RetryConfig,
}

impl OrderCommandHandler {
    pub fn new(api: Arc<dyn OrderApi>, metrics: Arc<Metrics>) -> Self {
        Self {
            api,
            store: Arc::new(RwLock::new(OrderStore::new())),
            coordinator: Arc::new(RequestCoordinator::new()),
            outbox: NotificationOutbox::new(),
            metrics,
            scheduler: DeliveryScheduler::default(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_scheduler(mut self, scheduler: DeliveryScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &Arc<RwLock<OrderStore>> {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<RequestCoordinator> {
        &self.coordinator
    }

    pub fn outbox(&self) -> &NotificationOutbox {
        &self.outbox
    }

    async fn snapshot(&self, order_id: &OrderId) -> Result<Order, DispatchError> {
        self.store
            .read()
            .await
            .get(order_id)
            .cloned()
            .ok_or_else(|| DispatchError::NotFound(order_id.clone()))
    }

    /// Classification the operator would be asked to confirm
    pub async fn preview_transition(
        &self,
        order_id: &OrderId,
        target: OrderStatus,
    ) -> Result<Transition, DispatchError> {
        let order = self.snapshot(order_id).await?;
        Ok(StatusTransitionEngine::classify(order.status, target))
    }

    /// Handle a single-order command
    pub async fn handle(
        &self,
        order_id: &OrderId,
        command: OrderCommand,
    ) -> Result<CommandOutcome, DispatchError> {
        let action = command.action();
        let order = self.snapshot(order_id).await?;

        let mutation = match self.validate(&order, &command) {
            Ok(mutation) => mutation,
            Err(e) => {
                tracing::info!(order_id = %order_id, action = %action, error = %e, "Command refused locally");
                self.metrics.record_validation_error(action.as_str());
                return Err(e.into());
            }
        };

        let _permit = self.coordinator.begin_mutation(order_id, action).map_err(|busy| {
            self.metrics.record_busy(action.as_str());
            busy
        })?;

        let correlation_id = Uuid::new_v4();
        let started = Instant::now();

        let (patch, event) = match self.commit(&order, mutation).await {
            Ok(confirmed) => confirmed,
            Err(e) => {
                tracing::warn!(
                    order_id = %order_id,
                    action = %action,
                    error = %e,
                    "❌ Mutation failed, store unchanged"
                );
                self.metrics.record_failure(action.as_str(), e.reason(), started.elapsed().as_secs_f64());
                return Err(e.into());
            }
        };

        let store_updated = self.store.write().await.apply_patch(order_id, &patch);
        let notification_sequence = self
            .outbox
            .record(order_id.clone(), event.clone(), correlation_id)
            .await;

        self.metrics.record_commit(action.as_str(), started.elapsed().as_secs_f64());
        self.metrics.record_notification();

        tracing::info!(
            order_id = %order_id,
            action = %action,
            event = event.name(),
            correlation_id = %correlation_id,
            "✅ Mutation confirmed"
        );

        Ok(CommandOutcome {
            correlation_id,
            event,
            notification_sequence,
            store_updated,
        })
    }

    /// Local rules for each command. Nothing here touches the network.
    fn validate(&self, order: &Order, command: &OrderCommand) -> Result<Mutation, OrderError> {
        let now = Utc::now();

        match command {
            OrderCommand::ChangeStatus { target, skip_confirmed, delivery } => {
                let delivery = delivery
                    .as_ref()
                    .map(|selection| self.scheduler.resolve(selection, DeliveryProvenance::Transition, now))
                    .transpose()?;
                let request =
                    StatusTransitionEngine::plan(order.status, *target, *skip_confirmed, delivery)?;
                Ok(Mutation::Status(request))
            }
            OrderCommand::Reject { reason } => {
                Ok(Mutation::Reject(RejectionHandler::prepare(order.status, reason)?))
            }
            OrderCommand::SendInvoice => {
                InvoiceDispatcher::check(order.status, order.is_invoiced)?;
                Ok(Mutation::Invoice)
            }
            OrderCommand::RescheduleDelivery { selection, reason } => {
                if order.is_closed() {
                    return Err(OrderError::OrderClosed(order.status));
                }
                Ok(Mutation::Delivery(self.scheduler.reschedule_request(selection, reason, now)?))
            }
        }
    }

    /// Issue the backend call and translate its confirmation
    async fn commit(
        &self,
        order: &Order,
        mutation: Mutation,
    ) -> Result<(OrderPatch, OrderEvent), ApiError> {
        match mutation {
            Mutation::Status(request) => {
                let response = self.api.update_status(&order.id, &request).await?;
                let confirmed = response.order;
                let patch = OrderPatch::StatusUpdated {
                    status: confirmed.status,
                    delivery: request.delivery.clone(),
                    last_updated: confirmed.last_updated,
                };
                let event = OrderEvent::StatusChanged(OrderStatusChanged {
                    from: order.status,
                    to: confirmed.status,
                    skipped: request.skipped_statuses,
                    delivery: request.delivery,
                });
                Ok((patch, event))
            }
            Mutation::Reject(request) => {
                let confirmed = self.api.reject(&order.id, &request).await?.order;
                let patch = OrderPatch::Rejected {
                    reason: confirmed.rejection_reason.clone(),
                    rejected_at: confirmed.rejected_at,
                    last_updated: confirmed.last_updated,
                };
                let event = OrderEvent::Rejected(OrderRejected {
                    reason: confirmed.rejection_reason,
                    rejected_at: confirmed.rejected_at,
                });
                Ok((patch, event))
            }
            Mutation::Invoice => {
                let response = self.api.send_invoice(&order.id).await?;
                let invoice_number = match response.invoice_number {
                    Some(number) if response.success => number,
                    _ => return Err(ApiError::Rejected("Invoice was not issued".to_string())),
                };
                let patch = OrderPatch::Invoiced { invoice_number: invoice_number.clone() };
                let event = OrderEvent::Invoiced(OrderInvoiced { invoice_number });
                Ok((patch, event))
            }
            Mutation::Delivery(request) => {
                let response = self.api.update_delivery(&order.id, &request).await?;
                let delivery = self.scheduler.confirmed(&response.new_delivery, order.delivery.as_ref());
                let event = OrderEvent::DeliveryRescheduled(OrderDeliveryRescheduled {
                    expected_delivery: response.new_delivery.expected_delivery,
                    time_slot: response.new_delivery.delivery_time_slot,
                    reason: request.reason,
                });
                let patch = OrderPatch::DeliveryRescheduled {
                    delivery,
                    last_updated: response.order.last_updated,
                };
                Ok((patch, event))
            }
        }
    }

    // ========================================================================
    // Bulk invoicing
    // ========================================================================

    /// Invoice several orders in one backend call. Each member succeeds or
    /// fails on its own; only successful members are patched.
    pub async fn send_invoices(&self, order_ids: &[OrderId]) -> Result<BulkInvoiceReport, DispatchError> {
        let batch = InvoiceDispatcher::prepare_batch(order_ids).map_err(|e| {
            self.metrics.record_validation_error(ActionKind::Invoice.as_str());
            e
        })?;

        let _permits = self
            .coordinator
            .begin_bulk_mutation(&batch, ActionKind::Invoice)
            .map_err(|busy| {
                self.metrics.record_busy(ActionKind::Invoice.as_str());
                busy
            })?;

        let correlation_id = Uuid::new_v4();
        let started = Instant::now();

        let response = match self.api.send_invoices_bulk(&batch).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(orders = batch.len(), error = %e, "❌ Bulk invoice request failed");
                self.metrics.record_failure("invoice_bulk", e.reason(), started.elapsed().as_secs_f64());
                return Err(e.into());
            }
        };

        let report = BulkInvoiceReport::reconcile(&batch, response);

        // Reconciliation guarantees every success carries its number
        let invoiced = report
            .succeeded()
            .filter_map(|r| r.invoice_number.clone().map(|number| (r, number)));

        for (result, invoice_number) in invoiced {

            {
                let mut store = self.store.write().await;
                store.apply_patch(
                    &result.order_id,
                    &OrderPatch::Invoiced { invoice_number: invoice_number.clone() },
                );
                store.deselect(&result.order_id);
            }

            self.outbox
                .record(
                    result.order_id.clone(),
                    OrderEvent::Invoiced(OrderInvoiced { invoice_number }),
                    correlation_id,
                )
                .await;
            self.metrics.record_notification();
        }

        self.metrics.record_commit("invoice_bulk", started.elapsed().as_secs_f64());
        self.metrics
            .record_bulk_entries(report.summary.success_count, report.summary.error_count);

        match report.outcome() {
            BulkOutcome::AllSucceeded => tracing::info!(
                invoiced = report.summary.success_count,
                "✅ Bulk invoicing complete"
            ),
            BulkOutcome::Partial => tracing::warn!(
                invoiced = report.summary.success_count,
                failed = report.summary.error_count,
                "⚠️  Bulk invoicing partially failed"
            ),
            BulkOutcome::AllFailed => tracing::warn!(
                failed = report.summary.error_count,
                "❌ Bulk invoicing failed for every order"
            ),
        }

        Ok(report)
    }

    /// Bulk-invoice whatever is currently selected in the store
    pub async fn send_invoices_for_selection(&self) -> Result<BulkInvoiceReport, DispatchError> {
        let selected = self.store.read().await.selected_ids();
        self.send_invoices(&selected).await
    }

    // ========================================================================
    // Listing
    // ========================================================================

    /// Reload the page. Supersedes any listing still in flight; transient
    /// failures are retried.
    pub async fn refresh(&self, query: ListQuery) -> QueryOutcome {
        let api = self.api.clone();
        let retry = self.retry.clone();

        let outcome = self
            .coordinator
            .run_query(&self.store, async move {
                retry_on_transient(&retry, "list_orders", |_attempt| {
                    let api = api.clone();
                    let query = query.clone();
                    async move { api.list_orders(&query).await }
                })
                .await
                .into_result()
            })
            .await;

        self.metrics.record_query(outcome.label());
        tracing::debug!(outcome = outcome.label(), "List query finished");
        outcome
    }

    /// Resolve a delivery selection without committing it
    pub fn preview_delivery(&self, selection: &DeliverySelection) -> Result<DeliveryInfo, OrderError> {
        self.scheduler.resolve(selection, DeliveryProvenance::Transition, Utc::now())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
