use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_desk::api::{HttpOrderApi, InMemoryOrderApi, InjectedFailure, OrderApi};
use order_desk::config::AdminConfig;
use order_desk::coordinator::QueryOutcome;
use order_desk::domain::order::{
    CustomerRef, DeliveryDateType, DeliverySelection, DeliveryTimeSlot, Order, OrderCommand,
    OrderCommandHandler, OrderId, OrderStatus, Transition,
};
use order_desk::metrics::Metrics;
use order_desk::outbox::serialize_event;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_desk=debug"))
        )
        .init();

    tracing::info!("🚀 Starting Order Desk");

    // === 1. Configuration ===
    // With a config file the real backend is only listed, never mutated
    let config_path = std::env::args().nth(1);
    let config = match &config_path {
        Some(path) => AdminConfig::load(path)?,
        None => {
            tracing::info!("No config file given, using defaults and the in-memory backend");
            AdminConfig::default()
        }
    };

    // === 2. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    let scheduler = config.scheduler()?;

    if config_path.is_some() {
        let api: Arc<dyn OrderApi> = Arc::new(HttpOrderApi::new(&config.api)?);
        let handler = OrderCommandHandler::new(api, metrics.clone())
            .with_scheduler(scheduler)
            .with_retry(config.retry_config());

        match handler.refresh(config.default_query()).await {
            QueryOutcome::Applied => {
                let store = handler.store().read().await;
                tracing::info!(
                    "✅ Loaded {} of {} orders from {}",
                    store.orders().len(),
                    store.pagination().total,
                    config.api.base_url
                );
                for order in store.orders() {
                    tracing::info!("   {} {} {}", order.order_number, order.status, order.customer.name);
                }
            }
            other => tracing::error!("❌ Listing failed: {:?}", other),
        }
        return Ok(());
    }

    // === 3. In-memory backend seeded with demo orders ===
    let backend = InMemoryOrderApi::new(demo_orders()).with_scheduler(scheduler);
    backend.inject(InjectedFailure::InvoiceFor(OrderId::new("WO-1004"))).await;

    let handler = OrderCommandHandler::new(Arc::new(backend), metrics.clone())
        .with_scheduler(scheduler)
        .with_retry(config.retry_config());

    let outcome = handler.refresh(config.default_query()).await;
    tracing::info!("📋 Initial listing: {:?}", outcome);

    // === 4. Walk an order through its lifecycle ===
    let first = OrderId::new("WO-1001");

    handler
        .handle(&first, OrderCommand::ChangeStatus {
            target: OrderStatus::OrderConfirmed,
            skip_confirmed: false,
            delivery: None,
        })
        .await?;
    tracing::info!("✅ {} confirmed", first);

    let tomorrow_morning =
        DeliverySelection::relative(DeliveryDateType::Tomorrow, DeliveryTimeSlot::Morning);
    if let Some(range) = handler.preview_delivery(&tomorrow_morning)?.estimated_range {
        tracing::info!("🕘 Delivery window {} - {}", range.earliest, range.latest);
    }
    handler
        .handle(&first, OrderCommand::ChangeStatus {
            target: OrderStatus::InTransit,
            skip_confirmed: false,
            delivery: Some(tomorrow_morning),
        })
        .await?;
    tracing::info!("🚚 {} in transit", first);

    handler
        .handle(&first, OrderCommand::RescheduleDelivery {
            selection: DeliverySelection::relative(
                DeliveryDateType::DayAfterTomorrow,
                DeliveryTimeSlot::Afternoon,
            ),
            reason: "Receiving dock closed tomorrow".to_string(),
        })
        .await?;
    tracing::info!("📅 {} delivery moved", first);

    handler.handle(&first, OrderCommand::SendInvoice).await?;
    tracing::info!("🧾 {} invoiced", first);

    // === 5. Skip ahead with explicit confirmation ===
    let second = OrderId::new("WO-1002");
    if let Transition::SkipAhead { skipped } =
        handler.preview_transition(&second, OrderStatus::Delivered).await?
    {
        tracing::info!("⚠️  Skipping {:?} for {}", skipped, second);
    }
    handler
        .handle(&second, OrderCommand::ChangeStatus {
            target: OrderStatus::Delivered,
            skip_confirmed: true,
            delivery: None,
        })
        .await?;

    // === 6. Reject ===
    let third = OrderId::new("WO-1003");
    if let Err(e) = handler
        .handle(&third, OrderCommand::Reject { reason: "  ".to_string() })
        .await
    {
        tracing::info!("🛑 Refused locally: {}", e);
    }
    handler
        .handle(&third, OrderCommand::Reject { reason: "Wrong delivery address".to_string() })
        .await?;
    tracing::info!("🛑 {} rejected", third);

    // === 7. Bulk invoice the selection, one member fails ===
    handler.store().write().await.select_all_visible();
    let report = handler.send_invoices_for_selection().await?;
    tracing::info!(
        "🧾 Bulk invoicing: {} succeeded, {} failed ({:?})",
        report.summary.success_count,
        report.summary.error_count,
        report.outcome()
    );
    for failure in report.failed() {
        tracing::warn!("   {} failed: {}", failure.order_id, failure.error.as_deref().unwrap_or("unknown"));
    }

    // === 8. Hand notifications to the notifier ===
    for envelope in handler.outbox().drain().await {
        tracing::info!("📬 #{} {}", envelope.sequence_number, serialize_event(&envelope)?);
    }

    tracing::info!("📊 Metrics:\n{}", metrics.encode()?);
    tracing::info!("🎉 Demo complete!");

    Ok(())
}

fn demo_orders() -> Vec<Order> {
    let now = Utc::now();
    let customers = [
        ("c-1", "Harbor Foods"),
        ("c-2", "Corner Deli"),
        ("c-3", "Northside Bakery"),
        ("c-4", "Riverside Market"),
    ];
    let statuses = [
        OrderStatus::OrderPlaced,
        OrderStatus::OrderPlaced,
        OrderStatus::Delivered,
        OrderStatus::OrderConfirmed,
    ];

    customers
        .iter()
        .zip(statuses)
        .enumerate()
        .map(|(i, ((customer_id, name), status))| {
            let placed_at = now - Duration::hours(24 - i as i64);
            Order {
                id: OrderId::new(format!("WO-100{}", i + 1)),
                order_number: format!("WO-100{}", i + 1),
                placed_at,
                total_amount: 250.0 * (i + 1) as f64,
                customer: CustomerRef {
                    id: customer_id.to_string(),
                    name: name.to_string(),
                    email: None,
                },
                status,
                is_invoiced: false,
                invoice_number: None,
                rejection_reason: None,
                rejected_at: None,
                delivery: None,
                last_updated: placed_at,
            }
        })
        .collect()
}
