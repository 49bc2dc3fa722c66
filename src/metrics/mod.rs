use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

// ============================================================================
// Metrics Module - Prometheus metrics for the order desk
// ============================================================================
//
// Provides metrics for:
// - Order mutations (commits, failures, in-flight rejections, latency)
// - Local validation failures
// - List query outcomes (applied, superseded, cancelled, failed)
// - Bulk invoice entries
// - Queued customer notifications
//
// The embedding application decides how to expose the registry.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Mutation Metrics
    pub mutations_committed: IntCounterVec,
    pub mutations_failed: IntCounterVec,
    pub mutations_busy: IntCounterVec,
    pub validation_errors: IntCounterVec,
    pub mutation_duration: HistogramVec,

    // Query Metrics
    pub query_outcomes: IntCounterVec,

    // Invoicing Metrics
    pub bulk_invoice_entries: IntCounterVec,

    // Outbox Metrics
    pub notifications_queued: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let mutations_committed = IntCounterVec::new(
            Opts::new("order_mutations_committed_total", "Order mutations confirmed by the backend"),
            &["action"],
        )?;
        registry.register(Box::new(mutations_committed.clone()))?;

        let mutations_failed = IntCounterVec::new(
            Opts::new("order_mutations_failed_total", "Order mutations that failed at the backend"),
            &["action", "reason"],
        )?;
        registry.register(Box::new(mutations_failed.clone()))?;

        let mutations_busy = IntCounterVec::new(
            Opts::new("order_mutations_busy_total", "Mutations refused while the same action was in flight"),
            &["action"],
        )?;
        registry.register(Box::new(mutations_busy.clone()))?;

        let validation_errors = IntCounterVec::new(
            Opts::new("order_validation_errors_total", "Mutations refused by local validation"),
            &["action"],
        )?;
        registry.register(Box::new(validation_errors.clone()))?;

        let mutation_duration = HistogramVec::new(
            HistogramOpts::new("order_mutation_duration_seconds", "Backend round trip per mutation")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["action"],
        )?;
        registry.register(Box::new(mutation_duration.clone()))?;

        let query_outcomes = IntCounterVec::new(
            Opts::new("order_query_outcomes_total", "List query outcomes"),
            &["outcome"],
        )?;
        registry.register(Box::new(query_outcomes.clone()))?;

        let bulk_invoice_entries = IntCounterVec::new(
            Opts::new("order_bulk_invoice_entries_total", "Per-order results of bulk invoicing"),
            &["result"],
        )?;
        registry.register(Box::new(bulk_invoice_entries.clone()))?;

        let notifications_queued = IntCounter::new(
            "order_notifications_queued_total",
            "Customer notifications written to the outbox",
        )?;
        registry.register(Box::new(notifications_queued.clone()))?;

        Ok(Self {
            registry,
            mutations_committed,
            mutations_failed,
            mutations_busy,
            validation_errors,
            mutation_duration,
            query_outcomes,
            bulk_invoice_entries,
            notifications_queued,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of every registered metric
    pub fn encode(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn record_commit(&self, action: &str, duration_secs: f64) {
        self.mutations_committed.with_label_values(&[action]).inc();
        self.mutation_duration.with_label_values(&[action]).observe(duration_secs);
    }

    pub fn record_failure(&self, action: &str, reason: &str, duration_secs: f64) {
        self.mutations_failed.with_label_values(&[action, reason]).inc();
        self.mutation_duration.with_label_values(&[action]).observe(duration_secs);
    }

    pub fn record_busy(&self, action: &str) {
        self.mutations_busy.with_label_values(&[action]).inc();
    }

    pub fn record_validation_error(&self, action: &str) {
        self.validation_errors.with_label_values(&[action]).inc();
    }

    pub fn record_query(&self, outcome: &str) {
        self.query_outcomes.with_label_values(&[outcome]).inc();
    }

    pub fn record_bulk_entries(&self, succeeded: usize, failed: usize) {
        self.bulk_invoice_entries.with_label_values(&["success"]).inc_by(succeeded as u64);
        self.bulk_invoice_entries.with_label_values(&["error"]).inc_by(failed as u64);
    }

    pub fn record_notification(&self) {
        self.notifications_queued.inc();
    }
}
