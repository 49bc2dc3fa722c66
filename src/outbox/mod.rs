// ============================================================================
// Outbox - post-commit notification events
// ============================================================================
//
// Generic envelope plus the in-process queue that collects the
// notification obligations raised by confirmed order mutations.
//
// ============================================================================

mod envelope;
mod queue;

pub use envelope::{serialize_event, DomainEvent, EventEnvelope};
pub use queue::NotificationOutbox;
