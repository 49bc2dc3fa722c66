// ============================================================================
// Order Domain - lifecycle rules for a wholesale order
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (OrderId, OrderStatus, DeliveryInfo, time slots)
// - Aggregate (Order summary and the patches confirmed by the backend)
// - Rules (status transitions, delivery scheduling, rejection, invoicing)
// - Commands and Events (operator intent, post-commit notifications)
// - Errors (OrderError enum)
// - Command Handler (OrderCommandHandler)
//
// ============================================================================

pub mod value_objects;
pub mod aggregate;
pub mod transitions;
pub mod delivery;
pub mod rejection;
pub mod invoicing;
pub mod commands;
pub mod events;
pub mod errors;
pub mod command_handler;

// Re-export for convenience
pub use value_objects::*;
pub use aggregate::*;
pub use transitions::*;
pub use delivery::*;
pub use rejection::*;
pub use invoicing::*;
pub use commands::*;
pub use events::*;
pub use errors::*;
pub use command_handler::*;
