pub mod api;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod metrics;
pub mod outbox;
pub mod store;
pub mod utils;
