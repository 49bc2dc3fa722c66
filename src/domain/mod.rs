// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Pure rules and their orchestration. Transport, caching and request
// coordination live outside and are reached through the command handler.
//
// ============================================================================

pub mod order;
