//! Service Module
//!
//! Business logic layer for the server.
//! Services orchestrate between the store, the pipeline executor, and the
//! API handlers.

pub mod lease;
pub mod metric;

// Re-export for convenience
pub use lease as lease_service;
pub use metric as metric_service;
