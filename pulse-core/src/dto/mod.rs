//! Data Transfer Objects
//!
//! Lightweight shapes shared between the service layer and the API:
//! trigger acknowledgements, polling responses, and lease results.

pub mod lease;
pub mod metric;
