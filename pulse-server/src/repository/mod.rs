//! Repository Module
//!
//! Data access layer for the server.
//! Each repository handles database operations for a specific domain entity.

pub mod data;
pub mod lease;
pub mod metric;
pub mod run;
pub mod step_log;
pub mod team;
