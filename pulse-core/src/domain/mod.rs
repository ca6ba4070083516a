//! Core domain types
//!
//! This module contains the core domain structures used across Pulse.
//! These types represent the fundamental business entities and are shared
//! between the API layer, the service layer, and the pipeline executor.

pub mod data;
pub mod lease;
pub mod metric;
pub mod run;
pub mod step_log;
pub mod team;
