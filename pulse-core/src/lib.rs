//! Pulse Core
//!
//! Core types and abstractions for the Pulse metric pipeline.
//!
//! This crate contains:
//! - Domain types: Core business entities (Metric, PipelineRun, etc.)
//! - Pipeline vocabulary: step catalog, pipeline variants, variant detection
//! - DTOs: Data transfer objects shared between the service layer and the API

pub mod domain;
pub mod dto;
pub mod pipeline;
