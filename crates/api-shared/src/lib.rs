//! # API Shared
//!
//! Shared wire types and utilities for the SLM REST API.
//!
//! Contains:
//! - Request/response DTOs with their OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//!
//! Used by the `slm-run` server binary and its integration tests.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
