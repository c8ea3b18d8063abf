//! # SLM Core
//!
//! Core business logic for the SLM sample lifecycle system.
//!
//! This crate contains the pure domain machinery:
//! - The sample record and its status lifecycle
//! - The status transition engine with its fixed transition table
//! - The reason-gated mutation gate for sensitive mutations
//! - The append-only audit trail recorder
//! - The optimistically-versioned sample store
//! - The bounded-concurrency bulk orchestrator
//!
//! **No API concerns**: HTTP servers, serialization formats for the wire, and
//! OpenAPI documentation belong in the `slm-run` binary and `api-shared`.

pub mod audit;
pub mod bulk;
pub mod config;
pub mod error;
pub mod gate;
pub mod sample;
pub mod service;
pub mod store;
pub mod transition;

/// Logical entity name recorded on every sample audit entry.
pub const AUDIT_ENTITY_SAMPLES: &str = "samples";

pub use audit::{AuditAction, AuditEntry, AuditEntryDraft, AuditTrail};
pub use bulk::{run_bulk, BulkControl, BulkOutcome};
pub use config::{CoreConfig, DEFAULT_MAX_IN_FLIGHT};
pub use error::{PreconditionKind, SampleError, SampleResult};
pub use gate::{require_reason, MutationIntent, PendingMutation};
pub use sample::{Sample, SampleStatus};
pub use service::{NewSample, SampleService, SampleUpdate};
pub use store::SampleStore;
pub use transition::{
    allowed_targets, transition, StatusTransitionRequest, TransitionOutcome, TransitionPayload,
};
