//! The status transition engine.
//!
//! A pure function over the current sample and a [`StatusTransitionRequest`]:
//! it validates the requested change against a fixed transition table and the
//! status-specific preconditions, then returns the new sample value together
//! with exactly one audit draft. Persistence is the caller's concern; nothing
//! here touches the store.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::audit::{AuditAction, AuditEntryDraft};
use crate::error::{PreconditionKind, SampleError, SampleResult};
use crate::sample::{Sample, SampleStatus};
use crate::AUDIT_ENTITY_SAMPLES;

/// Status-specific data carried alongside a transition request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionPayload {
    /// Laboratory to outsource to. Required for `Outsourced` unless the
    /// sample already carries an assignment.
    #[serde(default)]
    pub laboratory_id: Option<String>,
    /// Shipment tracking identifier recorded when outsourcing.
    #[serde(default)]
    pub tracking_id: Option<String>,
}

/// A request to move one sample to a new status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransitionRequest {
    pub target: SampleStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub payload: TransitionPayload,
}

impl StatusTransitionRequest {
    pub fn to(target: SampleStatus) -> Self {
        Self {
            target,
            reason: None,
            payload: TransitionPayload::default(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_payload(mut self, payload: TransitionPayload) -> Self {
        self.payload = payload;
        self
    }
}

/// Result of a successful transition: the new sample value and the single
/// audit draft describing the change. The caller commits the sample to the
/// store first and records the draft only after the commit succeeds.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub sample: Sample,
    pub audit: AuditEntryDraft,
}

/// The fixed transition table: which targets each status may move to.
///
/// Terminal statuses return an empty slice; the engine reports those as
/// `TerminalState` rather than `InvalidTransition`.
pub const fn allowed_targets(from: SampleStatus) -> &'static [SampleStatus] {
    match from {
        SampleStatus::Pending => &[
            SampleStatus::Received,
            SampleStatus::Rejected,
            SampleStatus::Outsourced,
        ],
        SampleStatus::Received => &[SampleStatus::InProgress, SampleStatus::Rejected],
        SampleStatus::InProgress => &[SampleStatus::Completed, SampleStatus::Outsourced],
        SampleStatus::Outsourced => &[SampleStatus::Completed, SampleStatus::Rejected],
        SampleStatus::Rejected | SampleStatus::Completed => &[],
    }
}

fn is_allowed(from: SampleStatus, to: SampleStatus) -> bool {
    allowed_targets(from).contains(&to)
}

/// Validate and apply a status transition to `current`.
///
/// # Arguments
///
/// * `current` - The sample as currently stored. The caller must hold this
///   read against the store version it intends to commit to.
/// * `actor` - The acting user, recorded on the audit draft.
/// * `request` - Target status, optional reason, and status-specific payload.
///
/// # Errors
///
/// * [`SampleError::TerminalState`] if the current status is terminal.
/// * [`SampleError::InvalidTransition`] if the pair is not in the table.
/// * [`SampleError::PreconditionFailed`] if a status-specific invariant does
///   not hold: barcode for `Received`, laboratory for `Outsourced`, prior
///   shipment for `Completed`.
pub fn transition(
    current: &Sample,
    actor: &str,
    request: &StatusTransitionRequest,
) -> SampleResult<TransitionOutcome> {
    let from = current.status;
    let to = request.target;

    if from.is_terminal() {
        return Err(SampleError::TerminalState(from));
    }
    if !is_allowed(from, to) {
        return Err(SampleError::InvalidTransition { from, to });
    }

    let mut next = current.clone();
    next.status = to;

    match to {
        SampleStatus::Received => {
            if !current.has_barcode() {
                return Err(SampleError::PreconditionFailed(
                    PreconditionKind::BarcodeMissing,
                ));
            }
        }
        SampleStatus::Outsourced => {
            let laboratory = request
                .payload
                .laboratory_id
                .as_deref()
                .filter(|laboratory| !laboratory.trim().is_empty())
                .or(current.laboratory_id.as_deref());
            match laboratory {
                Some(laboratory) => next.laboratory_id = Some(laboratory.to_owned()),
                None => {
                    return Err(SampleError::PreconditionFailed(
                        PreconditionKind::LaboratoryMissing,
                    ))
                }
            }
            if let Some(tracking_id) = request
                .payload
                .tracking_id
                .as_deref()
                .filter(|tracking| !tracking.trim().is_empty())
            {
                next.tracking_id = Some(tracking_id.to_owned());
                next.shipped_at = Some(Utc::now());
            }
        }
        SampleStatus::Completed => {
            // Completion always requires shipment metadata from a prior
            // outsourcing step, even when arriving from InProgress.
            if !current.has_shipment() {
                return Err(SampleError::PreconditionFailed(
                    PreconditionKind::ShipmentMissing,
                ));
            }
            next.processed_at = Some(Utc::now());
        }
        SampleStatus::Rejected | SampleStatus::InProgress | SampleStatus::Pending => {}
    }

    let audit = AuditEntryDraft {
        actor: actor.to_owned(),
        action: AuditAction::StatusChanged,
        entity: AUDIT_ENTITY_SAMPLES.to_owned(),
        sample_id: current.id,
        old_values: Some(current.snapshot()),
        new_values: next.snapshot(),
        reason: request.reason.clone(),
    };

    tracing::debug!(sample_id = %current.id, %from, %to, "status transition validated");

    Ok(TransitionOutcome {
        sample: next,
        audit,
    })
}
