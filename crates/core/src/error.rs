use crate::sample::SampleStatus;
use uuid::Uuid;

/// The specific lifecycle invariant that a rejected transition would have broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionKind {
    /// The sample has no barcode, so it cannot be received.
    BarcodeMissing,
    /// No laboratory assignment was supplied at or before outsourcing.
    LaboratoryMissing,
    /// The sample was never shipped to a laboratory, so it cannot be completed.
    ShipmentMissing,
}

impl PreconditionKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BarcodeMissing => "barcode not scanned",
            Self::LaboratoryMissing => "laboratory not assigned",
            Self::ShipmentMissing => "shipment not recorded",
        }
    }
}

impl std::fmt::Display for PreconditionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the sample lifecycle core.
///
/// Every variant is recoverable and is returned to the caller as a typed
/// result; nothing here propagates as a panic. The REST layer maps each
/// variant to a 4xx-class response via [`SampleError::kind`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SampleError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("transition from {from} to {to} is not permitted")]
    InvalidTransition {
        from: SampleStatus,
        to: SampleStatus,
    },
    #[error("{0} is a terminal status")]
    TerminalState(SampleStatus),
    #[error("precondition failed: {0}")]
    PreconditionFailed(PreconditionKind),
    #[error("a non-empty reason is required for this mutation")]
    ReasonRequired,
    #[error("mutation was already committed or abandoned")]
    AlreadyResolved,
    #[error("sample {0} not found")]
    ItemNotFound(Uuid),
    #[error("sample {0} was modified concurrently")]
    StoreConflict(Uuid),
}

impl SampleError {
    /// Stable machine-readable identifier for the error variant.
    ///
    /// Used in API error bodies and bulk failure reports so callers can
    /// branch on the error kind without parsing the display message.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::TerminalState(_) => "terminal_state",
            Self::PreconditionFailed(_) => "precondition_failed",
            Self::ReasonRequired => "reason_required",
            Self::AlreadyResolved => "already_resolved",
            Self::ItemNotFound(_) => "item_not_found",
            Self::StoreConflict(_) => "store_conflict",
        }
    }
}

pub type SampleResult<T> = std::result::Result<T, SampleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_statuses() {
        let err = SampleError::InvalidTransition {
            from: SampleStatus::Pending,
            to: SampleStatus::Completed,
        };
        assert_eq!(
            err.to_string(),
            "transition from Pending to Completed is not permitted"
        );
    }

    #[test]
    fn precondition_message_is_user_renderable() {
        let err = SampleError::PreconditionFailed(PreconditionKind::BarcodeMissing);
        assert_eq!(err.to_string(), "precondition failed: barcode not scanned");
    }

    #[test]
    fn kind_is_stable_per_variant() {
        assert_eq!(SampleError::ReasonRequired.kind(), "reason_required");
        assert_eq!(
            SampleError::TerminalState(SampleStatus::Rejected).kind(),
            "terminal_state"
        );
    }
}
