//! The reason-gated mutation gate.
//!
//! Sensitive mutations (update, delete, reject, laboratory reassignment) must
//! not commit without a caller-supplied justification. The gate decouples the
//! reason capture from the mutation itself: [`require_reason`] wraps the
//! deferred mutation, and [`PendingMutation::commit`] runs it at most once,
//! only after the reason requirement is satisfied.
//!
//! The gate itself is synchronous. For mutations that need to await the store,
//! the wrapped action returns a future which the caller awaits after a
//! successful commit.

use slm_types::ReasonText;

use crate::error::{SampleError, SampleResult};

/// Classification of a mutation for reason gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationIntent {
    Create,
    Update,
    Delete,
    Reject,
    ReassignLaboratory,
}

impl MutationIntent {
    /// Whether this mutation requires a justification before committing.
    pub const fn is_sensitive(self) -> bool {
        !matches!(self, Self::Create)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Reject => "reject",
            Self::ReassignLaboratory => "reassign_laboratory",
        }
    }
}

impl std::fmt::Display for MutationIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutation held uncommitted until its reason requirement is satisfied.
///
/// The wrapped action runs at most once: after a successful [`commit`] or an
/// [`abandon`], further commits fail with `AlreadyResolved`. A failed commit
/// (missing reason) leaves the action in place so the caller can retry with a
/// proper justification.
///
/// [`commit`]: PendingMutation::commit
/// [`abandon`]: PendingMutation::abandon
#[derive(Debug)]
pub struct PendingMutation<F> {
    intent: MutationIntent,
    action: Option<F>,
}

/// Wrap a mutation so it cannot run before [`PendingMutation::commit`].
///
/// The action receives the validated reason (`None` for non-sensitive intents
/// committed without one) and performs exactly one underlying mutation.
pub fn require_reason<F>(intent: MutationIntent, action: F) -> PendingMutation<F> {
    PendingMutation {
        intent,
        action: Some(action),
    }
}

impl<F> PendingMutation<F> {
    pub fn intent(&self) -> MutationIntent {
        self.intent
    }

    /// Drop the held mutation without running it.
    ///
    /// A subsequent commit fails with `AlreadyResolved`.
    pub fn abandon(&mut self) {
        self.action = None;
    }
}

impl<F, T> PendingMutation<F>
where
    F: FnOnce(Option<ReasonText>) -> T,
{
    /// Run the held mutation if the reason requirement is satisfied.
    ///
    /// For sensitive intents the reason must be non-empty after trimming;
    /// otherwise `ReasonRequired` is returned and the mutation stays pending.
    /// For non-sensitive intents an empty reason is accepted.
    ///
    /// # Errors
    ///
    /// * [`SampleError::AlreadyResolved`] if the mutation was already
    ///   committed or abandoned.
    /// * [`SampleError::ReasonRequired`] if the intent is sensitive and the
    ///   reason is empty or whitespace-only. No state changes in this case.
    pub fn commit(&mut self, reason: &str) -> SampleResult<T> {
        if self.action.is_none() {
            return Err(SampleError::AlreadyResolved);
        }

        let reason = match ReasonText::new(reason) {
            Ok(reason) => Some(reason),
            Err(_) if self.intent.is_sensitive() => return Err(SampleError::ReasonRequired),
            Err(_) => None,
        };

        let action = self.action.take().ok_or(SampleError::AlreadyResolved)?;
        Ok(action(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_is_the_only_non_sensitive_intent() {
        assert!(!MutationIntent::Create.is_sensitive());
        assert!(MutationIntent::Update.is_sensitive());
        assert!(MutationIntent::Delete.is_sensitive());
        assert!(MutationIntent::Reject.is_sensitive());
        assert!(MutationIntent::ReassignLaboratory.is_sensitive());
    }

    #[test]
    fn sensitive_commit_without_reason_fails_and_stays_pending() {
        let mut ran = false;
        let mut pending = require_reason(MutationIntent::Delete, |_| {
            ran = true;
        });

        assert_eq!(pending.commit("   ").unwrap_err(), SampleError::ReasonRequired);
        // Retry with a proper reason succeeds.
        pending.commit("duplicate registration").unwrap();
        assert!(ran);
    }

    #[test]
    fn second_commit_fails_with_already_resolved() {
        let mut pending = require_reason(MutationIntent::Reject, |reason: Option<ReasonText>| {
            reason.map(|r| r.as_str().to_owned())
        });

        let reason = pending.commit("clotted").unwrap();
        assert_eq!(reason.as_deref(), Some("clotted"));
        assert_eq!(
            pending.commit("clotted").unwrap_err(),
            SampleError::AlreadyResolved
        );
    }

    #[test]
    fn commit_after_abandon_fails() {
        let mut pending = require_reason(MutationIntent::Update, |_| ());
        pending.abandon();
        assert_eq!(
            pending.commit("correction").unwrap_err(),
            SampleError::AlreadyResolved
        );
    }

    #[test]
    fn non_sensitive_commit_accepts_empty_reason() {
        let mut pending = require_reason(MutationIntent::Create, |reason: Option<ReasonText>| reason.is_none());
        assert!(pending.commit("").unwrap());
    }

    #[test]
    fn reason_is_trimmed_before_delivery() {
        let mut pending = require_reason(MutationIntent::Update, |reason: Option<ReasonText>| {
            reason.map(|r| r.as_str().to_owned())
        });
        let reason = pending.commit("  relabelled  ").unwrap();
        assert_eq!(reason.as_deref(), Some("relabelled"));
    }
}
