//! High-level sample operations.
//!
//! [`SampleService`] composes the store, the transition engine, the reason
//! gate, and the audit recorder into the single entry point the API layer
//! calls. Every mutation follows the same chain: gate (when the mutation is
//! sensitive), engine or field update, optimistic store commit, then exactly
//! one audit entry once the commit has succeeded.

use std::sync::Arc;
use uuid::Uuid;

use slm_types::NonEmptyText;

use crate::audit::{AuditAction, AuditEntry, AuditEntryDraft, AuditTrail};
use crate::bulk::{run_bulk, BulkControl, BulkOutcome};
use crate::config::CoreConfig;
use crate::error::{SampleError, SampleResult};
use crate::gate::{require_reason, MutationIntent};
use crate::sample::{Sample, SampleStatus};
use crate::store::SampleStore;
use crate::transition::{transition, StatusTransitionRequest};
use crate::AUDIT_ENTITY_SAMPLES;

/// Input for registering a new sample.
#[derive(Debug, Clone)]
pub struct NewSample {
    pub sample_type: String,
    pub collected_by: String,
    pub barcode: Option<String>,
    pub remark: Option<String>,
}

/// Reason-gated field update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct SampleUpdate {
    pub barcode: Option<String>,
    pub remark: Option<String>,
}

struct Inner {
    store: SampleStore,
    audit: AuditTrail,
    config: CoreConfig,
}

/// Sample lifecycle operations - no API concerns.
#[derive(Clone)]
pub struct SampleService {
    inner: Arc<Inner>,
}

impl SampleService {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: SampleStore::new(),
                audit: AuditTrail::new(),
                config,
            }),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    /// Register a new sample in `Pending` status.
    ///
    /// Registration is the one non-sensitive mutation: it still routes
    /// through the gate so the intent classification lives in one place, but
    /// commits without a reason.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the actor, sample type, or collector is
    /// empty, or if the id collides with an existing sample.
    pub async fn register(&self, actor: &str, new: NewSample) -> SampleResult<Sample> {
        let actor = validated_actor(actor)?;
        let sample_type = NonEmptyText::new(&new.sample_type)
            .map_err(|_| SampleError::InvalidInput("sample_type is required".into()))?;
        let collected_by = NonEmptyText::new(&new.collected_by)
            .map_err(|_| SampleError::InvalidInput("collected_by is required".into()))?;

        let mut sample = Sample::new(sample_type.as_str(), collected_by.as_str());
        sample.barcode = normalised(new.barcode);
        sample.remark = normalised(new.remark);

        let mut pending = require_reason(MutationIntent::Create, |_reason| async move {
            let created = self.inner.store.insert(sample).await?;
            self.inner.audit.record(AuditEntryDraft {
                actor,
                action: AuditAction::Created,
                entity: AUDIT_ENTITY_SAMPLES.to_owned(),
                sample_id: created.id,
                old_values: None,
                new_values: created.snapshot(),
                reason: None,
            });
            tracing::info!(sample_id = %created.id, "sample registered");
            Ok(created)
        });
        pending.commit("")?.await
    }

    /// Fetch one sample.
    pub async fn get(&self, id: Uuid) -> SampleResult<Sample> {
        self.inner.store.get(id).await
    }

    /// List samples, optionally filtered by status.
    pub async fn list(&self, status: Option<SampleStatus>) -> Vec<Sample> {
        self.inner.store.list(status).await
    }

    /// Audit entries for one sample, in append order.
    pub fn audit_trail(&self, id: Uuid) -> Vec<AuditEntry> {
        self.inner.audit.entries_for(id)
    }

    /// Move a sample to a new status.
    ///
    /// Rejection is a sensitive mutation and routes through the reason gate;
    /// every other target commits with or without a reason. The transition is
    /// validated against the store's current value and committed
    /// optimistically, so a concurrent mutation of the same sample surfaces
    /// as `StoreConflict` rather than silently overwriting.
    pub async fn change_status(
        &self,
        actor: &str,
        id: Uuid,
        request: StatusTransitionRequest,
    ) -> SampleResult<Sample> {
        let actor = validated_actor(actor)?;

        if request.target == SampleStatus::Rejected {
            let reason = request.reason.clone().unwrap_or_default();
            let mut pending = require_reason(
                MutationIntent::Reject,
                |reason: Option<slm_types::ReasonText>| {
                    let mut request = request;
                    request.reason = reason.map(|r| r.as_str().to_owned());
                    self.apply_transition(actor, id, request)
                },
            );
            pending.commit(&reason)?.await
        } else {
            self.apply_transition(actor, id, request).await
        }
    }

    /// Apply one transition as an atomic read-modify-write against the store.
    async fn apply_transition(
        &self,
        actor: String,
        id: Uuid,
        request: StatusTransitionRequest,
    ) -> SampleResult<Sample> {
        let current = self.inner.store.get(id).await?;
        let outcome = transition(&current, &actor, &request)?;
        let committed = self
            .inner
            .store
            .commit(current.version, outcome.sample)
            .await?;
        self.inner.audit.record(outcome.audit);
        Ok(committed)
    }

    /// Update descriptive fields on a sample. Sensitive; requires a reason.
    pub async fn update_fields(
        &self,
        actor: &str,
        id: Uuid,
        update: SampleUpdate,
        reason: &str,
    ) -> SampleResult<Sample> {
        let actor = validated_actor(actor)?;
        let mut pending = require_reason(MutationIntent::Update, |reason| async move {
            let current = self.inner.store.get(id).await?;
            let mut next = current.clone();
            if let Some(barcode) = normalised(update.barcode) {
                next.barcode = Some(barcode);
            }
            if let Some(remark) = normalised(update.remark) {
                next.remark = Some(remark);
            }
            self.commit_field_update(actor, AuditAction::Updated, current, next, reason)
                .await
        });
        pending.commit(reason)?.await
    }

    /// Reassign the laboratory on a sample. Sensitive; requires a reason.
    pub async fn reassign_laboratory(
        &self,
        actor: &str,
        id: Uuid,
        laboratory_id: &str,
        reason: &str,
    ) -> SampleResult<Sample> {
        let actor = validated_actor(actor)?;
        let laboratory = NonEmptyText::new(laboratory_id)
            .map_err(|_| SampleError::InvalidInput("laboratory_id is required".into()))?;

        let mut pending = require_reason(MutationIntent::ReassignLaboratory, |reason| async move {
            let current = self.inner.store.get(id).await?;
            let mut next = current.clone();
            next.laboratory_id = Some(laboratory.as_str().to_owned());
            self.commit_field_update(actor, AuditAction::Updated, current, next, reason)
                .await
        });
        pending.commit(reason)?.await
    }

    async fn commit_field_update(
        &self,
        actor: String,
        action: AuditAction,
        current: Sample,
        next: Sample,
        reason: Option<slm_types::ReasonText>,
    ) -> SampleResult<Sample> {
        let committed = self.inner.store.commit(current.version, next).await?;
        self.inner.audit.record(AuditEntryDraft {
            actor,
            action,
            entity: AUDIT_ENTITY_SAMPLES.to_owned(),
            sample_id: committed.id,
            old_values: Some(current.snapshot()),
            new_values: committed.snapshot(),
            reason: reason.map(|r| r.as_str().to_owned()),
        });
        Ok(committed)
    }

    /// Remove a sample from the active store. Sensitive; requires a reason.
    ///
    /// The audit trail for the id is retained; only the live record
    /// disappears. Rejection, not deletion, is the path for keeping a
    /// discarded specimen on the books.
    pub async fn delete(&self, actor: &str, id: Uuid, reason: &str) -> SampleResult<()> {
        let actor = validated_actor(actor)?;
        let mut pending = require_reason(
            MutationIntent::Delete,
            |reason: Option<slm_types::ReasonText>| async move {
                let removed = self.inner.store.remove(id).await?;
                self.inner.audit.record(AuditEntryDraft {
                    actor,
                    action: AuditAction::Deleted,
                    entity: AUDIT_ENTITY_SAMPLES.to_owned(),
                    sample_id: removed.id,
                    old_values: Some(removed.snapshot()),
                    new_values: removed.snapshot(),
                    reason: reason.map(|r| r.as_str().to_owned()),
                });
                tracing::info!(sample_id = %removed.id, "sample removed from active store");
                Ok(())
            },
        );
        pending.commit(reason)?.await
    }

    /// Apply one status operation to many samples with partial-failure
    /// semantics, bounded by the configured in-flight cap.
    pub async fn bulk_change_status(
        &self,
        actor: &str,
        ids: &[Uuid],
        request: StatusTransitionRequest,
    ) -> SampleResult<BulkOutcome> {
        let actor = validated_actor(actor)?;
        Ok(run_bulk(
            self,
            &actor,
            ids,
            &request,
            self.inner.config.max_in_flight(),
            BulkControl::new(),
        )
        .await)
    }
}

fn validated_actor(actor: &str) -> SampleResult<String> {
    NonEmptyText::new(actor)
        .map(|a| a.as_str().to_owned())
        .map_err(|_| SampleError::InvalidInput("actor is required".into()))
}

fn normalised(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
