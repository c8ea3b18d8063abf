//! The bulk operation orchestrator.
//!
//! Applies one status operation to a set of sample ids with independent
//! per-item outcomes. Fan-out is bounded by a semaphore so a large batch
//! cannot swamp the store, each item's failure is captured without aborting
//! the rest, and a shared counter exposes progress while the run settles.
//! Failed items are not retried; the caller issues a new run with the failed
//! subset if it wants one.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::error::SampleError;
use crate::service::SampleService;
use crate::transition::StatusTransitionRequest;

/// Final partition of a bulk run.
///
/// `succeeded.len() + failed.len() == total`, where `total` counts the items
/// actually attempted (all of them unless the run was cancelled).
#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<(Uuid, SampleError)>,
    pub total: usize,
}

/// Shared progress and cancellation handle for one bulk run.
///
/// `completed` counts items that have settled (success or failure), each
/// exactly once. Cancellation is cooperative: items already dispatched run to
/// completion, no further items are started once the flag is observed.
#[derive(Debug, Default)]
pub struct BulkControl {
    completed: AtomicUsize,
    cancelled: AtomicBool,
}

impl BulkControl {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of items attempted so far.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Request that no further items be dispatched.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn mark_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Apply `request` to every id in `ids`, at most `max_in_flight` at a time.
///
/// Each item routes through the full single-item chain (gate, engine, audit,
/// store) via [`SampleService::change_status`], so the shared reason on
/// `request` lands on every item's audit entry. A failure on one id never
/// aborts the remaining ids.
pub async fn run_bulk(
    service: &SampleService,
    actor: &str,
    ids: &[Uuid],
    request: &StatusTransitionRequest,
    max_in_flight: usize,
    control: Arc<BulkControl>,
) -> BulkOutcome {
    let semaphore = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let mut handles = Vec::with_capacity(ids.len());

    for &id in ids {
        if control.is_cancelled() {
            break;
        }
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        // Re-check after waiting for a slot; cancellation may have arrived
        // while this item was queued behind the in-flight cap.
        if control.is_cancelled() {
            break;
        }

        let service = service.clone();
        let actor = actor.to_owned();
        let request = request.clone();
        let control = control.clone();
        handles.push((
            id,
            tokio::spawn(async move {
                let result = service.change_status(&actor, id, request).await;
                control.mark_completed();
                drop(permit);
                result
            }),
        ));
    }

    let mut outcome = BulkOutcome {
        total: handles.len(),
        ..BulkOutcome::default()
    };

    for (id, handle) in handles {
        match handle.await {
            Ok(Ok(_)) => outcome.succeeded.push(id),
            Ok(Err(error)) => outcome.failed.push((id, error)),
            Err(join_error) => {
                tracing::error!(sample_id = %id, %join_error, "bulk item task failed");
                outcome
                    .failed
                    .push((id, SampleError::InvalidInput("bulk item aborted".into())));
            }
        }
    }

    tracing::info!(
        total = outcome.total,
        succeeded = outcome.succeeded.len(),
        failed = outcome.failed.len(),
        "bulk run settled"
    );

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::sample::SampleStatus;
    use crate::service::{NewSample, SampleService};

    async fn registered_sample(service: &SampleService, barcode: &str) -> Uuid {
        service
            .register(
                "tech.one",
                NewSample {
                    sample_type: "blood".into(),
                    collected_by: "n.jones".into(),
                    barcode: Some(barcode.into()),
                    remark: None,
                },
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn partition_always_covers_every_attempted_id() {
        let service = SampleService::new(CoreConfig::default());
        let a = registered_sample(&service, "BC-1").await;
        let b = registered_sample(&service, "BC-2").await;
        let c = registered_sample(&service, "BC-3").await;

        let control = BulkControl::new();
        let outcome = run_bulk(
            &service,
            "tech.one",
            &[a, b, c],
            &StatusTransitionRequest::to(SampleStatus::Received),
            2,
            control.clone(),
        )
        .await;

        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.succeeded.len() + outcome.failed.len(), 3);
        assert_eq!(control.completed(), 3);
    }

    #[tokio::test]
    async fn one_terminal_item_does_not_stop_the_rest() {
        let service = SampleService::new(CoreConfig::default());
        let a = registered_sample(&service, "BC-1").await;
        let b = registered_sample(&service, "BC-2").await;
        let c = registered_sample(&service, "BC-3").await;

        // Drive sample b to the terminal Completed status.
        for target in [
            SampleStatus::Outsourced,
            SampleStatus::Completed,
        ] {
            let request = if target == SampleStatus::Outsourced {
                StatusTransitionRequest::to(target).with_payload(crate::transition::TransitionPayload {
                    laboratory_id: Some("lab-7".into()),
                    tracking_id: Some("TRK-1".into()),
                })
            } else {
                StatusTransitionRequest::to(target)
            };
            service.change_status("tech.one", b, request).await.unwrap();
        }

        let outcome = run_bulk(
            &service,
            "tech.one",
            &[a, b, c],
            &StatusTransitionRequest::to(SampleStatus::Rejected).with_reason("batch recalled"),
            4,
            BulkControl::new(),
        )
        .await;

        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.succeeded, vec![a, c]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, b);
        assert_eq!(
            outcome.failed[0].1,
            SampleError::TerminalState(SampleStatus::Completed)
        );
    }

    #[tokio::test]
    async fn unknown_ids_fail_without_cascading() {
        let service = SampleService::new(CoreConfig::default());
        let known = registered_sample(&service, "BC-1").await;
        let unknown = Uuid::new_v4();

        let outcome = run_bulk(
            &service,
            "tech.one",
            &[unknown, known],
            &StatusTransitionRequest::to(SampleStatus::Received),
            1,
            BulkControl::new(),
        )
        .await;

        assert_eq!(outcome.succeeded, vec![known]);
        assert_eq!(
            outcome.failed,
            vec![(unknown, SampleError::ItemNotFound(unknown))]
        );
    }

    #[tokio::test]
    async fn cancelled_run_attempts_nothing_further() {
        let service = SampleService::new(CoreConfig::default());
        let a = registered_sample(&service, "BC-1").await;
        let b = registered_sample(&service, "BC-2").await;

        let control = BulkControl::new();
        control.cancel();
        let outcome = run_bulk(
            &service,
            "tech.one",
            &[a, b],
            &StatusTransitionRequest::to(SampleStatus::Received),
            2,
            control.clone(),
        )
        .await;

        assert_eq!(outcome.total, 0);
        assert_eq!(control.completed(), 0);
        // Neither sample moved.
        assert_eq!(
            service.get(a).await.unwrap().status,
            SampleStatus::Pending
        );
    }

    #[tokio::test]
    async fn shared_reason_lands_on_every_audit_entry() {
        let service = SampleService::new(CoreConfig::default());
        let a = registered_sample(&service, "BC-1").await;
        let b = registered_sample(&service, "BC-2").await;

        run_bulk(
            &service,
            "tech.one",
            &[a, b],
            &StatusTransitionRequest::to(SampleStatus::Rejected).with_reason("batch recalled"),
            2,
            BulkControl::new(),
        )
        .await;

        for id in [a, b] {
            let entries = service.audit_trail(id);
            let last = entries.last().unwrap();
            assert_eq!(last.reason.as_deref(), Some("batch recalled"));
        }
    }
}
