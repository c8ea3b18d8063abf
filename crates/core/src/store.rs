//! The sample entity store.
//!
//! System of record for sample state, accessed behind async methods so the
//! calling code treats it like any other request/response collaborator. The
//! store is the only shared mutable resource in the core; commits are
//! optimistic: each mutation carries the version it was computed against and
//! fails with `StoreConflict` when the stored version has moved, so two
//! concurrent transitions from the same source status can never both succeed.

use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{SampleError, SampleResult};
use crate::sample::{Sample, SampleStatus};

/// In-memory sample store with optimistic versioning.
#[derive(Debug, Default)]
pub struct SampleStore {
    samples: RwLock<HashMap<Uuid, Sample>>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a newly registered sample.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a sample with the same id already exists.
    pub async fn insert(&self, sample: Sample) -> SampleResult<Sample> {
        let mut samples = self.samples.write().await;
        if samples.contains_key(&sample.id) {
            return Err(SampleError::InvalidInput(format!(
                "sample {} already exists",
                sample.id
            )));
        }
        samples.insert(sample.id, sample.clone());
        Ok(sample)
    }

    /// Fetch one sample by id.
    pub async fn get(&self, id: Uuid) -> SampleResult<Sample> {
        let samples = self.samples.read().await;
        samples
            .get(&id)
            .cloned()
            .ok_or(SampleError::ItemNotFound(id))
    }

    /// List samples, optionally filtered by status, oldest first.
    pub async fn list(&self, status: Option<SampleStatus>) -> Vec<Sample> {
        let samples = self.samples.read().await;
        let mut listed: Vec<Sample> = samples
            .values()
            .filter(|sample| status.map_or(true, |wanted| sample.status == wanted))
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        listed
    }

    /// Commit a mutated sample against the version it was computed from.
    ///
    /// The store assigns the next version and the updated-at timestamp; the
    /// caller must not bump these itself.
    ///
    /// # Errors
    ///
    /// * `ItemNotFound` if the sample no longer exists.
    /// * `StoreConflict` if the stored version differs from
    ///   `expected_version`; the caller decides whether to re-fetch and
    ///   resubmit. The conflict is never retried silently.
    pub async fn commit(&self, expected_version: u64, mut updated: Sample) -> SampleResult<Sample> {
        let mut samples = self.samples.write().await;
        let stored = samples
            .get(&updated.id)
            .ok_or(SampleError::ItemNotFound(updated.id))?;

        if stored.version != expected_version {
            tracing::warn!(
                sample_id = %updated.id,
                expected = expected_version,
                actual = stored.version,
                "optimistic commit rejected"
            );
            return Err(SampleError::StoreConflict(updated.id));
        }

        updated.version = expected_version + 1;
        updated.updated_at = Utc::now();
        samples.insert(updated.id, updated.clone());
        Ok(updated)
    }

    /// Remove a sample from the active store.
    ///
    /// Audit entries for the id are kept by the recorder; only the live
    /// record disappears. Returns the removed sample.
    pub async fn remove(&self, id: Uuid) -> SampleResult<Sample> {
        let mut samples = self.samples.write().await;
        samples.remove(&id).ok_or(SampleError::ItemNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Sample {
        Sample::new("blood", "n.jones")
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = SampleStore::new();
        let created = store.insert(sample()).await.unwrap();
        let fetched = store.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = SampleStore::new();
        let created = store.insert(sample()).await.unwrap();
        let err = store.insert(created).await.unwrap_err();
        assert!(matches!(err, SampleError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let store = SampleStore::new();
        let id = Uuid::new_v4();
        assert_eq!(
            store.get(id).await.unwrap_err(),
            SampleError::ItemNotFound(id)
        );
    }

    #[tokio::test]
    async fn commit_bumps_version() {
        let store = SampleStore::new();
        let created = store.insert(sample()).await.unwrap();

        let mut updated = created.clone();
        updated.status = SampleStatus::Received;
        let committed = store.commit(created.version, updated).await.unwrap();
        assert_eq!(committed.version, created.version + 1);
        assert_eq!(committed.status, SampleStatus::Received);
    }

    #[tokio::test]
    async fn stale_commit_fails_with_store_conflict() {
        let store = SampleStore::new();
        let created = store.insert(sample()).await.unwrap();

        let mut first = created.clone();
        first.status = SampleStatus::Received;
        store.commit(created.version, first).await.unwrap();

        // Second writer still holds the original version.
        let mut second = created.clone();
        second.status = SampleStatus::Rejected;
        assert_eq!(
            store.commit(created.version, second).await.unwrap_err(),
            SampleError::StoreConflict(created.id)
        );
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let store = SampleStore::new();
        let kept = store.insert(sample()).await.unwrap();
        let received = store.insert(sample()).await.unwrap();

        let mut updated = received.clone();
        updated.status = SampleStatus::Received;
        store.commit(received.version, updated).await.unwrap();

        let pending = store.list(Some(SampleStatus::Pending)).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, kept.id);
        assert_eq!(store.list(None).await.len(), 2);
    }

    #[tokio::test]
    async fn remove_deletes_the_live_record() {
        let store = SampleStore::new();
        let created = store.insert(sample()).await.unwrap();
        store.remove(created.id).await.unwrap();
        assert_eq!(
            store.get(created.id).await.unwrap_err(),
            SampleError::ItemNotFound(created.id)
        );
    }
}
