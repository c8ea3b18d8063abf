//! The sample record and its lifecycle status.
//!
//! A [`Sample`] is one physical specimen tracked from collection through final
//! disposition. Its status only ever changes through the transition engine in
//! [`crate::transition`]; the fields here are plain data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a sample.
///
/// `Pending` is the default: a record with no explicit status is treated as
/// pending. `Rejected` and `Completed` are terminal; no transition leaves
/// either of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleStatus {
    #[default]
    Pending,
    Received,
    Rejected,
    InProgress,
    Outsourced,
    Completed,
}

impl SampleStatus {
    /// Whether this status has no outgoing transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Received => "Received",
            Self::Rejected => "Rejected",
            Self::InProgress => "InProgress",
            Self::Outsourced => "Outsourced",
            Self::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical specimen tracked through the laboratory.
///
/// The `version` field backs optimistic concurrency in the store: it is bumped
/// by the store on every committed mutation and never by callers. Timestamps
/// and `version` are bookkeeping; they are excluded from audit snapshots so
/// audit diffs only report business fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: Uuid,
    #[serde(default)]
    pub status: SampleStatus,
    /// Barcode identifier, absent until the specimen has been scanned.
    #[serde(default)]
    pub barcode: Option<String>,
    pub sample_type: String,
    pub collected_by: String,
    pub collected_at: DateTime<Utc>,
    /// Laboratory the sample is (to be) outsourced to.
    #[serde(default)]
    pub laboratory_id: Option<String>,
    /// Shipment tracking identifier, set when the sample is outsourced.
    #[serde(default)]
    pub tracking_id: Option<String>,
    #[serde(default)]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub remark: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sample {
    /// Create a fresh sample in `Pending` status.
    pub fn new(sample_type: impl Into<String>, collected_by: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: SampleStatus::Pending,
            barcode: None,
            sample_type: sample_type.into(),
            collected_by: collected_by.into(),
            collected_at: now,
            laboratory_id: None,
            tracking_id: None,
            shipped_at: None,
            processed_at: None,
            remark: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the barcode has been scanned (present and non-blank).
    pub fn has_barcode(&self) -> bool {
        self.barcode
            .as_deref()
            .is_some_and(|b| !b.trim().is_empty())
    }

    /// Whether shipment metadata was recorded by a prior outsourcing step.
    pub fn has_shipment(&self) -> bool {
        self.tracking_id.is_some()
    }

    /// Serialize the business fields for an audit snapshot.
    ///
    /// Bookkeeping fields (`version`, `created_at`, `updated_at`) are omitted
    /// so that audit diffs describe what the user changed, not what the store
    /// touched while committing.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "status": self.status.as_str(),
            "barcode": self.barcode,
            "sample_type": self.sample_type,
            "collected_by": self.collected_by,
            "collected_at": self.collected_at,
            "laboratory_id": self.laboratory_id,
            "tracking_id": self.tracking_id,
            "shipped_at": self.shipped_at,
            "processed_at": self.processed_at,
            "remark": self.remark,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_status_deserialises_as_pending() {
        let sample = Sample::new("blood", "n.jones");
        let mut value = serde_json::to_value(&sample).unwrap();
        value.as_object_mut().unwrap().remove("status");
        let back: Sample = serde_json::from_value(value).unwrap();
        assert_eq!(back.status, SampleStatus::Pending);
    }

    #[test]
    fn terminal_statuses_are_rejected_and_completed() {
        assert!(SampleStatus::Rejected.is_terminal());
        assert!(SampleStatus::Completed.is_terminal());
        assert!(!SampleStatus::Pending.is_terminal());
        assert!(!SampleStatus::Outsourced.is_terminal());
    }

    #[test]
    fn blank_barcode_does_not_count_as_scanned() {
        let mut sample = Sample::new("blood", "n.jones");
        assert!(!sample.has_barcode());
        sample.barcode = Some("   ".into());
        assert!(!sample.has_barcode());
        sample.barcode = Some("BC-1".into());
        assert!(sample.has_barcode());
    }

    #[test]
    fn snapshot_omits_bookkeeping_fields() {
        let sample = Sample::new("blood", "n.jones");
        let snapshot = sample.snapshot();
        let object = snapshot.as_object().unwrap();
        assert!(!object.contains_key("version"));
        assert!(!object.contains_key("updated_at"));
        assert_eq!(object["status"], "Pending");
    }
}
