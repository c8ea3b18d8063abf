//! Append-only audit trail for committed sample mutations.
//!
//! Every committed mutation produces exactly one [`AuditEntry`]: actor,
//! action, before/after snapshots, the set of changed columns, and the
//! caller-supplied reason where one was required. Entries are never updated
//! or deleted; for a given sample id they are retrievable in the order they
//! were recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// The kind of mutation an audit entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
    StatusChanged,
}

impl AuditAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Updated => "Updated",
            Self::Deleted => "Deleted",
            Self::StatusChanged => "StatusChanged",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A not-yet-recorded audit entry, produced by the transition engine and the
/// sample service alongside each mutation.
///
/// The recorder assigns the entry id and timestamp and computes the affected
/// column set; callers only describe what changed.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntryDraft {
    /// The acting user.
    pub actor: String,
    pub action: AuditAction,
    /// Logical entity name, e.g. `"samples"`.
    pub entity: String,
    pub sample_id: Uuid,
    /// Snapshot before the mutation; `None` for creations.
    pub old_values: Option<Value>,
    /// Snapshot after the mutation. For deletions this is the last state.
    pub new_values: Value,
    pub reason: Option<String>,
}

/// An immutable record of one committed mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor: String,
    pub action: AuditAction,
    pub entity: String,
    pub sample_id: Uuid,
    pub old_values: Option<Value>,
    pub new_values: Value,
    /// Names of the fields that differ between the snapshots, sorted. For a
    /// creation, all populated fields.
    pub affected_columns: Vec<String>,
    pub reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Compute the set of changed field names between two snapshots.
///
/// With no old snapshot (a creation), every populated (non-null) field of the
/// new snapshot is affected. Otherwise a field is affected when its value
/// differs between the two snapshots, including fields present on only one
/// side. The result is sorted for deterministic output.
pub fn changed_columns(old_values: Option<&Value>, new_values: &Value) -> Vec<String> {
    let new_object = match new_values.as_object() {
        Some(object) => object,
        None => return Vec::new(),
    };

    let mut columns: Vec<String> = match old_values.and_then(Value::as_object) {
        None => new_object
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, _)| key.clone())
            .collect(),
        Some(old_object) => {
            let mut changed: Vec<String> = new_object
                .iter()
                .filter(|(key, value)| old_object.get(*key) != Some(value))
                .map(|(key, _)| key.clone())
                .collect();
            // Fields removed by the mutation count as changed too.
            for key in old_object.keys() {
                if !new_object.contains_key(key) {
                    changed.push(key.clone());
                }
            }
            changed
        }
    };

    columns.sort();
    columns
}

/// Append-only recorder for audit entries, keyed by sample id.
///
/// Recording is synchronous in-memory work; only the store interaction in the
/// calling service awaits. Per-sample retrieval returns entries in the order
/// the `record` calls were made for that id.
#[derive(Debug, Default)]
pub struct AuditTrail {
    entries: Mutex<HashMap<Uuid, Vec<AuditEntry>>>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, assigning it a server-side id and timestamp.
    ///
    /// Returns the recorded entry. Prior entries are never overwritten.
    pub fn record(&self, draft: AuditEntryDraft) -> AuditEntry {
        let affected_columns = changed_columns(draft.old_values.as_ref(), &draft.new_values);
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            actor: draft.actor,
            action: draft.action,
            entity: draft.entity,
            sample_id: draft.sample_id,
            old_values: draft.old_values,
            new_values: draft.new_values,
            affected_columns,
            reason: draft.reason,
            recorded_at: Utc::now(),
        };

        let mut entries = self.entries.lock().expect("audit trail mutex poisoned");
        entries
            .entry(entry.sample_id)
            .or_default()
            .push(entry.clone());

        tracing::debug!(
            sample_id = %entry.sample_id,
            action = %entry.action,
            actor = %entry.actor,
            "audit entry recorded"
        );

        entry
    }

    /// All entries for one sample id, in append order.
    pub fn entries_for(&self, sample_id: Uuid) -> Vec<AuditEntry> {
        let entries = self.entries.lock().expect("audit trail mutex poisoned");
        entries.get(&sample_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft(sample_id: Uuid, action: AuditAction, old: Option<Value>, new: Value) -> AuditEntryDraft {
        AuditEntryDraft {
            actor: "tech.one".into(),
            action,
            entity: "samples".into(),
            sample_id,
            old_values: old,
            new_values: new,
            reason: None,
        }
    }

    #[test]
    fn creation_affects_only_populated_fields() {
        let columns = changed_columns(
            None,
            &json!({"status": "Pending", "barcode": null, "sample_type": "blood"}),
        );
        assert_eq!(columns, vec!["sample_type", "status"]);
    }

    #[test]
    fn diff_reports_changed_fields_sorted() {
        let old = json!({"status": "Pending", "barcode": "BC-1", "remark": null});
        let new = json!({"status": "Received", "barcode": "BC-1", "remark": "intact"});
        assert_eq!(
            changed_columns(Some(&old), &new),
            vec!["remark", "status"]
        );
    }

    #[test]
    fn diff_counts_removed_fields_as_changed() {
        let old = json!({"status": "Pending", "legacy": 1});
        let new = json!({"status": "Pending"});
        assert_eq!(changed_columns(Some(&old), &new), vec!["legacy"]);
    }

    #[test]
    fn entries_for_preserves_append_order() {
        let trail = AuditTrail::new();
        let sample_id = Uuid::new_v4();
        let other_id = Uuid::new_v4();

        trail.record(draft(
            sample_id,
            AuditAction::Created,
            None,
            json!({"status": "Pending"}),
        ));
        trail.record(draft(
            other_id,
            AuditAction::Created,
            None,
            json!({"status": "Pending"}),
        ));
        trail.record(draft(
            sample_id,
            AuditAction::StatusChanged,
            Some(json!({"status": "Pending"})),
            json!({"status": "Received"}),
        ));

        let entries = trail.entries_for(sample_id);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::Created);
        assert_eq!(entries[1].action, AuditAction::StatusChanged);
        assert_eq!(entries[1].affected_columns, vec!["status"]);
        assert_eq!(trail.entries_for(other_id).len(), 1);
    }

    #[test]
    fn record_assigns_id_and_timestamp() {
        let trail = AuditTrail::new();
        let sample_id = Uuid::new_v4();
        let entry = trail.record(draft(
            sample_id,
            AuditAction::Created,
            None,
            json!({"status": "Pending"}),
        ));
        assert_ne!(entry.id, Uuid::nil());
        assert_eq!(entry.affected_columns, vec!["status"]);
    }
}
