//! Request and response types for the SLM REST API.
//!
//! These are the wire shapes; the domain types live in `slm-core`. Each
//! response type converts from its domain counterpart so handlers stay thin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use slm_core::{
    AuditAction, AuditEntry, BulkOutcome, NewSample, Sample, SampleStatus, SampleUpdate,
    StatusTransitionRequest, TransitionPayload,
};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// One sample as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SampleRes {
    pub id: Uuid,
    #[schema(value_type = String, example = "Pending")]
    pub status: SampleStatus,
    pub barcode: Option<String>,
    pub sample_type: String,
    pub collected_by: String,
    pub collected_at: DateTime<Utc>,
    pub laboratory_id: Option<String>,
    pub tracking_id: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub remark: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Sample> for SampleRes {
    fn from(sample: Sample) -> Self {
        Self {
            id: sample.id,
            status: sample.status,
            barcode: sample.barcode,
            sample_type: sample.sample_type,
            collected_by: sample.collected_by,
            collected_at: sample.collected_at,
            laboratory_id: sample.laboratory_id,
            tracking_id: sample.tracking_id,
            shipped_at: sample.shipped_at,
            processed_at: sample.processed_at,
            remark: sample.remark,
            version: sample.version,
            created_at: sample.created_at,
            updated_at: sample.updated_at,
        }
    }
}

/// Response for the sample list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListSamplesRes {
    pub samples: Vec<SampleRes>,
}

/// Query parameters for the sample list endpoint.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListSamplesQuery {
    /// Restrict the listing to one status.
    #[param(value_type = Option<String>, example = "Received")]
    pub status: Option<SampleStatus>,
}

/// Request body for registering a sample.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateSampleReq {
    pub sample_type: String,
    pub collected_by: String,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
}

impl From<CreateSampleReq> for NewSample {
    fn from(req: CreateSampleReq) -> Self {
        Self {
            sample_type: req.sample_type,
            collected_by: req.collected_by,
            barcode: req.barcode,
            remark: req.remark,
        }
    }
}

/// Status-specific payload for a transition request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TransitionPayloadReq {
    #[serde(default)]
    pub laboratory_id: Option<String>,
    #[serde(default)]
    pub tracking_id: Option<String>,
}

impl From<TransitionPayloadReq> for TransitionPayload {
    fn from(req: TransitionPayloadReq) -> Self {
        Self {
            laboratory_id: req.laboratory_id,
            tracking_id: req.tracking_id,
        }
    }
}

/// Request body for a single status change.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusChangeReq {
    #[schema(value_type = String, example = "Received")]
    pub target_status: SampleStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub payload: Option<TransitionPayloadReq>,
}

impl From<StatusChangeReq> for StatusTransitionRequest {
    fn from(req: StatusChangeReq) -> Self {
        Self {
            target: req.target_status,
            reason: req.reason,
            payload: req.payload.map(Into::into).unwrap_or_default(),
        }
    }
}

/// Request body for a bulk status change.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkStatusReq {
    pub ids: Vec<Uuid>,
    #[schema(value_type = String, example = "Rejected")]
    pub target_status: SampleStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

/// One failed item in a bulk run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkFailureRes {
    pub id: Uuid,
    /// Machine-readable error kind, e.g. `terminal_state`.
    pub kind: String,
    pub message: String,
}

/// Final partition of a bulk run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkStatusRes {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BulkFailureRes>,
    pub total: usize,
}

impl From<BulkOutcome> for BulkStatusRes {
    fn from(outcome: BulkOutcome) -> Self {
        Self {
            succeeded: outcome.succeeded,
            failed: outcome
                .failed
                .into_iter()
                .map(|(id, error)| BulkFailureRes {
                    id,
                    kind: error.kind().to_owned(),
                    message: error.to_string(),
                })
                .collect(),
            total: outcome.total,
        }
    }
}

/// Request body for a reason-gated field update.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateSampleReq {
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
    /// Required justification; an empty string is rejected.
    #[serde(default)]
    pub reason: String,
}

impl From<UpdateSampleReq> for SampleUpdate {
    fn from(req: UpdateSampleReq) -> Self {
        Self {
            barcode: req.barcode,
            remark: req.remark,
        }
    }
}

/// Request body for reassigning the laboratory on a sample.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReassignLaboratoryReq {
    pub laboratory_id: String,
    #[serde(default)]
    pub reason: String,
}

/// Request body for deleting a sample.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteSampleReq {
    /// Required justification; an empty string is rejected.
    #[serde(default)]
    pub reason: String,
}

/// One audit entry as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEntryRes {
    pub id: Uuid,
    pub actor: String,
    #[schema(value_type = String, example = "StatusChanged")]
    pub action: AuditAction,
    pub entity: String,
    pub sample_id: Uuid,
    #[schema(value_type = Option<Object>)]
    pub old_values: Option<Value>,
    #[schema(value_type = Object)]
    pub new_values: Value,
    pub affected_columns: Vec<String>,
    pub reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl From<AuditEntry> for AuditEntryRes {
    fn from(entry: AuditEntry) -> Self {
        Self {
            id: entry.id,
            actor: entry.actor,
            action: entry.action,
            entity: entry.entity,
            sample_id: entry.sample_id,
            old_values: entry.old_values,
            new_values: entry.new_values,
            affected_columns: entry.affected_columns,
            reason: entry.reason,
            recorded_at: entry.recorded_at,
        }
    }
}

/// Response for the audit trail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditTrailRes {
    pub entries: Vec<AuditEntryRes>,
}

/// Error body returned for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    /// Machine-readable error kind, e.g. `reason_required`.
    pub kind: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_change_req_defaults_payload() {
        let req: StatusChangeReq =
            serde_json::from_str(r#"{"target_status": "Received"}"#).unwrap();
        let request: StatusTransitionRequest = req.into();
        assert_eq!(request.target, SampleStatus::Received);
        assert_eq!(request.payload, TransitionPayload::default());
        assert!(request.reason.is_none());
    }

    #[test]
    fn delete_req_defaults_to_empty_reason() {
        let req: DeleteSampleReq = serde_json::from_str("{}").unwrap();
        assert_eq!(req.reason, "");
    }

    #[test]
    fn bulk_failure_carries_error_kind() {
        let id = Uuid::new_v4();
        let outcome = BulkOutcome {
            succeeded: vec![],
            failed: vec![(id, slm_core::SampleError::ItemNotFound(id))],
            total: 1,
        };
        let res: BulkStatusRes = outcome.into();
        assert_eq!(res.failed[0].kind, "item_not_found");
        assert_eq!(res.total, 1);
    }
}
