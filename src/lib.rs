//! # SLM REST API
//!
//! REST surface for the sample lifecycle service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - Mapping domain errors to HTTP status codes
//!
//! Uses `api-shared` for wire types and `slm-core` for all domain logic. The
//! router is built here (rather than in `main`) so integration tests can
//! drive it in-process.

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use api_shared::{
    AuditTrailRes, BulkFailureRes, BulkStatusReq, BulkStatusRes, CreateSampleReq, DeleteSampleReq,
    ErrorRes, HealthRes, HealthService, ListSamplesQuery, ListSamplesRes, ReassignLaboratoryReq,
    SampleRes, StatusChangeReq, TransitionPayloadReq, UpdateSampleReq,
};
use slm_core::{SampleError, SampleService, StatusTransitionRequest};

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub sample_service: SampleService,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_samples,
        create_sample,
        get_sample,
        change_status,
        bulk_status,
        audit_trail,
        update_sample,
        reassign_laboratory,
        delete_sample
    ),
    components(schemas(
        HealthRes,
        SampleRes,
        ListSamplesRes,
        CreateSampleReq,
        StatusChangeReq,
        TransitionPayloadReq,
        BulkStatusReq,
        BulkStatusRes,
        BulkFailureRes,
        UpdateSampleReq,
        ReassignLaboratoryReq,
        DeleteSampleReq,
        AuditTrailRes,
        ErrorRes
    ))
)]
pub struct ApiDoc;

type ApiError = (StatusCode, Json<ErrorRes>);

/// Build the REST router with all routes, Swagger UI, and CORS.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/samples", get(list_samples).post(create_sample))
        .route("/samples/bulk-status", post(bulk_status))
        .route(
            "/samples/:id",
            get(get_sample).patch(update_sample).delete(delete_sample),
        )
        .route("/samples/:id/status", post(change_status))
        .route("/samples/:id/laboratory", post(reassign_laboratory))
        .route("/samples/:id/audit-trail", get(audit_trail))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Map a domain error to its HTTP response.
///
/// Validation and precondition failures are 4xx-class with the specific error
/// kind in the body so the caller can render an exact message; conflicts are
/// 409 and surfaced rather than retried.
fn error_response(error: SampleError) -> ApiError {
    let status = match &error {
        SampleError::InvalidInput(_) | SampleError::ReasonRequired => StatusCode::BAD_REQUEST,
        SampleError::InvalidTransition { .. }
        | SampleError::TerminalState(_)
        | SampleError::PreconditionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SampleError::ItemNotFound(_) => StatusCode::NOT_FOUND,
        SampleError::StoreConflict(_) | SampleError::AlreadyResolved => StatusCode::CONFLICT,
    };
    (
        status,
        Json(ErrorRes {
            kind: error.kind().to_owned(),
            message: error.to_string(),
        }),
    )
}

/// The acting user for audit entries, taken from the `x-actor` header.
///
/// Authentication is out of scope here; an upstream proxy is expected to set
/// the header. Requests without it act as `system`.
fn actor_from(headers: &HeaderMap) -> String {
    headers
        .get("x-actor")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| "system".to_owned())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API.
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/samples",
    params(ListSamplesQuery),
    responses(
        (status = 200, description = "List of samples", body = ListSamplesRes)
    )
)]
/// List samples, optionally filtered by status.
async fn list_samples(
    State(state): State<AppState>,
    Query(query): Query<ListSamplesQuery>,
) -> Json<ListSamplesRes> {
    let samples = state.sample_service.list(query.status).await;
    Json(ListSamplesRes {
        samples: samples.into_iter().map(Into::into).collect(),
    })
}

#[utoipa::path(
    post,
    path = "/samples",
    request_body = CreateSampleReq,
    responses(
        (status = 201, description = "Sample registered", body = SampleRes),
        (status = 400, description = "Invalid input", body = ErrorRes)
    )
)]
/// Register a new sample in `Pending` status.
async fn create_sample(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateSampleReq>,
) -> Result<(StatusCode, Json<SampleRes>), ApiError> {
    let actor = actor_from(&headers);
    let sample = state
        .sample_service
        .register(&actor, req.into())
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(sample.into())))
}

#[utoipa::path(
    get,
    path = "/samples/{id}",
    params(("id" = Uuid, Path, description = "Sample id")),
    responses(
        (status = 200, description = "The sample", body = SampleRes),
        (status = 404, description = "Unknown sample id", body = ErrorRes)
    )
)]
/// Fetch one sample by id.
async fn get_sample(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SampleRes>, ApiError> {
    let sample = state.sample_service.get(id).await.map_err(error_response)?;
    Ok(Json(sample.into()))
}

#[utoipa::path(
    post,
    path = "/samples/{id}/status",
    params(("id" = Uuid, Path, description = "Sample id")),
    request_body = StatusChangeReq,
    responses(
        (status = 200, description = "Updated sample", body = SampleRes),
        (status = 400, description = "Missing reason", body = ErrorRes),
        (status = 404, description = "Unknown sample id", body = ErrorRes),
        (status = 409, description = "Concurrent modification", body = ErrorRes),
        (status = 422, description = "Transition not permitted", body = ErrorRes)
    )
)]
/// Move a sample to a new status.
///
/// Rejection requires a `reason`; other targets accept an optional one. The
/// response carries the specific error kind on failure, e.g. `barcode not
/// scanned` for receiving an unscanned sample.
async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<StatusChangeReq>,
) -> Result<Json<SampleRes>, ApiError> {
    let actor = actor_from(&headers);
    let sample = state
        .sample_service
        .change_status(&actor, id, req.into())
        .await
        .map_err(error_response)?;
    Ok(Json(sample.into()))
}

#[utoipa::path(
    post,
    path = "/samples/bulk-status",
    request_body = BulkStatusReq,
    responses(
        (status = 200, description = "Partition of the bulk run", body = BulkStatusRes),
        (status = 400, description = "Invalid input", body = ErrorRes)
    )
)]
/// Apply one status change to many samples.
///
/// Items succeed or fail independently; the response partitions the ids and
/// reports the error kind for each failed item. The shared `reason` is reused
/// for every item's audit entry.
async fn bulk_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BulkStatusReq>,
) -> Result<Json<BulkStatusRes>, ApiError> {
    let actor = actor_from(&headers);
    let request = StatusTransitionRequest {
        target: req.target_status,
        reason: req.reason,
        payload: Default::default(),
    };
    let outcome = state
        .sample_service
        .bulk_change_status(&actor, &req.ids, request)
        .await
        .map_err(error_response)?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    get,
    path = "/samples/{id}/audit-trail",
    params(("id" = Uuid, Path, description = "Sample id")),
    responses(
        (status = 200, description = "Audit entries in append order", body = AuditTrailRes)
    )
)]
/// Audit trail for one sample, oldest entry first.
async fn audit_trail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Json<AuditTrailRes> {
    let entries = state.sample_service.audit_trail(id);
    Json(AuditTrailRes {
        entries: entries.into_iter().map(Into::into).collect(),
    })
}

#[utoipa::path(
    patch,
    path = "/samples/{id}",
    params(("id" = Uuid, Path, description = "Sample id")),
    request_body = UpdateSampleReq,
    responses(
        (status = 200, description = "Updated sample", body = SampleRes),
        (status = 400, description = "Missing reason", body = ErrorRes),
        (status = 404, description = "Unknown sample id", body = ErrorRes)
    )
)]
/// Update descriptive fields on a sample. Requires a reason.
async fn update_sample(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<UpdateSampleReq>,
) -> Result<Json<SampleRes>, ApiError> {
    let actor = actor_from(&headers);
    let reason = req.reason.clone();
    let sample = state
        .sample_service
        .update_fields(&actor, id, req.into(), &reason)
        .await
        .map_err(error_response)?;
    Ok(Json(sample.into()))
}

#[utoipa::path(
    post,
    path = "/samples/{id}/laboratory",
    params(("id" = Uuid, Path, description = "Sample id")),
    request_body = ReassignLaboratoryReq,
    responses(
        (status = 200, description = "Updated sample", body = SampleRes),
        (status = 400, description = "Missing reason", body = ErrorRes),
        (status = 404, description = "Unknown sample id", body = ErrorRes)
    )
)]
/// Reassign the laboratory for a sample. Requires a reason.
async fn reassign_laboratory(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<ReassignLaboratoryReq>,
) -> Result<Json<SampleRes>, ApiError> {
    let actor = actor_from(&headers);
    let sample = state
        .sample_service
        .reassign_laboratory(&actor, id, &req.laboratory_id, &req.reason)
        .await
        .map_err(error_response)?;
    Ok(Json(sample.into()))
}

#[utoipa::path(
    delete,
    path = "/samples/{id}",
    params(("id" = Uuid, Path, description = "Sample id")),
    request_body = DeleteSampleReq,
    responses(
        (status = 204, description = "Sample removed"),
        (status = 400, description = "Missing reason", body = ErrorRes),
        (status = 404, description = "Unknown sample id", body = ErrorRes)
    )
)]
/// Remove a sample from the active store. Requires a reason; the audit trail
/// for the id is retained.
async fn delete_sample(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<DeleteSampleReq>,
) -> Result<StatusCode, ApiError> {
    let actor = actor_from(&headers);
    state
        .sample_service
        .delete(&actor, id, &req.reason)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}
