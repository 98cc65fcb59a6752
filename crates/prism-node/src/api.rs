//! HTTP API for the Prism node.
//!
//! Every handler derives the viewer context from the bearer token first and
//! hands it to the engine; authorization lives in the domain crates, not
//! here. Handlers only translate errors to status codes.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use prism_audit::AuditEvent;
use prism_cases::{CaseRecord, DomainEvent, ReviewDecision, VerificationCase};
use prism_core::{
    CaseId, CoreError, DocumentType, EntityId, EntityType, FieldValue, VerificationStatus,
};
use prism_resolver::{resolve_audited, ProjectedView};

use crate::state::AppState;

// --- Response types ---

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub uptime_secs: u64,
    pub entity_count: usize,
    pub audit_events: usize,
    pub session_count: usize,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub retryable: bool,
}

#[derive(Serialize)]
pub struct EntityResponse {
    pub entity_id: EntityId,
    pub entity_type: EntityType,
    pub verification_status: VerificationStatus,
    pub policy_version: u32,
}

#[derive(Serialize)]
pub struct CaseResponse {
    pub version: u64,
    #[serde(flatten)]
    pub case: VerificationCase,
}

impl From<CaseRecord> for CaseResponse {
    fn from(record: CaseRecord) -> Self {
        Self {
            version: record.version,
            case: record.case,
        }
    }
}

#[derive(Serialize)]
pub struct AuditResponse {
    pub entity_id: EntityId,
    pub events: Vec<AuditEvent>,
}

// --- Request types ---

#[derive(Deserialize)]
pub struct RegisterEntityRequest {
    pub entity_type: EntityType,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
    /// Consent preference rows applied after registration.
    #[serde(default)]
    pub consents: BTreeMap<String, bool>,
}

#[derive(Deserialize)]
pub struct OpenCaseRequest {
    pub entity_id: EntityId,
}

#[derive(Deserialize)]
pub struct AttachDocumentRequest {
    pub document_type: String,
    /// Base64-encoded document bytes.
    pub content: String,
    pub expected_version: u64,
}

#[derive(Deserialize)]
pub struct RecordPatchRequest {
    pub field: String,
    pub value: FieldValue,
    pub expected_version: u64,
}

#[derive(Deserialize)]
pub struct VersionedRequest {
    pub expected_version: u64,
}

#[derive(Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DecisionOutcome {
    Approve,
    Reject { notes: String },
    RequestResubmission {
        notes: String,
        defective_document: String,
    },
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    #[serde(flatten)]
    pub decision: DecisionOutcome,
    pub expected_version: u64,
}

#[derive(Deserialize)]
pub struct RevokeRequest {
    pub compliance_ref: String,
    pub expected_version: u64,
}

// --- Error mapping ---

type ApiError = (StatusCode, Json<ErrorResponse>);

fn map_error(err: CoreError) -> ApiError {
    let status = match &err {
        CoreError::PolicyGap { .. } | CoreError::MissingPolicySet(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        CoreError::UnknownField(_) | CoreError::ValidationError(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CoreError::AccessDenied(_) => StatusCode::FORBIDDEN,
        CoreError::InvalidTransition(_) | CoreError::ConcurrentModification { .. } => {
            StatusCode::CONFLICT
        }
        CoreError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    } else {
        tracing::debug!(error = %err, "request rejected");
    }
    (
        status,
        Json(ErrorResponse {
            retryable: err.is_retryable(),
            error: err.to_string(),
        }),
    )
}

// --- Handlers ---

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

async fn handle_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        entity_count: state.entities.len(),
        audit_events: state.audit.len(),
        session_count: state.sessions.len(),
    })
}

async fn handle_register_entity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RegisterEntityRequest>,
) -> Result<Json<EntityResponse>, ApiError> {
    let viewer = state.sessions.context_for(&headers);
    let registrant = viewer.viewer_id.clone().ok_or_else(|| {
        map_error(CoreError::AccessDenied(
            "registration requires an authenticated viewer".into(),
        ))
    })?;

    let entity = state
        .entities
        .register(req.entity_type, registrant, req.fields)
        .map_err(map_error)?;
    for (key, enabled) in req.consents {
        state
            .entities
            .set_consent(&entity.id, &viewer, key, enabled)
            .map_err(map_error)?;
    }

    Ok(Json(EntityResponse {
        entity_id: entity.id,
        entity_type: entity.entity_type,
        verification_status: entity.verification_status,
        policy_version: entity.policy_version,
    }))
}

async fn handle_view_entity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ProjectedView>, ApiError> {
    let viewer = state.sessions.context_for(&headers);
    let entity = state
        .entities
        .get(&EntityId::from(id.as_str()))
        .map_err(map_error)?;
    let policy = state
        .policies
        .current(entity.entity_type)
        .map_err(map_error)?;

    let view = resolve_audited(&entity, &viewer, &policy, state.audit.as_ref())
        .map_err(map_error)?;

    // One aggregated event per resolution for external subscribers.
    let disclosed: Vec<String> = view
        .fields
        .iter()
        .filter(|(_, d)| d.is_disclosed())
        .map(|(name, _)| name.clone())
        .collect();
    if !disclosed.is_empty() {
        state.cases.events().publish(DomainEvent::FieldDisclosed {
            entity_id: entity.id.clone(),
            viewer_tier: viewer.tier,
            fields: disclosed,
        });
    }
    Ok(Json(view))
}

async fn handle_withdraw_entity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let viewer = state.sessions.context_for(&headers);
    state
        .entities
        .withdraw(&EntityId::from(id.as_str()), &viewer)
        .map_err(map_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_entity_audit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<AuditResponse>, ApiError> {
    let viewer = state.sessions.context_for(&headers);
    let entity_id = EntityId::from(id.as_str());
    let entity = state.entities.get(&entity_id).map_err(map_error)?;

    let allowed = viewer.is_owner_of(&entity)
        || viewer.tier.satisfies(prism_core::AudienceTier::Government);
    if !allowed {
        return Err(map_error(CoreError::AccessDenied(
            "audit trail is visible to the registrant and government reviewers".into(),
        )));
    }

    Ok(Json(AuditResponse {
        events: state.audit.events_for(&entity_id),
        entity_id,
    }))
}

async fn handle_open_case(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<OpenCaseRequest>,
) -> Result<Json<CaseResponse>, ApiError> {
    let viewer = state.sessions.context_for(&headers);
    let record = state
        .cases
        .open_case(&req.entity_id, &viewer)
        .await
        .map_err(map_error)?;
    Ok(Json(record.into()))
}

async fn handle_get_case(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CaseResponse>, ApiError> {
    let viewer = state.sessions.context_for(&headers);
    let record = state
        .cases
        .get_case(&CaseId::from(id.as_str()), &viewer)
        .await
        .map_err(map_error)?;
    Ok(Json(record.into()))
}

async fn handle_attach_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<AttachDocumentRequest>,
) -> Result<Json<CaseResponse>, ApiError> {
    let viewer = state.sessions.context_for(&headers);
    let document_type = DocumentType::parse(&req.document_type).map_err(map_error)?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&req.content)
        .map_err(|e| {
            map_error(CoreError::ValidationError(format!(
                "document content is not valid base64: {}",
                e
            )))
        })?;

    let record = state
        .cases
        .attach_document(
            &CaseId::from(id.as_str()),
            &viewer,
            document_type,
            Bytes::from(bytes),
            req.expected_version,
        )
        .await
        .map_err(map_error)?;
    Ok(Json(record.into()))
}

async fn handle_record_patch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<RecordPatchRequest>,
) -> Result<Json<CaseResponse>, ApiError> {
    let viewer = state.sessions.context_for(&headers);
    let record = state
        .cases
        .record_patch(
            &CaseId::from(id.as_str()),
            &viewer,
            req.field,
            req.value,
            req.expected_version,
        )
        .await
        .map_err(map_error)?;
    Ok(Json(record.into()))
}

async fn handle_accept_declaration(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<VersionedRequest>,
) -> Result<Json<CaseResponse>, ApiError> {
    let viewer = state.sessions.context_for(&headers);
    let record = state
        .cases
        .accept_declaration(&CaseId::from(id.as_str()), &viewer, req.expected_version)
        .await
        .map_err(map_error)?;
    Ok(Json(record.into()))
}

async fn handle_submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<VersionedRequest>,
) -> Result<Json<CaseResponse>, ApiError> {
    let viewer = state.sessions.context_for(&headers);
    let record = state
        .cases
        .submit(&CaseId::from(id.as_str()), &viewer, req.expected_version)
        .await
        .map_err(map_error)?;
    Ok(Json(record.into()))
}

async fn handle_claim(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<VersionedRequest>,
) -> Result<Json<CaseResponse>, ApiError> {
    let viewer = state.sessions.context_for(&headers);
    let record = state
        .cases
        .claim_review(&CaseId::from(id.as_str()), &viewer, req.expected_version)
        .await
        .map_err(map_error)?;
    Ok(Json(record.into()))
}

async fn handle_decision(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<CaseResponse>, ApiError> {
    let viewer = state.sessions.context_for(&headers);
    let decision = match req.decision {
        DecisionOutcome::Approve => ReviewDecision::Approve,
        DecisionOutcome::Reject { notes } => ReviewDecision::Reject { notes },
        DecisionOutcome::RequestResubmission {
            notes,
            defective_document,
        } => ReviewDecision::RequestResubmission {
            notes,
            defective_document: DocumentType::parse(&defective_document).map_err(map_error)?,
        },
    };

    let record = state
        .cases
        .decide(
            &CaseId::from(id.as_str()),
            &viewer,
            decision,
            req.expected_version,
        )
        .await
        .map_err(map_error)?;
    Ok(Json(record.into()))
}

async fn handle_revoke(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<RevokeRequest>,
) -> Result<Json<CaseResponse>, ApiError> {
    let viewer = state.sessions.context_for(&headers);
    let record = state
        .cases
        .revoke(
            &CaseId::from(id.as_str()),
            &viewer,
            &req.compliance_ref,
            req.expected_version,
        )
        .await
        .map_err(map_error)?;
    Ok(Json(record.into()))
}

// --- Server ---

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(handle_health))
        .route("/api/v1/status", get(handle_status))
        .route("/api/v1/entities", post(handle_register_entity))
        .route("/api/v1/entities/{id}/view", get(handle_view_entity))
        .route("/api/v1/entities/{id}/withdraw", post(handle_withdraw_entity))
        .route("/api/v1/entities/{id}/audit", get(handle_entity_audit))
        .route("/api/v1/verification-cases", post(handle_open_case))
        .route("/api/v1/verification-cases/{id}", get(handle_get_case))
        .route(
            "/api/v1/verification-cases/{id}/documents",
            post(handle_attach_document),
        )
        .route(
            "/api/v1/verification-cases/{id}/patches",
            post(handle_record_patch),
        )
        .route(
            "/api/v1/verification-cases/{id}/declaration",
            post(handle_accept_declaration),
        )
        .route("/api/v1/verification-cases/{id}/submit", post(handle_submit))
        .route("/api/v1/verification-cases/{id}/claim", post(handle_claim))
        .route(
            "/api/v1/verification-cases/{id}/decision",
            post(handle_decision),
        )
        .route("/api/v1/verification-cases/{id}/revoke", post(handle_revoke))
        .with_state(state)
}

pub async fn start_api_server(
    listen_addr: SocketAddr,
    state: Arc<AppState>,
) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("received shutdown signal");
            }
        })
        .await?;
    Ok(())
}
