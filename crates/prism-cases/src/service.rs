//! Lifecycle orchestration for verification cases.
//!
//! Every transition is one atomic operation against the case repository
//! under optimistic concurrency. Guard failures abort the whole transition —
//! no partial state is ever persisted.

use bytes::Bytes;
use chrono::{Duration, Utc};
use std::sync::Arc;

use prism_audit::{AuditEvent, AuditLog};
use prism_core::{
    AudienceTier, CaseEvent, CaseId, CaseState, CaseStateMachine, CoreError, DocumentId,
    DocumentType, EntityId, FieldValue, VerificationStatus, ViewerContext, ViewerId,
};
use prism_policy::{EntityStore, PolicyStore};
use prism_vault::DocumentVault;

use crate::case::{FieldPatch, ReviewNote, VerificationCase};
use crate::events::{DomainEvent, EventBus};
use crate::repository::{CaseRecord, CaseRepository};

/// A reviewer's decision on a case under review.
#[derive(Debug, Clone)]
pub enum ReviewDecision {
    Approve,
    /// Rejection must be explainable.
    Reject { notes: String },
    /// Sends the case back naming the defective document.
    RequestResubmission {
        notes: String,
        defective_document: DocumentType,
    },
}

/// Drives verification cases from first submission to a terminal state.
pub struct CaseService {
    repository: Arc<dyn CaseRepository>,
    vault: Arc<dyn DocumentVault>,
    entities: Arc<EntityStore>,
    policies: Arc<PolicyStore>,
    audit: Arc<dyn AuditLog>,
    events: EventBus,
    /// How long a claiming reviewer may fetch submitted documents.
    review_grant_ttl: Duration,
}

impl CaseService {
    pub fn new(
        repository: Arc<dyn CaseRepository>,
        vault: Arc<dyn DocumentVault>,
        entities: Arc<EntityStore>,
        policies: Arc<PolicyStore>,
        audit: Arc<dyn AuditLog>,
        events: EventBus,
        review_grant_ttl: Duration,
    ) -> Self {
        Self {
            repository,
            vault,
            entities,
            policies,
            audit,
            events,
            review_grant_ttl,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Open a draft case for the entity. Registrant only; at most one
    /// active case per entity — a rejected or revoked history permits a
    /// fresh case with a new id.
    pub async fn open_case(
        &self,
        entity_id: &EntityId,
        actor: &ViewerContext,
    ) -> Result<CaseRecord, CoreError> {
        let entity = self.entities.get(entity_id)?;
        if !actor.is_owner_of(&entity) {
            return Err(CoreError::AccessDenied(
                "only the registrant may open a verification case".into(),
            ));
        }
        if let Some(active) = self.repository.active_for_entity(entity_id).await? {
            return Err(CoreError::ValidationError(format!(
                "entity already has an active case in state {}",
                active.case.state
            )));
        }

        let case = VerificationCase::new(
            entity_id.clone(),
            entity.registrant.clone(),
            entity.entity_type,
        );
        let record = self.repository.insert(case).await?;

        tracing::info!(
            case_id = %record.case.case_id,
            entity_id = %entity_id,
            "verification case opened"
        );
        self.audit.append(AuditEvent::transition(
            entity_id.clone(),
            actor,
            format!("case {} opened (draft)", record.case.case_id),
        ))?;
        Ok(record)
    }

    /// Read a case. Visible to the registrant, the assigned reviewer, and
    /// government-tier viewers.
    pub async fn get_case(
        &self,
        case_id: &CaseId,
        actor: &ViewerContext,
    ) -> Result<CaseRecord, CoreError> {
        let record = self.repository.get(case_id).await?;
        let allowed = actor.viewer_id.as_ref() == Some(&record.case.registrant)
            || actor.viewer_id == record.case.reviewer_id
            || actor.tier.satisfies(AudienceTier::Government);
        if !allowed {
            return Err(CoreError::AccessDenied(format!("case {}", case_id)));
        }
        Ok(record)
    }

    /// Store document bytes in the vault and record the ref on the case.
    /// Registrant only, draft states only.
    pub async fn attach_document(
        &self,
        case_id: &CaseId,
        actor: &ViewerContext,
        document_type: DocumentType,
        bytes: Bytes,
        expected_version: u64,
    ) -> Result<CaseRecord, CoreError> {
        let record = self.repository.get(case_id).await?;
        // Reject stale versions before touching the vault so a lost race
        // does not leave an orphaned blob behind.
        if record.version != expected_version {
            return Err(CoreError::ConcurrentModification {
                case_id: case_id.to_string(),
                expected: expected_version,
                actual: record.version,
            });
        }
        let mut case = record.case;
        self.require_registrant(&case, actor)?;
        self.require_mutable(&case, "attach documents")?;

        let registrant = case.registrant.clone();
        let doc_ref = self
            .vault
            .store(bytes, document_type, &registrant)
            .await?;
        let document_id = doc_ref.document_id.clone();
        case.submitted_documents.insert(document_type, doc_ref);

        match self.repository.update(case, expected_version).await {
            Ok(updated) => {
                tracing::info!(
                    case_id = %case_id,
                    document_type = %document_type,
                    document_id = %document_id,
                    "document attached to case"
                );
                Ok(updated)
            }
            Err(err) => {
                // The version moved between the pre-check and the update;
                // the stored blob belongs to no committed case state.
                if let Err(discard_err) = self.vault.discard(&document_id, &registrant).await {
                    tracing::warn!(
                        document_id = %document_id,
                        error = %discard_err,
                        "failed to discard blob after update conflict"
                    );
                }
                Err(err)
            }
        }
    }

    /// Record a profile patch from a wizard step. Fail-closed field check
    /// happens here; application happens atomically at submit.
    pub async fn record_patch(
        &self,
        case_id: &CaseId,
        actor: &ViewerContext,
        field: impl Into<String>,
        value: FieldValue,
        expected_version: u64,
    ) -> Result<CaseRecord, CoreError> {
        let record = self.repository.get(case_id).await?;
        let mut case = record.case;
        self.require_registrant(&case, actor)?;
        self.require_mutable(&case, "record patches")?;

        let field = field.into();
        let entity = self.entities.get(&case.entity_id)?;
        let policy = self.policies.current(entity.entity_type)?;
        if !policy.defines(&field) {
            return Err(CoreError::UnknownField(field));
        }

        case.pending_patches.push(FieldPatch {
            field,
            value,
            recorded_at: Utc::now(),
        });
        self.repository.update(case, expected_version).await
    }

    /// Record the registrant's declaration of truthfulness.
    pub async fn accept_declaration(
        &self,
        case_id: &CaseId,
        actor: &ViewerContext,
        expected_version: u64,
    ) -> Result<CaseRecord, CoreError> {
        let record = self.repository.get(case_id).await?;
        let mut case = record.case;
        self.require_registrant(&case, actor)?;
        self.require_mutable(&case, "accept the declaration")?;

        case.declaration_accepted_at = Some(Utc::now());
        self.repository.update(case, expected_version).await
    }

    /// Submit the case for review. Requires the declaration and the full
    /// required-document set; applies pending patches to the entity
    /// atomically and flips its status to pending.
    pub async fn submit(
        &self,
        case_id: &CaseId,
        actor: &ViewerContext,
        expected_version: u64,
    ) -> Result<CaseRecord, CoreError> {
        let record = self.repository.get(case_id).await?;
        let mut case = record.case;
        self.require_registrant(&case, actor)?;

        if !case.declaration_accepted() {
            return Err(CoreError::InvalidTransition(
                "declaration not accepted".into(),
            ));
        }
        let missing = case.missing_documents();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|d| d.as_str()).collect();
            return Err(CoreError::InvalidTransition(format!(
                "missing document: {}",
                names.join(", ")
            )));
        }

        // Validate patches before the version check claims the transition,
        // so a submit never half-applies.
        let entity = self.entities.get(&case.entity_id)?;
        if entity.withdrawn {
            return Err(CoreError::ValidationError(
                "entity is withdrawn and read-only".into(),
            ));
        }
        let policy = self.policies.current(entity.entity_type)?;
        for patch in &case.pending_patches {
            if !policy.defines(&patch.field) {
                return Err(CoreError::UnknownField(patch.field.clone()));
            }
        }

        let from = case.state;
        case.state = CaseStateMachine::transition(case.state, CaseEvent::Submit)?;
        let updated = self.repository.update(case, expected_version).await?;

        let patches: Vec<(String, FieldValue)> = updated
            .case
            .pending_patches
            .iter()
            .map(|p| (p.field.clone(), p.value.clone()))
            .collect();
        if !patches.is_empty() {
            self.entities.apply_patches(&updated.case.entity_id, &patches)?;
        }
        self.entities
            .set_status(&updated.case.entity_id, VerificationStatus::Pending)?;

        self.record_transition(&updated, actor, from).await?;
        Ok(updated)
    }

    /// A government reviewer claims the case, gaining time-limited vault
    /// access to every submitted document.
    pub async fn claim_review(
        &self,
        case_id: &CaseId,
        reviewer: &ViewerContext,
        expected_version: u64,
    ) -> Result<CaseRecord, CoreError> {
        let reviewer_id = self.require_reviewer_tier(reviewer)?;
        let record = self.repository.get(case_id).await?;
        let mut case = record.case;

        let from = case.state;
        case.state = CaseStateMachine::transition(case.state, CaseEvent::ClaimReview)?;
        case.reviewer_id = Some(reviewer_id.clone());

        // Grants accompany assignment: if the claim does not commit, no
        // grant may survive it. A claimant that loses the version race must
        // end up with zero document access.
        let doc_ids: Vec<DocumentId> = case
            .submitted_documents
            .values()
            .map(|d| d.document_id.clone())
            .collect();
        let mut granted: Vec<DocumentId> = Vec::with_capacity(doc_ids.len());
        for doc_id in &doc_ids {
            if let Err(err) = self
                .vault
                .grant_access(doc_id, &reviewer_id, self.review_grant_ttl)
                .await
            {
                self.revoke_grants(&granted, &reviewer_id).await;
                return Err(err.into());
            }
            granted.push(doc_id.clone());
        }

        let updated = match self.repository.update(case, expected_version).await {
            Ok(updated) => updated,
            Err(err) => {
                self.revoke_grants(&granted, &reviewer_id).await;
                return Err(err);
            }
        };
        self.record_transition(&updated, reviewer, from).await?;
        Ok(updated)
    }

    /// Record the assigned reviewer's decision.
    pub async fn decide(
        &self,
        case_id: &CaseId,
        reviewer: &ViewerContext,
        decision: ReviewDecision,
        expected_version: u64,
    ) -> Result<CaseRecord, CoreError> {
        let reviewer_id = self.require_reviewer_tier(reviewer)?;
        let record = self.repository.get(case_id).await?;
        let mut case = record.case;

        if case.reviewer_id.as_ref() != Some(&reviewer_id) {
            return Err(CoreError::AccessDenied(
                "only the assigned reviewer may decide this case".into(),
            ));
        }

        let from = case.state;
        let (event, entity_status) = match &decision {
            ReviewDecision::Approve => {
                // Superset check at the moment of transition, not submit time.
                let missing = case.missing_documents();
                if !missing.is_empty() {
                    let names: Vec<&str> = missing.iter().map(|d| d.as_str()).collect();
                    return Err(CoreError::InvalidTransition(format!(
                        "missing document: {}",
                        names.join(", ")
                    )));
                }
                (CaseEvent::Approve, Some(VerificationStatus::Verified))
            }
            ReviewDecision::Reject { notes } => {
                if notes.trim().is_empty() {
                    return Err(CoreError::InvalidTransition(
                        "rejection requires reviewer notes".into(),
                    ));
                }
                case.reviewer_notes.push(ReviewNote {
                    note: notes.clone(),
                    defective_document: None,
                    at: Utc::now(),
                });
                (CaseEvent::Reject, Some(VerificationStatus::Unverified))
            }
            ReviewDecision::RequestResubmission {
                notes,
                defective_document,
            } => {
                if notes.trim().is_empty() {
                    return Err(CoreError::InvalidTransition(
                        "resubmission request requires reviewer notes".into(),
                    ));
                }
                case.reviewer_notes.push(ReviewNote {
                    note: notes.clone(),
                    defective_document: Some(*defective_document),
                    at: Utc::now(),
                });
                // Entity status is not downgraded mid-review.
                (CaseEvent::RequestResubmission, None)
            }
        };

        case.state = CaseStateMachine::transition(case.state, event)?;
        if case.state.is_decided() {
            case.decided_at = Some(Utc::now());
        }

        let updated = self.repository.update(case, expected_version).await?;

        if let Some(status) = entity_status {
            self.entities.set_status(&updated.case.entity_id, status)?;
        }
        // The review is over for decided cases; drop the reviewer's grants.
        if updated.case.state.is_decided() {
            for doc_ref in updated.case.submitted_documents.values() {
                self.vault
                    .revoke_access(&doc_ref.document_id, &reviewer_id)
                    .await?;
            }
        }

        self.record_transition(&updated, reviewer, from).await?;
        Ok(updated)
    }

    /// Revoke a verified case on an external compliance event. Irreversible.
    /// The status downgrade removes `unlocks_on_verified` exposures lazily
    /// on the next resolution; past audit events are untouched.
    pub async fn revoke(
        &self,
        case_id: &CaseId,
        actor: &ViewerContext,
        compliance_ref: &str,
        expected_version: u64,
    ) -> Result<CaseRecord, CoreError> {
        self.require_reviewer_tier(actor)?;
        if compliance_ref.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "revocation requires a compliance event reference".into(),
            ));
        }

        let record = self.repository.get(case_id).await?;
        let mut case = record.case;
        let from = case.state;
        case.state = CaseStateMachine::transition(case.state, CaseEvent::Revoke)?;
        case.compliance_ref = Some(compliance_ref.to_string());

        let updated = self.repository.update(case, expected_version).await?;
        self.entities
            .set_status(&updated.case.entity_id, VerificationStatus::Revoked)?;

        tracing::warn!(
            case_id = %case_id,
            entity_id = %updated.case.entity_id,
            compliance_ref,
            "verified case revoked"
        );
        self.audit.append(AuditEvent::revocation(
            updated.case.entity_id.clone(),
            actor,
            format!(
                "case {} revoked (compliance ref {})",
                case_id, compliance_ref
            ),
        ))?;
        self.events.publish(DomainEvent::CaseStateChanged {
            case_id: updated.case.case_id.clone(),
            entity_id: updated.case.entity_id.clone(),
            from,
            to: updated.case.state,
        });
        Ok(updated)
    }

    /// Best-effort rollback of grants issued during a claim that failed to
    /// commit. Revocation errors are logged, not propagated: the caller is
    /// already returning the original failure.
    async fn revoke_grants(&self, doc_ids: &[DocumentId], reviewer_id: &ViewerId) {
        for doc_id in doc_ids {
            if let Err(err) = self.vault.revoke_access(doc_id, reviewer_id).await {
                tracing::warn!(
                    document_id = %doc_id,
                    reviewer_id = %reviewer_id,
                    error = %err,
                    "failed to revoke grant while rolling back claim"
                );
            }
        }
    }

    fn require_registrant(
        &self,
        case: &VerificationCase,
        actor: &ViewerContext,
    ) -> Result<(), CoreError> {
        if actor.viewer_id.as_ref() != Some(&case.registrant) {
            return Err(CoreError::AccessDenied(
                "only the registrant may mutate this case".into(),
            ));
        }
        Ok(())
    }

    fn require_mutable(&self, case: &VerificationCase, action: &str) -> Result<(), CoreError> {
        if !case.state.registrant_mutable() {
            return Err(CoreError::InvalidTransition(format!(
                "cannot {} in state {}",
                action, case.state
            )));
        }
        Ok(())
    }

    fn require_reviewer_tier(&self, actor: &ViewerContext) -> Result<ViewerId, CoreError> {
        if !actor.tier.satisfies(AudienceTier::Government) {
            return Err(CoreError::AccessDenied(
                "reviewer actions require the government tier".into(),
            ));
        }
        actor
            .viewer_id
            .clone()
            .ok_or_else(|| CoreError::AccessDenied("reviewer identity required".into()))
    }

    async fn record_transition(
        &self,
        record: &CaseRecord,
        actor: &ViewerContext,
        from: CaseState,
    ) -> Result<(), CoreError> {
        self.audit.append(AuditEvent::transition(
            record.case.entity_id.clone(),
            actor,
            format!(
                "case {}: {} -> {}",
                record.case.case_id, from, record.case.state
            ),
        ))?;
        self.events.publish(DomainEvent::CaseStateChanged {
            case_id: record.case.case_id.clone(),
            entity_id: record.case.entity_id.clone(),
            from,
            to: record.case.state,
        });
        Ok(())
    }
}
