use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use prism_core::{
    CaseId, CaseState, DocumentRef, DocumentType, EntityId, EntityType, FieldValue, ViewerId,
};

/// A reviewer note, optionally naming a defective document type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewNote {
    pub note: String,
    pub defective_document: Option<DocumentType>,
    pub at: DateTime<Utc>,
}

/// One pending profile change recorded during the draft wizard. Patches are
/// append-only and applied to the entity atomically at submit, never earlier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldPatch {
    pub field: String,
    pub value: FieldValue,
    pub recorded_at: DateTime<Utc>,
}

/// The bounded unit of work tracking an entity's progress toward a
/// verified/rejected decision. One active case per entity at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationCase {
    pub case_id: CaseId,
    pub entity_id: EntityId,
    /// The registrant that opened the case — the only principal allowed to
    /// mutate it while in a draft state.
    pub registrant: ViewerId,
    pub state: CaseState,
    /// Determined by entity type at open time.
    pub required_documents: BTreeSet<DocumentType>,
    pub submitted_documents: BTreeMap<DocumentType, DocumentRef>,
    pub reviewer_id: Option<ViewerId>,
    pub reviewer_notes: Vec<ReviewNote>,
    pub declaration_accepted_at: Option<DateTime<Utc>>,
    pub pending_patches: Vec<FieldPatch>,
    /// External compliance event reference set at revocation.
    pub compliance_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl VerificationCase {
    /// Open a fresh draft case for an entity.
    pub fn new(entity_id: EntityId, registrant: ViewerId, entity_type: EntityType) -> Self {
        Self {
            case_id: CaseId::generate(),
            entity_id,
            registrant,
            state: CaseState::Draft,
            required_documents: Self::required_documents_for(entity_type),
            submitted_documents: BTreeMap::new(),
            reviewer_id: None,
            reviewer_notes: Vec::new(),
            declaration_accepted_at: None,
            pending_patches: Vec::new(),
            compliance_ref: None,
            created_at: Utc::now(),
            decided_at: None,
        }
    }

    /// Document catalogue per entity type.
    pub fn required_documents_for(entity_type: EntityType) -> BTreeSet<DocumentType> {
        match entity_type {
            EntityType::Organization => BTreeSet::from([
                DocumentType::RegistrationCertificate,
                DocumentType::TrustDeed,
                DocumentType::PanCard,
            ]),
            EntityType::Individual => {
                BTreeSet::from([DocumentType::GovernmentId, DocumentType::PanCard])
            }
        }
    }

    /// Required document types not yet submitted, in stable order.
    pub fn missing_documents(&self) -> Vec<DocumentType> {
        self.required_documents
            .iter()
            .filter(|dt| !self.submitted_documents.contains_key(dt))
            .copied()
            .collect()
    }

    pub fn declaration_accepted(&self) -> bool {
        self.declaration_accepted_at.is_some()
    }
}
