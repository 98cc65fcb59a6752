//! Shared fixtures for the cross-crate scenario tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Duration;

use prism_audit::{AuditLog, InMemoryAuditLog};
use prism_cases::{CaseRecord, CaseService, EventBus, InMemoryCaseRepository};
use prism_core::{
    AudienceTier, DocumentType, Entity, EntityId, EntityType, FieldValue, ViewerContext, ViewerId,
};
use prism_policy::{EntityStore, FieldPolicy, PolicySet, PolicyStore, RedactionStrategy};
use prism_vault::InMemoryVault;

pub const OWNER: &str = "v-owner";
pub const REVIEWER: &str = "v-reviewer";

/// The whole engine wired with in-memory collaborators, as the node does it.
pub struct TestEngine {
    pub policies: Arc<PolicyStore>,
    pub entities: Arc<EntityStore>,
    pub audit: Arc<InMemoryAuditLog>,
    pub service: CaseService,
}

impl TestEngine {
    pub fn new() -> Self {
        let policies = Arc::new(PolicyStore::new());
        policies.publish(organization_policies());

        let entities = Arc::new(EntityStore::new(Arc::clone(&policies)));
        let audit = Arc::new(InMemoryAuditLog::new());
        let service = CaseService::new(
            Arc::new(InMemoryCaseRepository::new()),
            Arc::new(InMemoryVault::new()),
            Arc::clone(&entities),
            Arc::clone(&policies),
            audit.clone() as Arc<dyn AuditLog>,
            EventBus::default(),
            Duration::hours(72),
        );

        Self {
            policies,
            entities,
            audit,
            service,
        }
    }

    /// Register an organization with a representative field spread: one
    /// field per visibility tier plus an unlock-on-verified registry id.
    pub fn register_org(&self) -> Entity {
        let mut fields = BTreeMap::new();
        fields.insert(
            "name".to_string(),
            FieldValue::Text("Hopeful Futures".into()),
        );
        fields.insert(
            "contact_email".to_string(),
            FieldValue::Text("team@hopeful-futures.org".into()),
        );
        fields.insert(
            "registration_number".to_string(),
            FieldValue::Text("NGO-2023-0042".into()),
        );
        fields.insert(
            "bank_account".to_string(),
            FieldValue::Text("0042-7".into()),
        );
        self.entities
            .register(EntityType::Organization, ViewerId::from(OWNER), fields)
            .expect("registration should succeed")
    }

    /// Drive a fresh case for the entity all the way to a verified decision.
    pub async fn verify_entity(&self, entity_id: &EntityId) -> CaseRecord {
        let record = self.submit_case(entity_id).await;
        let claimed = self
            .service
            .claim_review(&record.case.case_id, &reviewer(), record.version)
            .await
            .expect("claim should succeed");
        self.service
            .decide(
                &claimed.case.case_id,
                &reviewer(),
                prism_cases::ReviewDecision::Approve,
                claimed.version,
            )
            .await
            .expect("approval should succeed")
    }

    /// Open, document, declare, and submit a case for the entity.
    pub async fn submit_case(&self, entity_id: &EntityId) -> CaseRecord {
        let record = self
            .service
            .open_case(entity_id, &owner())
            .await
            .expect("open should succeed");
        let id = record.case.case_id.clone();
        let mut version = record.version;

        for dt in [
            DocumentType::RegistrationCertificate,
            DocumentType::TrustDeed,
            DocumentType::PanCard,
        ] {
            version = self
                .service
                .attach_document(&id, &owner(), dt, Bytes::from_static(b"scan"), version)
                .await
                .expect("attach should succeed")
                .version;
        }
        version = self
            .service
            .accept_declaration(&id, &owner(), version)
            .await
            .expect("declaration should succeed")
            .version;
        self.service
            .submit(&id, &owner(), version)
            .await
            .expect("submit should succeed")
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}

pub fn owner() -> ViewerContext {
    ViewerContext::authenticated(ViewerId::from(OWNER), AudienceTier::Member)
}

pub fn reviewer() -> ViewerContext {
    ViewerContext::authenticated(ViewerId::from(REVIEWER), AudienceTier::Government)
}

pub fn member(id: &str) -> ViewerContext {
    ViewerContext::authenticated(ViewerId::from(id), AudienceTier::Member)
}

/// The organization policy catalogue used across the scenarios.
pub fn organization_policies() -> PolicySet {
    PolicySet::new(EntityType::Organization)
        .with_field(FieldPolicy::new(
            "name",
            AudienceTier::Public,
            RedactionStrategy::Omit,
        ))
        .with_field(FieldPolicy::new(
            "contact_email",
            AudienceTier::Member,
            RedactionStrategy::Mask,
        ))
        .with_field(
            FieldPolicy::new(
                "registration_number",
                AudienceTier::Government,
                RedactionStrategy::Placeholder("available to verified-org viewers".into()),
            )
            .unlocks_on_verified(),
        )
        .with_field(FieldPolicy::new(
            "bank_account",
            AudienceTier::OwnerOnly,
            RedactionStrategy::Omit,
        ))
}
