//! Shared node state wired together at startup.

use chrono::Duration;
use std::sync::Arc;
use std::time::Instant;

use prism_audit::{AuditLog, InMemoryAuditLog};
use prism_cases::{CaseService, EventBus, InMemoryCaseRepository};
use prism_core::{AudienceTier, EntityType};
use prism_policy::{EntityStore, FieldPolicy, PolicySet, PolicyStore, RedactionStrategy};
use prism_vault::InMemoryVault;

use crate::auth::SessionDirectory;
use crate::config::PrismConfig;

/// Everything the HTTP handlers need, shared behind an `Arc`.
pub struct AppState {
    pub policies: Arc<PolicyStore>,
    pub entities: Arc<EntityStore>,
    pub audit: Arc<dyn AuditLog>,
    pub cases: CaseService,
    pub sessions: SessionDirectory,
    pub start_time: Instant,
}

impl AppState {
    /// Build the full engine from config, publishing the baseline policy
    /// catalogue so the node is usable without any administrative setup.
    pub fn bootstrap(config: &PrismConfig) -> Self {
        let policies = Arc::new(PolicyStore::new());
        publish_builtin_policies(&policies);

        let entities = Arc::new(EntityStore::new(Arc::clone(&policies)));
        let audit: Arc<dyn AuditLog> = Arc::new(InMemoryAuditLog::new());
        let cases = CaseService::new(
            Arc::new(InMemoryCaseRepository::new()),
            Arc::new(InMemoryVault::new()),
            Arc::clone(&entities),
            Arc::clone(&policies),
            Arc::clone(&audit),
            EventBus::default(),
            Duration::hours(config.review.document_grant_ttl_hours),
        );

        Self {
            policies,
            entities,
            audit,
            cases,
            sessions: SessionDirectory::from_config(&config.auth),
            start_time: Instant::now(),
        }
    }
}

/// Baseline visibility policies published at bootstrap (version 1 for each
/// entity type). Operators can publish replacements at runtime; these make
/// a fresh node immediately coherent.
pub fn publish_builtin_policies(policies: &PolicyStore) {
    policies.publish(
        PolicySet::new(EntityType::Organization)
            .with_field(FieldPolicy::new(
                "name",
                AudienceTier::Public,
                RedactionStrategy::Omit,
            ))
            .with_field(FieldPolicy::new(
                "mission",
                AudienceTier::Public,
                RedactionStrategy::Omit,
            ))
            .with_field(FieldPolicy::new(
                "sector",
                AudienceTier::Public,
                RedactionStrategy::Omit,
            ))
            .with_field(FieldPolicy::new(
                "contact_email",
                AudienceTier::Member,
                RedactionStrategy::Mask,
            ))
            .with_field(FieldPolicy::new(
                "contact_phone",
                AudienceTier::Member,
                RedactionStrategy::Mask,
            ))
            .with_field(
                FieldPolicy::new(
                    "registration_number",
                    AudienceTier::Government,
                    RedactionStrategy::Placeholder("verified registry id on file".into()),
                )
                .unlocks_on_verified(),
            )
            .with_field(FieldPolicy::new(
                "bank_account",
                AudienceTier::OwnerOnly,
                RedactionStrategy::Omit,
            ))
            .with_field(FieldPolicy::new(
                "pan_card",
                AudienceTier::OwnerOnly,
                RedactionStrategy::Omit,
            )),
    );

    policies.publish(
        PolicySet::new(EntityType::Individual)
            .with_field(FieldPolicy::new(
                "display_name",
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
                    "government_id",
                    AudienceTier::Government,
                    RedactionStrategy::Omit,
                )
                .unlocks_on_verified(),
            )
            .with_field(FieldPolicy::new(
                "pan_card",
                AudienceTier::OwnerOnly,
                RedactionStrategy::Omit,
            )),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_publishes_both_catalogues() {
        let state = AppState::bootstrap(&PrismConfig::default());
        let org = state.policies.current(EntityType::Organization).unwrap();
        let ind = state.policies.current(EntityType::Individual).unwrap();
        assert_eq!(org.version, 1);
        assert_eq!(ind.version, 1);
        assert!(org.defines("name"));
        assert!(org.defines("bank_account"));
        assert!(ind.defines("government_id"));
    }

    #[test]
    fn test_builtin_unlock_fields() {
        let policies = PolicyStore::new();
        publish_builtin_policies(&policies);
        let org = policies.current(EntityType::Organization).unwrap();
        let reg = org.policy_for("registration_number").unwrap();
        assert!(reg.unlocks_on_verified);
        assert_eq!(reg.minimum_tier, AudienceTier::Government);
        // Banking details never unlock.
        assert!(!org.policy_for("bank_account").unwrap().unlocks_on_verified);
    }
}
