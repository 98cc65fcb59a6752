//! Integration test: revocation and the unlock-on-verified field.
//!
//! Verification lowers the registry id's bar to the member tier; revocation
//! raises it back lazily on the next resolution while the audit trail of
//! past disclosures survives untouched.

use prism_audit::log::AuditLog;
use prism_core::{CoreError, FieldValue, VerificationStatus};
use prism_integration_tests::{member, reviewer, TestEngine};
use prism_resolver::{resolve, resolve_audited};

#[tokio::test]
async fn test_unlock_appears_on_verification() {
    let engine = TestEngine::new();
    let entity = engine.register_org();
    let policy = engine.policies.current(entity.entity_type).unwrap();

    // Before verification a member sees only the placeholder.
    let before = resolve(&entity, &member("v-donor"), &policy).unwrap().view;
    assert!(before.value("registration_number").is_none());
    assert_eq!(
        before.placeholder("registration_number"),
        Some("available to verified-org viewers")
    );

    engine.verify_entity(&entity.id).await;
    let entity = engine.entities.get(&entity.id).unwrap();

    let after = resolve(&entity, &member("v-donor"), &policy).unwrap().view;
    assert_eq!(
        after.value("registration_number"),
        Some(&FieldValue::Text("NGO-2023-0042".into()))
    );
    assert_eq!(after.verification_status, VerificationStatus::Verified);
}

#[tokio::test]
async fn test_unlock_disappears_on_revocation() {
    let engine = TestEngine::new();
    let entity = engine.register_org();
    let verified = engine.verify_entity(&entity.id).await;

    engine
        .service
        .revoke(
            &verified.case.case_id,
            &reviewer(),
            "compliance/2026/0017",
            verified.version,
        )
        .await
        .unwrap();

    let entity = engine.entities.get(&entity.id).unwrap();
    assert_eq!(entity.verification_status, VerificationStatus::Revoked);

    // No resolver state to clean up: the next resolution simply no longer
    // satisfies the unlock condition.
    let policy = engine.policies.current(entity.entity_type).unwrap();
    let view = resolve(&entity, &member("v-donor"), &policy).unwrap().view;
    assert!(view.value("registration_number").is_none());
    assert_eq!(
        view.placeholder("registration_number"),
        Some("available to verified-org viewers")
    );
}

#[tokio::test]
async fn test_revocation_preserves_audit_history() {
    let engine = TestEngine::new();
    let entity = engine.register_org();
    let verified = engine.verify_entity(&entity.id).await;

    // A member reads the unlocked field while the entity is verified.
    let policy = engine.policies.current(entity.entity_type).unwrap();
    let snapshot = engine.entities.get(&entity.id).unwrap();
    resolve_audited(&snapshot, &member("v-donor"), &policy, engine.audit.as_ref()).unwrap();

    let disclosures_before = engine
        .audit
        .events_for(&entity.id)
        .iter()
        .filter(|e| e.detail.contains("registration_number"))
        .count();
    assert!(disclosures_before > 0);

    engine
        .service
        .revoke(
            &verified.case.case_id,
            &reviewer(),
            "compliance/2026/0017",
            verified.version,
        )
        .await
        .unwrap();

    // Past disclosure events survive; the revocation itself is recorded.
    let events = engine.audit.events_for(&entity.id);
    let disclosures_after = events
        .iter()
        .filter(|e| e.detail.contains("registration_number"))
        .count();
    assert_eq!(disclosures_before, disclosures_after);
    assert!(events
        .iter()
        .any(|e| e.detail.contains("compliance/2026/0017")));
}

#[tokio::test]
async fn test_revoked_case_is_terminal() {
    let engine = TestEngine::new();
    let entity = engine.register_org();
    let verified = engine.verify_entity(&entity.id).await;

    let revoked = engine
        .service
        .revoke(
            &verified.case.case_id,
            &reviewer(),
            "compliance/2026/0017",
            verified.version,
        )
        .await
        .unwrap();

    // A second revocation has no transition to take.
    let err = engine
        .service
        .revoke(
            &revoked.case.case_id,
            &reviewer(),
            "compliance/2026/0018",
            revoked.version,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidTransition(_)));
}

#[tokio::test]
async fn test_revocation_requires_government_tier() {
    let engine = TestEngine::new();
    let entity = engine.register_org();
    let verified = engine.verify_entity(&entity.id).await;

    let err = engine
        .service
        .revoke(
            &verified.case.case_id,
            &member("v-donor"),
            "compliance/2026/0017",
            verified.version,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::AccessDenied(_)));
}
