//! Integration test: tiered visibility resolution end to end.
//!
//! Exercises the resolver against a realistically configured policy store
//! and entity store: tier gating, the owner bypass, masking, omission, and
//! the audit trail of disclosures.

use prism_audit::log::AuditLog;
use prism_core::{AudienceTier, FieldValue, ViewerContext};
use prism_integration_tests::{member, owner, reviewer, TestEngine};
use prism_resolver::{resolve, resolve_audited};

#[test]
fn test_public_viewer_sees_only_public_fields() {
    let engine = TestEngine::new();
    let entity = engine.register_org();
    let policy = engine.policies.current(entity.entity_type).unwrap();

    let resolution = resolve(&entity, &ViewerContext::anonymous(), &policy).unwrap();
    let view = resolution.view;

    assert_eq!(
        view.value("name"),
        Some(&FieldValue::Text("Hopeful Futures".into()))
    );
    // Member-gated email is masked with structure preserved.
    assert_eq!(view.placeholder("contact_email"), Some("••••@••••.org"));
    // Government-gated registry id shows its placeholder.
    assert_eq!(
        view.placeholder("registration_number"),
        Some("available to verified-org viewers")
    );
    // Owner-only banking detail is omitted outright.
    assert!(!view.contains("bank_account"));
}

#[test]
fn test_member_viewer_sees_member_fields() {
    let engine = TestEngine::new();
    let entity = engine.register_org();
    let policy = engine.policies.current(entity.entity_type).unwrap();

    let view = resolve(&entity, &member("v-donor"), &policy).unwrap().view;
    assert_eq!(
        view.value("contact_email"),
        Some(&FieldValue::Text("team@hopeful-futures.org".into()))
    );
    assert!(view.value("registration_number").is_none());
    assert!(!view.contains("bank_account"));
}

#[test]
fn test_government_viewer_sees_government_fields() {
    let engine = TestEngine::new();
    let entity = engine.register_org();
    let policy = engine.policies.current(entity.entity_type).unwrap();

    let view = resolve(&entity, &reviewer(), &policy).unwrap().view;
    assert_eq!(
        view.value("registration_number"),
        Some(&FieldValue::Text("NGO-2023-0042".into()))
    );
    // Government tier still does not reach owner-only fields.
    assert!(!view.contains("bank_account"));
}

#[test]
fn test_owner_sees_everything_despite_member_tier() {
    let engine = TestEngine::new();
    let entity = engine.register_org();
    let policy = engine.policies.current(entity.entity_type).unwrap();

    // The owner's session tier is only Member.
    assert_eq!(owner().tier, AudienceTier::Member);
    let view = resolve(&entity, &owner(), &policy).unwrap().view;

    assert!(view.value("name").is_some());
    assert!(view.value("contact_email").is_some());
    assert!(view.value("registration_number").is_some());
    assert_eq!(
        view.value("bank_account"),
        Some(&FieldValue::Text("0042-7".into()))
    );
}

#[test]
fn test_resolution_is_deterministic() {
    let engine = TestEngine::new();
    let entity = engine.register_org();
    let policy = engine.policies.current(entity.entity_type).unwrap();

    let first = resolve(&entity, &member("v-donor"), &policy).unwrap().view;
    let second = resolve(&entity, &member("v-donor"), &policy).unwrap().view;
    assert_eq!(first, second);
}

#[test]
fn test_no_viewer_sees_more_than_owner() {
    let engine = TestEngine::new();
    let entity = engine.register_org();
    let policy = engine.policies.current(entity.entity_type).unwrap();

    let owner_view = resolve(&entity, &owner(), &policy).unwrap().view;
    for viewer in [
        ViewerContext::anonymous(),
        member("v-donor"),
        reviewer(),
    ] {
        let view = resolve(&entity, &viewer, &policy).unwrap().view;
        for (field, disclosure) in &view.fields {
            if disclosure.is_disclosed() {
                assert_eq!(
                    view.value(field),
                    owner_view.value(field),
                    "viewer saw a value the owner does not see for '{}'",
                    field
                );
            }
        }
    }
}

#[test]
fn test_member_disclosures_are_audited_public_are_not() {
    let engine = TestEngine::new();
    let entity = engine.register_org();
    let policy = engine.policies.current(entity.entity_type).unwrap();

    resolve_audited(
        &entity,
        &ViewerContext::anonymous(),
        &policy,
        engine.audit.as_ref(),
    )
    .unwrap();
    assert!(
        engine.audit.events_for(&entity.id).is_empty(),
        "anonymous public traffic must not be audited"
    );

    resolve_audited(&entity, &member("v-donor"), &policy, engine.audit.as_ref()).unwrap();
    let events = engine.audit.events_for(&entity.id);
    assert!(!events.is_empty());
    assert!(events
        .iter()
        .any(|e| e.detail.contains("contact_email")));
}

#[test]
fn test_unknown_field_rejected_at_write_time() {
    let engine = TestEngine::new();
    let entity = engine.register_org();

    let result = engine.entities.update_fields(
        &entity.id,
        &owner(),
        &[(
            "swift_code".into(),
            FieldValue::Text("HOPEBR00".into()),
        )],
    );
    assert!(matches!(
        result,
        Err(prism_core::CoreError::UnknownField(f)) if f == "swift_code"
    ));
}

#[test]
fn test_policy_update_changes_future_resolutions() {
    let engine = TestEngine::new();
    let entity = engine.register_org();

    // v2 drops contact_email to public visibility.
    let mut v2 = prism_integration_tests::organization_policies();
    v2 = v2.with_field(prism_policy::FieldPolicy::new(
        "contact_email",
        AudienceTier::Public,
        prism_policy::RedactionStrategy::Omit,
    ));
    let version = engine.policies.publish(v2);
    assert_eq!(version, 2);

    let policy = engine.policies.current(entity.entity_type).unwrap();
    let view = resolve(&entity, &ViewerContext::anonymous(), &policy)
        .unwrap()
        .view;
    assert!(view.value("contact_email").is_some());
    assert_eq!(view.policy_version, 2);

    // The original version stays resolvable for explainability.
    let v1 = engine
        .policies
        .at_version(entity.entity_type, 1)
        .unwrap();
    let old_view = resolve(&entity, &ViewerContext::anonymous(), &v1)
        .unwrap()
        .view;
    assert!(old_view.value("contact_email").is_none());
}
