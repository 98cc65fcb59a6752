//! Integration test: the document-gated verification lifecycle.
//!
//! Drives real cases through the state machine with the vault, entity
//! store, and audit log wired together the way the node wires them.

use bytes::Bytes;
use prism_audit::log::AuditLog;
use prism_cases::ReviewDecision;
use prism_core::{
    CaseState, CoreError, DocumentType, VerificationStatus, ViewerContext, ViewerId,
};
use prism_integration_tests::{owner, reviewer, TestEngine};

#[tokio::test]
async fn test_full_lifecycle_to_verified() {
    let engine = TestEngine::new();
    let entity = engine.register_org();

    let record = engine.verify_entity(&entity.id).await;
    assert_eq!(record.case.state, CaseState::Verified);
    assert!(record.case.decided_at.is_some());
    assert_eq!(
        engine.entities.get(&entity.id).unwrap().verification_status,
        VerificationStatus::Verified
    );

    // Every hop left an audit event: open, submit, claim, approve.
    let events = engine.audit.events_for(&entity.id);
    assert_eq!(events.len(), 4);
}

#[tokio::test]
async fn test_submit_without_pan_card_names_the_document() {
    let engine = TestEngine::new();
    let entity = engine.register_org();

    let record = engine.service.open_case(&entity.id, &owner()).await.unwrap();
    let id = record.case.case_id.clone();
    let mut version = record.version;

    for dt in [DocumentType::RegistrationCertificate, DocumentType::TrustDeed] {
        version = engine
            .service
            .attach_document(&id, &owner(), dt, Bytes::from_static(b"scan"), version)
            .await
            .unwrap()
            .version;
    }
    version = engine
        .service
        .accept_declaration(&id, &owner(), version)
        .await
        .unwrap()
        .version;

    let err = engine.service.submit(&id, &owner(), version).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid transition: missing document: pan_card"
    );

    // The failed guard left no trace on the entity.
    assert_eq!(
        engine.entities.get(&entity.id).unwrap().verification_status,
        VerificationStatus::Unverified
    );
}

#[tokio::test]
async fn test_claimed_reviewer_can_fetch_documents() {
    let engine = TestEngine::new();
    let entity = engine.register_org();
    let record = engine.submit_case(&entity.id).await;

    let claimed = engine
        .service
        .claim_review(&record.case.case_id, &reviewer(), record.version)
        .await
        .unwrap();
    assert_eq!(claimed.case.state, CaseState::UnderReview);
    assert_eq!(claimed.case.reviewer_id, Some(ViewerId::from("v-reviewer")));
    assert_eq!(claimed.case.submitted_documents.len(), 3);
}

#[tokio::test]
async fn test_resubmission_loop() {
    let engine = TestEngine::new();
    let entity = engine.register_org();
    let record = engine.submit_case(&entity.id).await;

    let claimed = engine
        .service
        .claim_review(&record.case.case_id, &reviewer(), record.version)
        .await
        .unwrap();
    let sent_back = engine
        .service
        .decide(
            &claimed.case.case_id,
            &reviewer(),
            ReviewDecision::RequestResubmission {
                notes: "pan card scan is cropped".into(),
                defective_document: DocumentType::PanCard,
            },
            claimed.version,
        )
        .await
        .unwrap();
    assert_eq!(sent_back.case.state, CaseState::ResubmissionRequested);
    assert_eq!(
        sent_back.case.reviewer_notes[0].defective_document,
        Some(DocumentType::PanCard)
    );

    // The registrant replaces the document and resubmits without a fresh
    // declaration: the earlier acceptance still stands on this case.
    let id = sent_back.case.case_id.clone();
    let updated = engine
        .service
        .attach_document(
            &id,
            &owner(),
            DocumentType::PanCard,
            Bytes::from_static(b"full scan"),
            sent_back.version,
        )
        .await
        .unwrap();
    let resubmitted = engine
        .service
        .submit(&id, &owner(), updated.version)
        .await
        .unwrap();
    assert_eq!(resubmitted.case.state, CaseState::Submitted);
}

#[tokio::test]
async fn test_rejection_is_terminal_for_the_case_not_the_entity() {
    let engine = TestEngine::new();
    let entity = engine.register_org();
    let record = engine.submit_case(&entity.id).await;

    let claimed = engine
        .service
        .claim_review(&record.case.case_id, &reviewer(), record.version)
        .await
        .unwrap();
    let rejected = engine
        .service
        .decide(
            &claimed.case.case_id,
            &reviewer(),
            ReviewDecision::Reject {
                notes: "registration number does not exist in the registry".into(),
            },
            claimed.version,
        )
        .await
        .unwrap();
    assert_eq!(rejected.case.state, CaseState::Rejected);
    assert_eq!(
        engine.entities.get(&entity.id).unwrap().verification_status,
        VerificationStatus::Unverified
    );

    // No further transitions out of a rejected case.
    let err = engine
        .service
        .submit(&rejected.case.case_id, &owner(), rejected.version)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidTransition(_)));

    // But the entity may start over with a fresh case.
    let fresh = engine.service.open_case(&entity.id, &owner()).await.unwrap();
    assert_eq!(fresh.case.state, CaseState::Draft);
}

#[tokio::test]
async fn test_non_registrant_cannot_drive_the_case() {
    let engine = TestEngine::new();
    let entity = engine.register_org();
    let record = engine.service.open_case(&entity.id, &owner()).await.unwrap();

    let intruder = ViewerContext::authenticated(
        ViewerId::from("v-intruder"),
        prism_core::AudienceTier::Member,
    );
    let err = engine
        .service
        .attach_document(
            &record.case.case_id,
            &intruder,
            DocumentType::PanCard,
            Bytes::from_static(b"scan"),
            record.version,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::AccessDenied(_)));
}

#[tokio::test]
async fn test_concurrent_decisions_conflict() {
    let engine = TestEngine::new();
    let entity = engine.register_org();
    let record = engine.submit_case(&entity.id).await;
    let claimed = engine
        .service
        .claim_review(&record.case.case_id, &reviewer(), record.version)
        .await
        .unwrap();

    // Two decisions race at the same expected version.
    let approver = reviewer();
    let rejecter = reviewer();
    let approve = engine.service.decide(
        &claimed.case.case_id,
        &approver,
        ReviewDecision::Approve,
        claimed.version,
    );
    let reject = engine.service.decide(
        &claimed.case.case_id,
        &rejecter,
        ReviewDecision::Reject {
            notes: "duplicate filing".into(),
        },
        claimed.version,
    );
    let (a, b) = tokio::join!(approve, reject);

    assert_eq!(
        [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(),
        1,
        "exactly one concurrent decision must win"
    );
    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(matches!(loser, CoreError::ConcurrentModification { .. }));
    assert!(loser.is_retryable());
}
