use std::fmt;

use crate::error::CoreError;

/// The states of a verification case lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseState {
    /// Registrant is assembling documents and profile patches.
    Draft,
    /// Declaration accepted and all required documents present; waiting for
    /// a reviewer.
    Submitted,
    /// A reviewer has claimed the case.
    UnderReview,
    /// Positive terminal decision. Only a revocation can follow.
    Verified,
    /// Negative terminal decision. A fresh case may be opened.
    Rejected,
    /// Reviewer sent the case back naming defective documents.
    ResubmissionRequested,
    /// Previously verified, downgraded by an external compliance event.
    /// Final state.
    Revoked,
}

impl CaseState {
    /// Whether this is a final (terminal) state. `Verified` is not terminal
    /// because a revocation can still follow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Revoked)
    }

    /// Whether a reviewer decision has been recorded.
    pub fn is_decided(&self) -> bool {
        matches!(self, Self::Verified | Self::Rejected | Self::Revoked)
    }

    /// Whether the registrant may still mutate the case (documents,
    /// declaration, patches).
    pub fn registrant_mutable(&self) -> bool {
        matches!(self, Self::Draft | Self::ResubmissionRequested)
    }
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Submitted => write!(f, "submitted"),
            Self::UnderReview => write!(f, "under_review"),
            Self::Verified => write!(f, "verified"),
            Self::Rejected => write!(f, "rejected"),
            Self::ResubmissionRequested => write!(f, "resubmission_requested"),
            Self::Revoked => write!(f, "revoked"),
        }
    }
}

/// Events that trigger case state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseEvent {
    /// Registrant submits (or resubmits) the case for review.
    Submit,
    /// A reviewer claims the case.
    ClaimReview,
    /// Reviewer approves — entity becomes verified.
    Approve,
    /// Reviewer rejects with an explanation.
    Reject,
    /// Reviewer sends the case back for document fixes.
    RequestResubmission,
    /// External compliance event revokes a verified case.
    Revoke,
}

/// Manages verification case transitions.
///
/// Valid transitions:
/// - Draft → Submitted (Submit)
/// - Submitted → UnderReview (ClaimReview)
/// - UnderReview → Verified (Approve)
/// - UnderReview → Rejected (Reject)
/// - UnderReview → ResubmissionRequested (RequestResubmission)
/// - ResubmissionRequested → Submitted (Submit)
/// - Verified → Revoked (Revoke)
///
/// This table only encodes the shape of the graph. Guard preconditions
/// (required documents, declaration, reviewer notes, actor roles) are
/// enforced by the case service before the transition is applied.
pub struct CaseStateMachine;

impl CaseStateMachine {
    /// Attempt a state transition based on an event.
    /// Returns the new state on success, or an error for invalid transitions.
    pub fn transition(current: CaseState, event: CaseEvent) -> Result<CaseState, CoreError> {
        let new_state = match (current, event) {
            (CaseState::Draft, CaseEvent::Submit) => CaseState::Submitted,
            (CaseState::Submitted, CaseEvent::ClaimReview) => CaseState::UnderReview,
            (CaseState::UnderReview, CaseEvent::Approve) => CaseState::Verified,
            (CaseState::UnderReview, CaseEvent::Reject) => CaseState::Rejected,
            (CaseState::UnderReview, CaseEvent::RequestResubmission) => {
                CaseState::ResubmissionRequested
            }
            (CaseState::ResubmissionRequested, CaseEvent::Submit) => CaseState::Submitted,
            (CaseState::Verified, CaseEvent::Revoke) => CaseState::Revoked,

            // All other transitions are invalid
            _ => {
                return Err(CoreError::InvalidTransition(format!(
                    "no transition from {} on {:?}",
                    current, event
                )));
            }
        };

        tracing::debug!(
            from = %current,
            to = %new_state,
            event = ?event,
            "case state transition"
        );

        Ok(new_state)
    }

    /// Check if a transition is valid without performing it.
    pub fn can_transition(current: CaseState, event: CaseEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}
