use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use prism_core::{AudienceTier, EntityId, ViewerContext, ViewerId};

/// The acting viewer, redacted to tier plus id. Audit events never carry
/// more of the viewer context than this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRef {
    pub viewer_id: Option<ViewerId>,
    pub tier: AudienceTier,
}

impl From<&ViewerContext> for ActorRef {
    fn from(ctx: &ViewerContext) -> Self {
        Self {
            viewer_id: ctx.viewer_id.clone(),
            tier: ctx.tier,
        }
    }
}

/// What kind of decision the event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A field value (or its degradation) was disclosed to a viewer.
    DiscloseField,
    /// A verification case moved between states.
    StateTransition,
    /// A verified entity was revoked.
    Revoke,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiscloseField => write!(f, "disclose_field"),
            Self::StateTransition => write!(f, "state_transition"),
            Self::Revoke => write!(f, "revoke"),
        }
    }
}

/// One immutable audit record. Append-only: the log exposes no update or
/// delete API, even internally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub entity_id: EntityId,
    pub actor: ActorRef,
    pub action: AuditAction,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    fn new(
        entity_id: EntityId,
        actor: ActorRef,
        action: AuditAction,
        detail: String,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::now_v7().to_string(),
            entity_id,
            actor,
            action,
            detail,
            timestamp: Utc::now(),
        }
    }

    /// A field disclosure to a specific viewer.
    pub fn disclosure(entity_id: EntityId, actor: &ViewerContext, detail: String) -> Self {
        Self::new(entity_id, actor.into(), AuditAction::DiscloseField, detail)
    }

    /// A case state transition.
    pub fn transition(entity_id: EntityId, actor: &ViewerContext, detail: String) -> Self {
        Self::new(entity_id, actor.into(), AuditAction::StateTransition, detail)
    }

    /// A revocation of a verified entity.
    pub fn revocation(entity_id: EntityId, actor: &ViewerContext, detail: String) -> Self {
        Self::new(entity_id, actor.into(), AuditAction::Revoke, detail)
    }
}
