//! The visibility resolver.
//!
//! Pure and deterministic: (entity snapshot, viewer context, policy set) →
//! projected view. Denial is represented as data, never as an error; errors
//! are reserved for configuration gaps.

use std::cmp;
use std::collections::BTreeMap;

use prism_audit::{AuditEvent, AuditLog};
use prism_core::{AudienceTier, CoreError, Entity, ViewerContext};
use prism_policy::{redact, PolicySet, RedactionStrategy};

use crate::projection::{Disclosure, ProjectedView};

/// Outcome of a resolution: the viewer-facing projection plus the
/// bookkeeping the audit wrapper needs.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub view: ProjectedView,
    /// Fields whose raw value was disclosed.
    pub disclosed: Vec<String>,
    /// Fields degraded to absent because their redaction strategy could not
    /// apply, with the reason. The rest of the view still renders.
    pub degraded: Vec<(String, String)>,
}

/// Resolve the projection of `entity` visible to `viewer` under `policies`.
///
/// Every stored field must have a policy; a gap is a fatal configuration
/// error ([`CoreError::PolicyGap`]), never a silent default to visible.
pub fn resolve(
    entity: &Entity,
    viewer: &ViewerContext,
    policies: &PolicySet,
) -> Result<Resolution, CoreError> {
    if policies.entity_type != entity.entity_type {
        return Err(CoreError::ValidationError(format!(
            "policy set for '{}' cannot resolve a '{}' entity",
            policies.entity_type, entity.entity_type
        )));
    }

    let is_owner = viewer.is_owner_of(entity);
    let mut fields = BTreeMap::new();
    let mut disclosed = Vec::new();
    let mut degraded = Vec::new();

    for (name, value) in &entity.fields {
        let policy = policies
            .policy_for(name)
            .ok_or_else(|| CoreError::PolicyGap {
                entity_type: entity.entity_type,
                field: name.clone(),
            })?;

        // A verified entity lowers an unlocks_on_verified field's bar to
        // Member. Revocation reverses this lazily on the next resolution.
        let required = if policy.unlocks_on_verified && entity.is_verified() {
            cmp::min(policy.minimum_tier, AudienceTier::Member)
        } else {
            policy.minimum_tier
        };

        if is_owner || viewer.tier.satisfies(required) {
            fields.insert(
                name.clone(),
                Disclosure::Value {
                    value: value.clone(),
                },
            );
            disclosed.push(name.clone());
            continue;
        }

        match redact(value, &policy.redaction) {
            Ok(Some(placeholder)) => {
                fields.insert(name.clone(), Disclosure::Redacted { placeholder });
            }
            // Omit: drop the key entirely.
            Ok(None) => {}
            // Partial-failure isolation: the field disappears, the view
            // still renders.
            Err(e) => degraded.push((name.clone(), e.to_string())),
        }
    }

    Ok(Resolution {
        view: ProjectedView {
            entity_id: entity.id.clone(),
            verification_status: entity.verification_status,
            policy_version: policies.version,
            fields,
        },
        disclosed,
        degraded,
    })
}

/// Resolve and record the disclosure decision in the audit log.
///
/// One event is appended per field disclosed to a member-tier-or-above
/// viewer (owners included). Public-tier anonymous traffic is not
/// individually audited — a deliberate tradeoff to keep audit growth
/// bounded.
pub fn resolve_audited(
    entity: &Entity,
    viewer: &ViewerContext,
    policies: &PolicySet,
    audit: &dyn AuditLog,
) -> Result<ProjectedView, CoreError> {
    let resolution = resolve(entity, viewer, policies)?;

    let auditable =
        viewer.tier.satisfies(AudienceTier::Member) || viewer.is_owner_of(entity);
    if auditable {
        for field in &resolution.disclosed {
            audit.append(AuditEvent::disclosure(
                entity.id.clone(),
                viewer,
                format!("field '{}' disclosed (policy v{})", field, policies.version),
            ))?;
        }
        for (field, reason) in &resolution.degraded {
            audit.append(AuditEvent::disclosure(
                entity.id.clone(),
                viewer,
                format!("field '{}' degraded to absent: {}", field, reason),
            ))?;
        }
    }

    Ok(resolution.view)
}
