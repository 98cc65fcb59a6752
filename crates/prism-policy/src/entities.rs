use chrono::Utc;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

use prism_core::{
    CoreError, Entity, EntityId, EntityType, FieldValue, VerificationStatus, ViewerContext,
    ViewerId,
};

use crate::store::PolicyStore;

/// Write-validated registry of entities plus their consent preferences.
///
/// Every write is checked against the current policy set: a field without a
/// policy is rejected with [`CoreError::UnknownField`] rather than silently
/// dropped at read time. Entities are never deleted — `withdraw` is a soft
/// delete that preserves audit continuity.
pub struct EntityStore {
    entities: DashMap<EntityId, Entity>,
    /// Generic consent rows keyed by (entity, preference key).
    consents: DashMap<(EntityId, String), bool>,
    policies: Arc<PolicyStore>,
}

impl EntityStore {
    pub fn new(policies: Arc<PolicyStore>) -> Self {
        Self {
            entities: DashMap::new(),
            consents: DashMap::new(),
            policies,
        }
    }

    /// Register a new entity owned by `registrant`.
    pub fn register(
        &self,
        entity_type: EntityType,
        registrant: ViewerId,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<Entity, CoreError> {
        let policy = self.policies.current(entity_type)?;
        for field in fields.keys() {
            if !policy.defines(field) {
                return Err(CoreError::UnknownField(field.clone()));
            }
        }

        let entity = Entity {
            id: EntityId::generate(),
            entity_type,
            registrant,
            fields,
            verification_status: VerificationStatus::Unverified,
            policy_version: policy.version,
            withdrawn: false,
            created_at: Utc::now(),
        };

        tracing::info!(
            entity_id = %entity.id,
            entity_type = %entity_type,
            policy_version = policy.version,
            "entity registered"
        );

        self.entities.insert(entity.id.clone(), entity.clone());
        Ok(entity)
    }

    pub fn get(&self, id: &EntityId) -> Result<Entity, CoreError> {
        self.entities
            .get(id)
            .map(|e| e.clone())
            .ok_or_else(|| CoreError::NotFound(format!("entity {}", id)))
    }

    /// Update fields on behalf of the owner. All patches are validated
    /// before any is applied — an invalid patch leaves the entity untouched.
    pub fn update_fields(
        &self,
        id: &EntityId,
        actor: &ViewerContext,
        patches: &[(String, FieldValue)],
    ) -> Result<Entity, CoreError> {
        let entity = self.get(id)?;
        if !actor.is_owner_of(&entity) {
            return Err(CoreError::AccessDenied(
                "only the registrant may update an entity".into(),
            ));
        }
        self.apply_patches(id, patches)
    }

    /// Apply pre-authorized patches atomically (the case service calls this
    /// at submit time after its own registrant check).
    pub fn apply_patches(
        &self,
        id: &EntityId,
        patches: &[(String, FieldValue)],
    ) -> Result<Entity, CoreError> {
        let mut entry = self
            .entities
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(format!("entity {}", id)))?;
        if entry.withdrawn {
            return Err(CoreError::ValidationError(
                "entity is withdrawn and read-only".into(),
            ));
        }

        let policy = self.policies.current(entry.entity_type)?;
        for (field, _) in patches {
            if !policy.defines(field) {
                return Err(CoreError::UnknownField(field.clone()));
            }
        }

        for (field, value) in patches {
            entry.fields.insert(field.clone(), value.clone());
        }
        entry.policy_version = policy.version;

        tracing::debug!(
            entity_id = %id,
            patches = patches.len(),
            policy_version = policy.version,
            "entity fields updated"
        );
        Ok(entry.clone())
    }

    /// Update the denormalized verification status cache. Reserved for the
    /// case service.
    pub fn set_status(&self, id: &EntityId, status: VerificationStatus) -> Result<(), CoreError> {
        let mut entry = self
            .entities
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(format!("entity {}", id)))?;
        let previous = entry.verification_status;
        entry.verification_status = status;
        tracing::info!(
            entity_id = %id,
            from = %previous,
            to = %status,
            "verification status updated"
        );
        Ok(())
    }

    /// Soft-delete. The record survives for audit continuity.
    pub fn withdraw(&self, id: &EntityId, actor: &ViewerContext) -> Result<(), CoreError> {
        let entity = self.get(id)?;
        if !actor.is_owner_of(&entity) {
            return Err(CoreError::AccessDenied(
                "only the registrant may withdraw an entity".into(),
            ));
        }
        let mut entry = self
            .entities
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(format!("entity {}", id)))?;
        entry.withdrawn = true;
        tracing::info!(entity_id = %id, "entity withdrawn");
        Ok(())
    }

    /// Set a consent preference row for the entity. Owner only.
    pub fn set_consent(
        &self,
        id: &EntityId,
        actor: &ViewerContext,
        key: impl Into<String>,
        enabled: bool,
    ) -> Result<(), CoreError> {
        let entity = self.get(id)?;
        if !actor.is_owner_of(&entity) {
            return Err(CoreError::AccessDenied(
                "only the registrant may change consent preferences".into(),
            ));
        }
        self.consents.insert((id.clone(), key.into()), enabled);
        Ok(())
    }

    /// A single consent preference, if ever set.
    pub fn consent(&self, id: &EntityId, key: &str) -> Option<bool> {
        self.consents
            .get(&(id.clone(), key.to_string()))
            .map(|v| *v)
    }

    /// All consent preferences recorded for the entity.
    pub fn consents_for(&self, id: &EntityId) -> BTreeMap<String, bool> {
        self.consents
            .iter()
            .filter(|row| row.key().0 == *id)
            .map(|row| (row.key().1.clone(), *row.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
