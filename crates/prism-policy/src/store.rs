use dashmap::DashMap;
use std::sync::Arc;

use prism_core::{CoreError, EntityType};

use crate::policy::PolicySet;

/// Read-mostly store of versioned visibility policies.
///
/// Publishing assigns the next version for the entity type and flips the
/// current pointer. Published sets are never mutated, so a resolution that
/// recorded its policy version stays explainable under audit after later
/// policy updates.
pub struct PolicyStore {
    versions: DashMap<(EntityType, u32), Arc<PolicySet>>,
    current: DashMap<EntityType, u32>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self {
            versions: DashMap::new(),
            current: DashMap::new(),
        }
    }

    /// Publish a policy set, assigning it the next version number.
    /// Returns the assigned version.
    pub fn publish(&self, mut set: PolicySet) -> u32 {
        let mut entry = self.current.entry(set.entity_type).or_insert(0);
        let version = *entry + 1;
        set.version = version;
        let entity_type = set.entity_type;
        self.versions
            .insert((entity_type, version), Arc::new(set));
        *entry = version;

        tracing::info!(
            entity_type = %entity_type,
            version,
            "policy set published"
        );
        version
    }

    /// The policy set governing future resolutions for the entity type.
    pub fn current(&self, entity_type: EntityType) -> Result<Arc<PolicySet>, CoreError> {
        let version = *self
            .current
            .get(&entity_type)
            .ok_or(CoreError::MissingPolicySet(entity_type))?;
        self.at_version(entity_type, version)
    }

    /// A historical policy set, used to explain past disclosures.
    pub fn at_version(
        &self,
        entity_type: EntityType,
        version: u32,
    ) -> Result<Arc<PolicySet>, CoreError> {
        self.versions
            .get(&(entity_type, version))
            .map(|set| Arc::clone(&set))
            .ok_or(CoreError::MissingPolicySet(entity_type))
    }

    /// Latest published version for the entity type, if any.
    pub fn current_version(&self, entity_type: EntityType) -> Option<u32> {
        self.current.get(&entity_type).map(|v| *v)
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new()
    }
}
