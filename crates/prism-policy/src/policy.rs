use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use prism_core::{AudienceTier, EntityType};

/// Policy-defined behavior when a viewer lacks sufficient tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "text", rename_all = "snake_case")]
pub enum RedactionStrategy {
    /// Remove the key from the projection entirely so its presence cannot
    /// be inferred.
    Omit,
    /// Preserve partial structure, e.g. "••••@••••.org".
    Mask,
    /// Substitute fixed placeholder text.
    Placeholder(String),
}

/// Visibility rule for one `(entity_type, field_name)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPolicy {
    /// Field name this policy governs.
    pub field: String,
    /// Minimum audience tier required to see the raw value.
    pub minimum_tier: AudienceTier,
    /// What an under-tier viewer receives instead of the value.
    pub redaction: RedactionStrategy,
    /// When true and the entity is verified, the field's bar drops to
    /// `Member` regardless of `minimum_tier`.
    pub unlocks_on_verified: bool,
}

impl FieldPolicy {
    pub fn new(
        field: impl Into<String>,
        minimum_tier: AudienceTier,
        redaction: RedactionStrategy,
    ) -> Self {
        Self {
            field: field.into(),
            minimum_tier,
            redaction,
            unlocks_on_verified: false,
        }
    }

    /// Mark the field as unlocking for members once the entity is verified.
    pub fn unlocks_on_verified(mut self) -> Self {
        self.unlocks_on_verified = true;
        self
    }
}

/// The complete, versioned visibility policy for one entity type.
///
/// Immutable once published to the [`crate::PolicyStore`] — updating a policy
/// publishes a new version and never retroactively changes what was already
/// disclosed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySet {
    pub entity_type: EntityType,
    /// Assigned by the policy store at publish time.
    pub version: u32,
    pub fields: BTreeMap<String, FieldPolicy>,
}

impl PolicySet {
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            version: 0,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, policy: FieldPolicy) -> Self {
        self.fields.insert(policy.field.clone(), policy);
        self
    }

    /// Look up the policy governing a field, if one is defined.
    pub fn policy_for(&self, field: &str) -> Option<&FieldPolicy> {
        self.fields.get(field)
    }

    /// Whether the set defines a policy for the field. Fields without a
    /// policy are rejected at write time (fail closed).
    pub fn defines(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}
