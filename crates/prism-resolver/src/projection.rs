use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use prism_core::{EntityId, FieldValue, VerificationStatus};

/// A single field's resolved outcome for a specific viewer.
///
/// Omitted fields are not represented here at all — the key is dropped from
/// the projection so its presence cannot be inferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "disclosure", rename_all = "snake_case")]
pub enum Disclosure {
    /// The raw value, disclosed.
    Value { value: FieldValue },
    /// A redaction placeholder (mask or placeholder text).
    Redacted { placeholder: String },
}

impl Disclosure {
    pub fn is_disclosed(&self) -> bool {
        matches!(self, Self::Value { .. })
    }
}

/// The exact projection of an entity a viewer may see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedView {
    pub entity_id: EntityId,
    pub verification_status: VerificationStatus,
    /// Policy version the projection was computed under.
    pub policy_version: u32,
    pub fields: BTreeMap<String, Disclosure>,
}

impl ProjectedView {
    /// The disclosed raw value of a field, if visible to this viewer.
    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        match self.fields.get(field) {
            Some(Disclosure::Value { value }) => Some(value),
            _ => None,
        }
    }

    /// The redaction placeholder shown for a field, if redacted.
    pub fn placeholder(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(Disclosure::Redacted { placeholder }) => Some(placeholder),
            _ => None,
        }
    }

    /// Whether the field appears in the projection at all.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}
