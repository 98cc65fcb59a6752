use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::CoreError;

macro_rules! id_type {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a fresh time-ordered id.
            pub fn generate() -> Self {
                Self(uuid::Uuid::now_v7().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

id_type!(EntityId, "Identifier of a profiled entity (NGO, donor, individual).");
id_type!(CaseId, "Identifier of a verification case.");
id_type!(ViewerId, "Identifier of an authenticated viewer.");
id_type!(DocumentId, "Identifier of a document tracked by the vault.");

/// Kind of entity being profiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Organization,
    Individual,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Organization => write!(f, "organization"),
            Self::Individual => write!(f, "individual"),
        }
    }
}

/// Ordered trust level of a viewer, used to gate field visibility.
///
/// The total order is `Public < Member < Government < OwnerOnly`; the derived
/// `Ord` follows declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AudienceTier {
    Public,
    Member,
    Government,
    OwnerOnly,
}

impl AudienceTier {
    /// Whether this tier satisfies the given minimum requirement.
    pub fn satisfies(&self, required: AudienceTier) -> bool {
        *self >= required
    }
}

impl fmt::Display for AudienceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Member => write!(f, "member"),
            Self::Government => write!(f, "government"),
            Self::OwnerOnly => write!(f, "owner_only"),
        }
    }
}

/// Denormalized cache of the entity's current verification case outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    Pending,
    Verified,
    Revoked,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unverified => write!(f, "unverified"),
            Self::Pending => write!(f, "pending"),
            Self::Verified => write!(f, "verified"),
            Self::Revoked => write!(f, "revoked"),
        }
    }
}

/// Opaque stored value of a profile field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Free text (name, mission statement, email, ...).
    Text(String),
    /// One value out of a closed set (sector, jurisdiction, ...).
    Choice(String),
    /// Reference to a vault document. Only existence and type are ever
    /// exposed, never the storage handle.
    Document(DocumentId),
}

/// Document kinds required by the verification pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    RegistrationCertificate,
    TrustDeed,
    PanCard,
    GovernmentId,
    AddressProof,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegistrationCertificate => "registration_certificate",
            Self::TrustDeed => "trust_deed",
            Self::PanCard => "pan_card",
            Self::GovernmentId => "government_id",
            Self::AddressProof => "address_proof",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "registration_certificate" => Ok(Self::RegistrationCertificate),
            "trust_deed" => Ok(Self::TrustDeed),
            "pan_card" => Ok(Self::PanCard),
            "government_id" => Ok(Self::GovernmentId),
            "address_proof" => Ok(Self::AddressProof),
            other => Err(CoreError::ValidationError(format!(
                "unknown document type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata for a document held by the vault. The engine never inspects
/// document contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub document_id: DocumentId,
    pub document_type: DocumentType,
    /// Hex-encoded blake3 checksum of the stored bytes.
    pub checksum: String,
    /// Opaque pointer into the vault. Never exposed to viewers.
    #[serde(skip_serializing)]
    #[serde(default)]
    pub storage_handle: String,
    pub uploaded_at: DateTime<Utc>,
}

/// The subject being profiled.
///
/// Owned exclusively by its registrant; mutated only through the entity
/// store's validated update path; never deleted, only marked withdrawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub entity_type: EntityType,
    /// Viewer id of the registrant — the only principal that owns this record.
    pub registrant: ViewerId,
    pub fields: BTreeMap<String, FieldValue>,
    pub verification_status: VerificationStatus,
    /// Policy version active at the entity's last write, kept so historical
    /// disclosures remain explainable after policy updates.
    pub policy_version: u32,
    /// Soft-delete marker; audit continuity requires the record to survive.
    pub withdrawn: bool,
    pub created_at: DateTime<Utc>,
}

impl Entity {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn is_verified(&self) -> bool {
        self.verification_status == VerificationStatus::Verified
    }
}

/// Who is looking. Constructed per request from the authentication
/// collaborator; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerContext {
    /// None for anonymous public traffic.
    pub viewer_id: Option<ViewerId>,
    pub tier: AudienceTier,
}

impl ViewerContext {
    pub fn new(viewer_id: Option<ViewerId>, tier: AudienceTier) -> Self {
        Self { viewer_id, tier }
    }

    /// Anonymous visitor at the public tier.
    pub fn anonymous() -> Self {
        Self {
            viewer_id: None,
            tier: AudienceTier::Public,
        }
    }

    pub fn authenticated(viewer_id: ViewerId, tier: AudienceTier) -> Self {
        Self {
            viewer_id: Some(viewer_id),
            tier,
        }
    }

    /// Owners always satisfy their own entity regardless of tier.
    pub fn is_owner_of(&self, entity: &Entity) -> bool {
        self.viewer_id.as_ref() == Some(&entity.registrant)
    }
}
