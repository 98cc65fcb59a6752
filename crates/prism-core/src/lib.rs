pub mod case_state;
pub mod error;
pub mod types;

pub use case_state::{CaseEvent, CaseState, CaseStateMachine};
pub use error::CoreError;
pub use types::{
    AudienceTier, CaseId, DocumentId, DocumentRef, DocumentType, Entity, EntityId, EntityType,
    FieldValue, VerificationStatus, ViewerContext, ViewerId,
};
