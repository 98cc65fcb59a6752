pub mod case;
pub mod events;
pub mod repository;
pub mod service;

pub use case::{FieldPatch, ReviewNote, VerificationCase};
pub use events::{DomainEvent, EventBus};
pub use repository::{CaseRecord, CaseRepository, InMemoryCaseRepository};
pub use service::{CaseService, ReviewDecision};
