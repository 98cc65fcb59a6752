pub mod entities;
pub mod policy;
pub mod redaction;
pub mod store;

pub use entities::EntityStore;
pub use policy::{FieldPolicy, PolicySet, RedactionStrategy};
pub use redaction::redact;
pub use store::PolicyStore;
