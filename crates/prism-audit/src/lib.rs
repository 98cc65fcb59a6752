pub mod event;
pub mod log;

pub use event::{ActorRef, AuditAction, AuditEvent};
pub use log::{AuditLog, InMemoryAuditLog};
