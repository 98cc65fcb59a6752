use std::sync::RwLock;

use prism_core::{CoreError, EntityId};

use crate::event::AuditEvent;

/// Append-only sink for audit events.
///
/// Implementations must be write-once: there is deliberately no update or
/// delete method on this trait. Readers never block writers beyond the
/// single-insert critical section.
pub trait AuditLog: Send + Sync {
    /// Append one event. Failures surface as
    /// [`CoreError::DependencyUnavailable`] — never silently swallowed.
    fn append(&self, event: AuditEvent) -> Result<(), CoreError>;

    /// All events recorded for an entity, in append order.
    fn events_for(&self, entity_id: &EntityId) -> Vec<AuditEvent>;

    /// Total number of events in the log.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory append-only log used by the node and tests.
pub struct InMemoryAuditLog {
    events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLog for InMemoryAuditLog {
    fn append(&self, event: AuditEvent) -> Result<(), CoreError> {
        tracing::debug!(
            entity_id = %event.entity_id,
            action = %event.action,
            detail = %event.detail,
            "audit event appended"
        );
        let mut events = self
            .events
            .write()
            .map_err(|_| CoreError::DependencyUnavailable("audit log poisoned".into()))?;
        events.push(event);
        Ok(())
    }

    fn events_for(&self, entity_id: &EntityId) -> Vec<AuditEvent> {
        self.events
            .read()
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.entity_id == *entity_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.events.read().map(|e| e.len()).unwrap_or(0)
    }
}
