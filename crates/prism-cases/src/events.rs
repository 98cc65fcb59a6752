use tokio::sync::broadcast;

use prism_core::{AudienceTier, CaseId, CaseState, EntityId};

/// Domain events emitted for external subscribers (notifiers, search
/// indexers). The engine never sends emails or SMS itself.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    CaseStateChanged {
        case_id: CaseId,
        entity_id: EntityId,
        from: CaseState,
        to: CaseState,
    },
    /// Aggregated per resolution — one event for the whole view, not one
    /// per field.
    FieldDisclosed {
        entity_id: EntityId,
        viewer_tier: AudienceTier,
        fields: Vec<String>,
    },
}

/// Broadcast fan-out for domain events. Publishing never fails: with no
/// subscribers the event is dropped.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: DomainEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("domain event dropped: no subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
