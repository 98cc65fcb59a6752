use crate::types::EntityType;

/// Engine-wide error taxonomy.
///
/// Denied visibility is never an error — the resolver represents it as data.
/// Errors are reserved for configuration gaps, guard failures, and
/// unavailable external dependencies.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A state transition guard failed. The message names the specific
    /// unmet precondition (e.g. "missing document: pan_card").
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Fatal configuration error: a stored field has no visibility policy.
    /// Never defaults to "visible".
    #[error("no visibility policy for field '{field}' of entity type '{entity_type}'")]
    PolicyGap {
        entity_type: EntityType,
        field: String,
    },

    /// Fatal configuration error: no policy set has ever been published for
    /// the entity type.
    #[error("no policy set published for entity type '{0}'")]
    MissingPolicySet(EntityType),

    /// A write referenced a field the policy set does not define.
    /// Rejected at write time, not silently dropped at read time.
    #[error("unknown field '{0}': no policy defined")]
    UnknownField(String),

    #[error("validation failed: {0}")]
    ValidationError(String),

    /// Explicit denial — only raised for document fetches and privileged
    /// operations, never for field visibility.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Optimistic-concurrency conflict. Retryable: re-fetch and retry.
    #[error("concurrent modification of case {case_id}: expected version {expected}, found {actual}")]
    ConcurrentModification {
        case_id: String,
        expected: u64,
        actual: u64,
    },

    /// An external dependency (vault, case repository) timed out or failed.
    /// Retryable with backoff.
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl CoreError {
    /// Whether the caller may retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentModification { .. } | Self::DependencyUnavailable(_)
        )
    }
}
