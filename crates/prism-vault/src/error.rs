use prism_core::{CoreError, DocumentId};

/// Vault interface errors.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The viewer is neither the owner nor an unexpired grantee.
    #[error("access denied to document {0}")]
    AccessDenied(DocumentId),

    #[error("document not found: {0}")]
    NotFound(DocumentId),

    /// Storage backend timeout or failure. Retryable.
    #[error("vault unavailable: {0}")]
    Unavailable(String),
}

impl From<VaultError> for CoreError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::AccessDenied(id) => {
                CoreError::AccessDenied(format!("document {}", id))
            }
            VaultError::NotFound(id) => CoreError::NotFound(format!("document {}", id)),
            VaultError::Unavailable(msg) => CoreError::DependencyUnavailable(msg),
        }
    }
}
