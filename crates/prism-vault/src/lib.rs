pub mod error;
pub mod grants;
pub mod memory;

pub use error::VaultError;
pub use grants::GrantTable;
pub use memory::InMemoryVault;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;

use prism_core::{DocumentId, DocumentRef, DocumentType, ViewerContext, ViewerId};

/// Abstraction over encrypted blob storage.
///
/// The engine never inspects document contents; it tracks metadata and a
/// revocable grant list. Access grants are the only path by which a reviewer
/// or the owner can retrieve raw bytes — all other viewers are denied
/// regardless of verification state.
#[async_trait]
pub trait DocumentVault: Send + Sync {
    /// Store bytes on behalf of `owner`, returning the tracked metadata.
    async fn store(
        &self,
        bytes: Bytes,
        document_type: DocumentType,
        owner: &ViewerId,
    ) -> Result<DocumentRef, VaultError>;

    /// Grant a viewer time-limited access to a document.
    async fn grant_access(
        &self,
        document_id: &DocumentId,
        grantee: &ViewerId,
        ttl: Duration,
    ) -> Result<(), VaultError>;

    /// Revoke a previously issued grant. Revoking a grant that does not
    /// exist is a no-op.
    async fn revoke_access(
        &self,
        document_id: &DocumentId,
        grantee: &ViewerId,
    ) -> Result<(), VaultError>;

    /// Fetch raw bytes. Succeeds only for the owner or an unexpired grantee.
    async fn fetch(
        &self,
        document_id: &DocumentId,
        viewer: &ViewerContext,
    ) -> Result<Bytes, VaultError>;

    /// Remove a stored document. Owner only; used to clean up blobs whose
    /// case update did not commit, never to delete referenced documents.
    async fn discard(
        &self,
        document_id: &DocumentId,
        owner: &ViewerId,
    ) -> Result<(), VaultError>;
}
