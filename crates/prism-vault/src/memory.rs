use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};
use dashmap::DashMap;

use prism_core::{DocumentId, DocumentRef, DocumentType, ViewerContext, ViewerId};

use crate::error::VaultError;
use crate::grants::GrantTable;
use crate::DocumentVault;

struct StoredDocument {
    bytes: Bytes,
    owner: ViewerId,
}

/// In-memory vault used by the node and tests. Contents are held verbatim;
/// encryption at rest is the storage provider's concern behind the trait.
pub struct InMemoryVault {
    blobs: DashMap<DocumentId, StoredDocument>,
    grants: GrantTable,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self {
            blobs: DashMap::new(),
            grants: GrantTable::new(),
        }
    }

    pub fn document_count(&self) -> usize {
        self.blobs.len()
    }
}

impl Default for InMemoryVault {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentVault for InMemoryVault {
    async fn store(
        &self,
        bytes: Bytes,
        document_type: DocumentType,
        owner: &ViewerId,
    ) -> Result<DocumentRef, VaultError> {
        let document_id = DocumentId::generate();
        let checksum = hex::encode(blake3::hash(&bytes).as_bytes());
        let doc_ref = DocumentRef {
            document_id: document_id.clone(),
            document_type,
            checksum,
            storage_handle: format!("mem://{}", uuid::Uuid::now_v7()),
            uploaded_at: Utc::now(),
        };

        self.blobs.insert(
            document_id.clone(),
            StoredDocument {
                bytes,
                owner: owner.clone(),
            },
        );

        tracing::info!(
            document_id = %document_id,
            document_type = %document_type,
            owner = %owner,
            "document stored"
        );
        Ok(doc_ref)
    }

    async fn grant_access(
        &self,
        document_id: &DocumentId,
        grantee: &ViewerId,
        ttl: Duration,
    ) -> Result<(), VaultError> {
        if !self.blobs.contains_key(document_id) {
            return Err(VaultError::NotFound(document_id.clone()));
        }
        self.grants.grant(document_id, grantee, ttl);
        Ok(())
    }

    async fn revoke_access(
        &self,
        document_id: &DocumentId,
        grantee: &ViewerId,
    ) -> Result<(), VaultError> {
        self.grants.revoke(document_id, grantee);
        Ok(())
    }

    async fn fetch(
        &self,
        document_id: &DocumentId,
        viewer: &ViewerContext,
    ) -> Result<Bytes, VaultError> {
        let stored = self
            .blobs
            .get(document_id)
            .ok_or_else(|| VaultError::NotFound(document_id.clone()))?;

        let allowed = match &viewer.viewer_id {
            Some(id) => *id == stored.owner || self.grants.is_granted(document_id, id),
            None => false,
        };
        if !allowed {
            tracing::warn!(
                document_id = %document_id,
                tier = %viewer.tier,
                "document fetch denied"
            );
            return Err(VaultError::AccessDenied(document_id.clone()));
        }
        Ok(stored.bytes.clone())
    }

    async fn discard(
        &self,
        document_id: &DocumentId,
        owner: &ViewerId,
    ) -> Result<(), VaultError> {
        {
            let stored = self
                .blobs
                .get(document_id)
                .ok_or_else(|| VaultError::NotFound(document_id.clone()))?;
            if stored.owner != *owner {
                return Err(VaultError::AccessDenied(document_id.clone()));
            }
        }
        self.blobs.remove(document_id);
        tracing::debug!(document_id = %document_id, "document discarded");
        Ok(())
    }
}
