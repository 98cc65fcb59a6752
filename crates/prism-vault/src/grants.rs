use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use prism_core::{DocumentId, ViewerId};

/// One time-limited access grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub grantee: ViewerId,
    pub expires_at: DateTime<Utc>,
}

impl AccessGrant {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Revocable grant list per document.
pub struct GrantTable {
    grants: DashMap<DocumentId, Vec<AccessGrant>>,
}

impl GrantTable {
    pub fn new() -> Self {
        Self {
            grants: DashMap::new(),
        }
    }

    /// Add or refresh a grant. A repeated grant for the same viewer replaces
    /// the previous expiry.
    pub fn grant(&self, document_id: &DocumentId, grantee: &ViewerId, ttl: Duration) {
        let grant = AccessGrant {
            grantee: grantee.clone(),
            expires_at: Utc::now() + ttl,
        };
        let mut entry = self.grants.entry(document_id.clone()).or_default();
        entry.retain(|g| g.grantee != *grantee);
        entry.push(grant);
        tracing::debug!(
            document_id = %document_id,
            grantee = %grantee,
            "vault access granted"
        );
    }

    /// Remove a grant. Returns whether one existed.
    pub fn revoke(&self, document_id: &DocumentId, grantee: &ViewerId) -> bool {
        if let Some(mut entry) = self.grants.get_mut(document_id) {
            let before = entry.len();
            entry.retain(|g| g.grantee != *grantee);
            let removed = entry.len() < before;
            if removed {
                tracing::debug!(
                    document_id = %document_id,
                    grantee = %grantee,
                    "vault access revoked"
                );
            }
            removed
        } else {
            false
        }
    }

    /// Whether the viewer holds an unexpired grant.
    pub fn is_granted(&self, document_id: &DocumentId, viewer: &ViewerId) -> bool {
        let now = Utc::now();
        self.grants
            .get(document_id)
            .map(|entry| {
                entry
                    .iter()
                    .any(|g| g.grantee == *viewer && g.is_active(now))
            })
            .unwrap_or(false)
    }
}

impl Default for GrantTable {
    fn default() -> Self {
        Self::new()
    }
}
