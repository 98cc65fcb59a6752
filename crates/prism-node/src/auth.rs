//! Viewer-context derivation from bearer tokens.
//!
//! The session directory stands in for the external authentication
//! collaborator. The engine trusts the directory's tier claims; unknown or
//! absent tokens resolve to the anonymous public tier rather than erroring,
//! so the public read path needs no credentials.

use axum::http::HeaderMap;
use dashmap::DashMap;

use prism_core::{AudienceTier, ViewerContext, ViewerId};

use crate::config::AuthConfig;

/// Token-to-session lookup built from the node config.
pub struct SessionDirectory {
    sessions: DashMap<String, (ViewerId, AudienceTier)>,
}

impl SessionDirectory {
    pub fn from_config(config: &AuthConfig) -> Self {
        let sessions = DashMap::new();
        for entry in &config.sessions {
            let tier = match entry.tier.as_str() {
                "member" => AudienceTier::Member,
                "government" => AudienceTier::Government,
                other => {
                    // A misconfigured tier never grants elevated access.
                    tracing::warn!(
                        viewer_id = %entry.viewer_id,
                        tier = other,
                        "unknown session tier, demoting to public"
                    );
                    AudienceTier::Public
                }
            };
            sessions.insert(
                entry.token.clone(),
                (ViewerId::from(entry.viewer_id.as_str()), tier),
            );
        }
        Self { sessions }
    }

    /// Resolve the viewer context for a request.
    pub fn context_for(&self, headers: &HeaderMap) -> ViewerContext {
        let Some(token) = bearer_token(headers) else {
            return ViewerContext::anonymous();
        };
        match self.sessions.get(token) {
            Some(session) => {
                let (viewer_id, tier) = session.clone();
                ViewerContext::authenticated(viewer_id, tier)
            }
            None => {
                tracing::debug!("unknown bearer token, treating as anonymous");
                ViewerContext::anonymous()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
