//! Node configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full configuration for the Prism node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PrismConfig {
    /// API server settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Verification review settings.
    #[serde(default)]
    pub review: ReviewConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Static session directory for viewer authentication.
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API listen address.
    #[serde(default = "default_api_addr")]
    pub listen_addr: String,
    /// API port.
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// How long a claiming reviewer may fetch submitted documents, in hours.
    #[serde(default = "default_grant_ttl_hours")]
    pub document_grant_ttl_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Static bearer-token sessions, the stand-in for the external
/// authentication collaborator. Unknown tokens resolve to anonymous
/// public-tier traffic.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub sessions: Vec<SessionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEntry {
    pub token: String,
    pub viewer_id: String,
    /// One of: public, member, government.
    pub tier: String,
}

// Default value functions
fn default_api_addr() -> String {
    "127.0.0.1".into()
}
fn default_api_port() -> u16 {
    7430
}
fn default_grant_ttl_hours() -> i64 {
    72
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_api_addr(),
            port: default_api_port(),
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            document_grant_ttl_hours: default_grant_ttl_hours(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl PrismConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: PrismConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.listen_addr, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PrismConfig::default();
        assert_eq!(config.api.port, 7430);
        assert_eq!(config.review.document_grant_ttl_hours, 72);
        assert_eq!(config.logging.level, "info");
        assert!(config.auth.sessions.is_empty());
    }

    #[test]
    fn test_api_addr() {
        let config = PrismConfig::default();
        assert_eq!(config.api_addr(), "127.0.0.1:7430");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = PrismConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let decoded: PrismConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(decoded.api.port, config.api.port);
        assert_eq!(
            decoded.review.document_grant_ttl_hours,
            config.review.document_grant_ttl_hours
        );
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let config = PrismConfig::load(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.api.port, 7430);
    }

    #[test]
    fn test_config_from_toml_partial() {
        let toml_str = r#"
[api]
port = 8430

[[auth.sessions]]
token = "tok-owner"
viewer_id = "v-owner"
tier = "member"
"#;
        let config: PrismConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.api.port, 8430);
        assert_eq!(config.auth.sessions.len(), 1);
        assert_eq!(config.auth.sessions[0].tier, "member");
        // Defaults for unspecified
        assert_eq!(config.review.document_grant_ttl_hours, 72);
    }
}
