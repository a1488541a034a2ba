//! Startup configuration
//!
//! All required keys are validated once, when the config is built, so a
//! missing credential fails before any stage runs instead of mid-run.

use std::path::PathBuf;

use crate::error::{ForgeError, Result};

/// Resolved pipeline configuration, passed into the orchestrator and the
/// provider constructors at startup.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Credential for the generation provider.
    pub api_key: String,
    /// Destination repository for the asset publisher, `owner/repo`.
    pub upload_repository: String,
    /// Auth token for the asset publisher.
    pub upload_credential: String,
    /// Base URL under which published assets resolve.
    pub upload_url_prefix: String,
    /// Credential for the marketplace provider.
    pub marketplace_api_key: String,
    /// Marketplace shop the listings are created under.
    pub marketplace_shop_id: String,
    /// Root directory for run-scoped image folders.
    pub output_dir: PathBuf,
}

impl PipelineConfig {
    /// Build from environment variables. Required: `API_KEY`,
    /// `UPLOAD_REPOSITORY`, `UPLOAD_CREDENTIAL`, `UPLOAD_URL_PREFIX`,
    /// `MARKETPLACE_API_KEY`, `MARKETPLACE_SHOP_ID`. Optional: `OUTPUT_DIR`
    /// (default `img`).
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_key: require("API_KEY")?,
            upload_repository: require("UPLOAD_REPOSITORY")?,
            upload_credential: require("UPLOAD_CREDENTIAL")?,
            upload_url_prefix: require("UPLOAD_URL_PREFIX")?,
            marketplace_api_key: require("MARKETPLACE_API_KEY")?,
            marketplace_shop_id: require("MARKETPLACE_SHOP_ID")?,
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("img")),
        })
    }
}

fn require(key: &'static str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ForgeError::Config(format!("missing required environment variable {}", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test touching the process environment; keeps env mutation out
    // of the rest of the suite.
    #[test]
    fn test_from_env_reports_missing_key_by_name() {
        let keys = [
            ("API_KEY", "k"),
            ("UPLOAD_REPOSITORY", "owner/repo"),
            ("UPLOAD_CREDENTIAL", "tok"),
            ("UPLOAD_URL_PREFIX", "https://host/base"),
            ("MARKETPLACE_API_KEY", "mk"),
            ("MARKETPLACE_SHOP_ID", "shop"),
        ];
        for (k, v) in keys {
            std::env::set_var(k, v);
        }

        let config = PipelineConfig::from_env().unwrap();
        assert_eq!(config.upload_repository, "owner/repo");
        assert_eq!(config.output_dir, PathBuf::from("img"));

        std::env::remove_var("MARKETPLACE_SHOP_ID");
        let err = PipelineConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("MARKETPLACE_SHOP_ID"));

        for (k, _) in keys {
            std::env::remove_var(k);
        }
    }
}
