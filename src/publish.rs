//! Asset publisher - batch hosting of a run directory
//!
//! Publication is a batch boundary: every file in the run directory goes up
//! as a unit, and any per-file failure fails the whole stage, because the
//! orchestrator has no per-file retry path once it starts constructing URLs.

use base64::Engine;
use serde_json::json;
use std::path::Path;
use std::time::Duration;

use crate::error::{ForgeError, Result};

const DEFAULT_API_URL: &str = "https://api.github.com";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Trait implemented by asset hosts (GitHub contents API, test doubles).
pub trait AssetPublisher {
    /// Publish every file in `dir` and return the base URL under which the
    /// directory's files resolve.
    fn publish(&self, dir: &Path) -> Result<String>;
}

/// Publishes rendered images to a GitHub repository via the contents API,
/// one commit per file.
pub struct GithubPublisher {
    /// `owner/repo`.
    repository: String,
    token: String,
    /// Base URL template the public asset URLs are constructed from.
    url_prefix: String,
    branch: String,
    api_url: String,
}

impl GithubPublisher {
    pub fn new(
        repository: impl Into<String>,
        token: impl Into<String>,
        url_prefix: impl Into<String>,
    ) -> Self {
        Self {
            repository: repository.into(),
            token: token.into(),
            url_prefix: url_prefix.into(),
            branch: "main".to_string(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    fn put_file(&self, dir_name: &str, file_name: &str, data: &[u8]) -> Result<()> {
        let content = base64::engine::general_purpose::STANDARD.encode(data);
        let payload = json!({
            "message": format!("Add {}/{}", dir_name, file_name),
            "content": content,
            "branch": self.branch,
        });

        let url = format!(
            "{}/repos/{}/contents/{}/{}",
            self.api_url, self.repository, dir_name, file_name
        );

        let agent = build_agent();
        agent
            .put(&url)
            .header("Authorization", &format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "shirtforge")
            .send_json(&payload)
            .map_err(|e| {
                ForgeError::Publish(format!("upload of {} failed: {}", file_name, e))
            })?;
        Ok(())
    }
}

impl AssetPublisher for GithubPublisher {
    fn publish(&self, dir: &Path) -> Result<String> {
        let dir_name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ForgeError::Publish(format!("unusable run directory {:?}", dir)))?;

        let mut entries: Vec<_> = std::fs::read_dir(dir)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .filter(|e| e.path().is_file())
            .collect();
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let file_name = entry.file_name();
            let file_name = file_name.to_str().ok_or_else(|| {
                ForgeError::Publish(format!("non-UTF-8 file name {:?}", entry.file_name()))
            })?;
            let data = std::fs::read(entry.path())?;
            self.put_file(dir_name, file_name, &data)?;
            tracing::debug!(file = file_name, "published asset");
        }

        Ok(format!(
            "{}/{}",
            self.url_prefix.trim_end_matches('/'),
            dir_name
        ))
    }
}

fn build_agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .build();
    config.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_joins_prefix_and_dir_name() {
        // Trailing slash on the prefix must not produce a double slash.
        let publisher = GithubPublisher::new("o/r", "t", "https://host.test/assets/");
        let dir = tempfile::tempdir().unwrap();
        let run_dir = dir.path().join("2024-01-01_00-00-00");
        std::fs::create_dir_all(&run_dir).unwrap();

        // Empty directory: no uploads attempted, base URL still derived.
        let base = publisher.publish(&run_dir).unwrap();
        assert_eq!(base, "https://host.test/assets/2024-01-01_00-00-00");
    }
}
