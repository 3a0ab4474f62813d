// workbench-core/src/config.rs

//! Configuration structures and parsing for `Workbench.toml`.

use crate::errors::{Result, WorkbenchError};
use crate::format::DEFAULT_MAX_LINES;
use crate::git::RemoteSettings;
use crate::runner::RunnerLimits;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WorkbenchConfig {
    /// Workspace root. The command line and `WORKBENCH_ROOT` take precedence.
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub npm: NpmConfig,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GitConfig {
    pub remote: String,
    /// Name of the env var holding the repository URL.
    pub repo_url_env_var: String,
    /// Name of the env var holding the access token.
    pub token_env_var: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            repo_url_env_var: "GIT_REPO_URL".to_string(),
            token_env_var: "GIT_TOKEN".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Per-command timeout; 0 disables it.
    pub timeout_secs: u64,
    /// Per-stream byte cap; 0 disables it.
    pub max_output_bytes: usize,
    /// Lines of each stream kept in tool responses.
    pub max_output_lines: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            max_output_bytes: 1024 * 1024,
            max_output_lines: DEFAULT_MAX_LINES,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct NpmConfig {
    pub program: String,
}

impl Default for NpmConfig {
    fn default() -> Self {
        Self {
            program: "npm".to_string(),
        }
    }
}

impl WorkbenchConfig {
    pub fn from_toml_str(content: &str) -> Result<WorkbenchConfig> {
        let config: WorkbenchConfig = match toml::from_str(content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse TOML content");
                return Err(WorkbenchError::config(format!(
                    "Failed to parse configuration TOML: {}",
                    e
                )));
            }
        };

        if let Some(root) = &config.root {
            if !root.is_absolute() {
                return Err(WorkbenchError::config(format!(
                    "'root' must be an absolute path, got {:?}",
                    root
                )));
            }
        }
        if config.git.remote.trim().is_empty() {
            return Err(WorkbenchError::config("'git.remote' is empty."));
        }
        if config.git.repo_url_env_var.trim().is_empty() {
            return Err(WorkbenchError::config("'git.repo_url_env_var' is empty."));
        }
        if config.git.token_env_var.trim().is_empty() {
            return Err(WorkbenchError::config("'git.token_env_var' is empty."));
        }
        if config.limits.max_output_lines == 0 {
            return Err(WorkbenchError::config("'limits.max_output_lines' must be at least 1."));
        }
        if config.npm.program.trim().is_empty() {
            return Err(WorkbenchError::config("'npm.program' is empty."));
        }

        tracing::info!("Successfully parsed and validated workbench configuration.");
        Ok(config)
    }

    pub fn runner_limits(&self) -> RunnerLimits {
        RunnerLimits {
            timeout: (self.limits.timeout_secs > 0).then(|| Duration::from_secs(self.limits.timeout_secs)),
            max_output_bytes: (self.limits.max_output_bytes > 0).then_some(self.limits.max_output_bytes),
        }
    }

    /// Reads the credential env vars named in `[git]` through `lookup`.
    /// Blank values count as unset.
    pub fn remote_settings<F>(&self, lookup: F) -> RemoteSettings
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        RemoteSettings {
            remote: self.git.remote.clone(),
            repo_url: read(&self.git.repo_url_env_var),
            token: read(&self.git.token_env_var),
        }
    }
}
