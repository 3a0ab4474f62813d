// workbench-core/src/npm.rs

use crate::errors::{Result, WorkbenchError};
use crate::runner::{reject_option_like, CommandOutput, CommandRunner};
use crate::workspace::Workspace;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Runs the package manager inside a directory of the workspace.
///
/// The caller inspects the returned exit status; only launch failures and
/// bad directories are errors.
#[derive(Clone)]
pub struct NpmClient {
    runner: Arc<dyn CommandRunner>,
    workspace: Workspace,
    program: String,
}

impl NpmClient {
    pub fn new(runner: Arc<dyn CommandRunner>, workspace: Workspace, program: impl Into<String>) -> Self {
        Self {
            runner,
            workspace,
            program: program.into(),
        }
    }

    /// Installs everything in the manifest, dev dependencies included.
    pub async fn install_all(&self, cwd: &str, legacy_peer_deps: bool) -> Result<CommandOutput> {
        let mut args = vec!["install", "--include=dev"];
        if legacy_peer_deps {
            args.push("--legacy-peer-deps");
        }
        self.run(cwd, &args).await
    }

    pub async fn install_package(&self, cwd: &str, spec: &str) -> Result<CommandOutput> {
        if spec.trim().is_empty() {
            return Err(WorkbenchError::invalid_argument("package name must not be empty"));
        }
        reject_option_like("package name", spec)?;
        self.run(cwd, &["install", spec]).await
    }

    pub async fn run_script(&self, cwd: &str, script: &str) -> Result<CommandOutput> {
        if script.trim().is_empty() {
            return Err(WorkbenchError::invalid_argument("script name must not be empty"));
        }
        reject_option_like("script name", script)?;
        self.run(cwd, &["run", script]).await
    }

    pub async fn run_build(&self, cwd: &str) -> Result<CommandOutput> {
        self.run_script(cwd, "build").await
    }

    fn working_dir(&self, cwd: &str) -> Result<PathBuf> {
        let dir = self.workspace.resolve(cwd)?;
        if !dir.is_dir() {
            return Err(WorkbenchError::invalid_path(format!(
                "'{}' is not a directory in the workspace",
                cwd
            )));
        }
        Ok(dir)
    }

    async fn run(&self, cwd: &str, args: &[&str]) -> Result<CommandOutput> {
        let dir = self.working_dir(cwd)?;
        info!(
            "Running: {} {} in {}",
            self.program,
            args.join(" "),
            self.workspace.relative(&dir)
        );
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.runner.run(&self.program, &args, &dir).await
    }
}
