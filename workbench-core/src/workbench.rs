// workbench-core/src/workbench.rs

//! One method per exposed tool. Each composes the lower-level clients and
//! renders the result as text plus an error flag.

use crate::commit::{CommitOutcome, Committer};
use crate::config::WorkbenchConfig;
use crate::errors::{Result, WorkbenchError};
use crate::format::{format_output, format_step};
use crate::fs;
use crate::git::{DiffOptions, GitClient, RemoteSettings};
use crate::npm::NpmClient;
use crate::patch::{PatchApplier, PatchOptions, PatchOutcome};
use crate::runner::{reject_option_like, CommandOutput, CommandRunner};
use crate::sequence::{SequenceOutcome, StepLog};
use crate::workspace::Workspace;
use std::sync::Arc;
use tracing::{info, warn};

/// Text returned to the caller, with the error flag set on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResponse {
    pub text: String,
    pub is_error: bool,
}

impl ToolResponse {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }

    fn from_result(result: Result<ToolResponse>) -> Self {
        result.unwrap_or_else(|e| {
            warn!(error = %e, "Tool invocation failed");
            ToolResponse::error(format!("Error: {}", e))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartWorkRequest {
    pub branch: String,
    pub cwd: String,
    pub legacy_peer_deps: bool,
    pub start_point: Option<String>,
    pub commit_message: String,
}

#[derive(Clone)]
pub struct Workbench {
    workspace: Workspace,
    git: GitClient,
    npm: NpmClient,
    committer: Committer,
    patcher: PatchApplier,
    max_lines: usize,
}

impl Workbench {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        workspace: Workspace,
        remote: RemoteSettings,
        config: &WorkbenchConfig,
    ) -> Self {
        let max_lines = config.limits.max_output_lines;
        let git = GitClient::new(runner.clone(), workspace.clone(), remote);
        Self {
            npm: NpmClient::new(runner, workspace.clone(), config.npm.program.clone()),
            committer: Committer::new(git.clone(), max_lines),
            patcher: PatchApplier::new(git.clone()),
            workspace,
            git,
            max_lines,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    // --- Files ---

    pub async fn read_file(&self, name: &str) -> ToolResponse {
        ToolResponse::from_result(fs::read_file(&self.workspace, name).await.map(ToolResponse::success))
    }

    pub async fn write_file(&self, name: &str, content: &str, commit_message: &str) -> ToolResponse {
        let result = async {
            require_message(commit_message)?;
            let relative = fs::write_file(&self.workspace, name, content).await?;
            let summary = format!("Wrote {} bytes to {}.", content.len(), relative);
            self.commit_scoped(summary, commit_message, vec![relative]).await
        };
        ToolResponse::from_result(result.await)
    }

    pub async fn delete_file(&self, name: &str, commit_message: &str) -> ToolResponse {
        let result = async {
            require_message(commit_message)?;
            let relative = fs::delete_file(&self.workspace, name).await?;
            self.commit_scoped(format!("Deleted {}.", relative), commit_message, vec![relative])
                .await
        };
        ToolResponse::from_result(result.await)
    }

    /// Creates the folder; commits only when a message is given, since git
    /// does not track empty directories.
    pub async fn create_folder(&self, name: &str, commit_message: Option<&str>) -> ToolResponse {
        let result = async {
            let relative = fs::create_folder(&self.workspace, name).await?;
            let summary = format!("Created folder {}.", relative);
            match commit_message.filter(|m| !m.trim().is_empty()) {
                Some(message) => self.commit_scoped(summary, message, vec![relative]).await,
                None => Ok(ToolResponse::success(summary)),
            }
        };
        ToolResponse::from_result(result.await)
    }

    pub async fn delete_folder(&self, name: &str, commit_message: &str) -> ToolResponse {
        let result = async {
            require_message(commit_message)?;
            let relative = fs::delete_folder(&self.workspace, name).await?;
            self.commit_scoped(format!("Deleted folder {}.", relative), commit_message, vec![relative])
                .await
        };
        ToolResponse::from_result(result.await)
    }

    pub async fn copy_folder(&self, name: &str, new_name: &str, commit_message: &str) -> ToolResponse {
        let result = async {
            require_message(commit_message)?;
            let relative = fs::copy_folder(&self.workspace, name, new_name).await?;
            self.commit_scoped(
                format!("Copied {} to {}.", name, relative),
                commit_message,
                vec![relative],
            )
            .await
        };
        ToolResponse::from_result(result.await)
    }

    pub async fn list_dir(&self, name: Option<&str>) -> ToolResponse {
        ToolResponse::from_result(fs::list_dir(&self.workspace, name).map(|listing| {
            if listing.is_empty() {
                ToolResponse::success("(empty directory)")
            } else {
                ToolResponse::success(listing)
            }
        }))
    }

    pub async fn search_entries(&self, pattern: &str, flags: Option<&str>) -> ToolResponse {
        ToolResponse::from_result(fs::search_entries(&self.workspace, pattern, flags).map(render_hits))
    }

    pub async fn search_content(&self, pattern: &str, flags: Option<&str>, path: Option<&str>) -> ToolResponse {
        ToolResponse::from_result(fs::search_content(&self.workspace, pattern, flags, path).map(render_hits))
    }

    // --- Patches ---

    pub async fn apply_patch(&self, patch: &str, options: PatchOptions, commit_message: &str) -> ToolResponse {
        let result = async {
            if !options.dry_run {
                require_message(commit_message)?;
            }
            let outcome = self.patcher.apply(patch, options).await?;
            let files = outcome
                .paths()
                .iter()
                .map(|p| format!("  {}", p))
                .collect::<Vec<_>>()
                .join("\n");
            match outcome {
                PatchOutcome::Checked { .. } => Ok(ToolResponse::success(format!(
                    "Dry run: patch applies cleanly. Files:\n{}",
                    files
                ))),
                PatchOutcome::CheckFailed { result, .. } => Ok(ToolResponse::error(format!(
                    "patch check failed\n\n{}",
                    format_step("git apply --check", &result, self.max_lines)
                ))),
                PatchOutcome::ApplyFailed { result, .. } => Ok(ToolResponse::error(format!(
                    "patch apply failed (partial apply possible)\n\n{}",
                    format_step("git apply", &result, self.max_lines)
                ))),
                PatchOutcome::Applied { paths, output } => {
                    let mut summary = format!("Applied patch to {} file(s):\n{}", paths.len(), files);
                    let printed = format_output(&output, self.max_lines);
                    if !printed.is_empty() {
                        summary.push_str("\n\n");
                        summary.push_str(&printed);
                    }
                    self.commit_scoped(summary, commit_message, paths).await
                }
            }
        };
        ToolResponse::from_result(result.await)
    }

    // --- Version control ---

    pub async fn vcs_status(&self) -> ToolResponse {
        ToolResponse::from_result(self.git.status().await.map(|out| self.single_step("git status", out)))
    }

    pub async fn vcs_diff(&self, options: &DiffOptions) -> ToolResponse {
        ToolResponse::from_result(self.git.diff(options).await.map(|out| self.single_step("git diff", out)))
    }

    pub async fn vcs_log(&self, limit: usize) -> ToolResponse {
        ToolResponse::from_result(self.git.log(limit).await.map(|out| self.single_step("git log", out)))
    }

    /// Points the remote at the credentialed URL, pulls, branches, installs
    /// and commits, stopping at the first step that fails.
    pub async fn start_work(&self, request: &StartWorkRequest) -> ToolResponse {
        ToolResponse::from_result(self.try_start_work(request).await)
    }

    async fn try_start_work(&self, request: &StartWorkRequest) -> Result<ToolResponse> {
        if request.branch.trim().is_empty() {
            return Err(WorkbenchError::invalid_argument("branch name must not be empty"));
        }
        reject_option_like("branch name", &request.branch)?;
        if let Some(start) = &request.start_point {
            reject_option_like("start point", start)?;
        }
        require_message(&request.commit_message)?;
        let cwd = self.workspace.resolve(&request.cwd)?;
        if !cwd.is_dir() {
            return Err(WorkbenchError::invalid_path(format!(
                "'{}' is not a directory in the workspace",
                request.cwd
            )));
        }
        info!(branch = %request.branch, cwd = %request.cwd, "Starting work");

        let mut log = StepLog::default();
        let outcome = match self.start_work_steps(request, &mut log).await {
            Ok(true) => log.complete(),
            Ok(false) => log.abort(),
            Err(e) => {
                let done = log.render(self.max_lines);
                if done.is_empty() {
                    return Err(e);
                }
                warn!(error = %e, "start_work stopped by an error");
                return Ok(ToolResponse::error(format!(
                    "start_work stopped: Error: {}\n\nCompleted steps:\n\n{}",
                    e,
                    done.join("\n\n")
                )));
            }
        };

        let report = self.render_sequence(&outcome);
        if let Some(failed) = outcome.failed() {
            warn!(step = %failed.label, "start_work aborted");
            return Ok(ToolResponse::error(format!(
                "start_work stopped at step '{}'.\n\n{}",
                failed.label, report
            )));
        }
        let committed = self.committer.commit_and_push(&request.commit_message, None).await?;
        Ok(self.append_commit(report, committed))
    }

    /// Runs the start_work steps into `log`. `Ok(false)` means the last
    /// recorded step exited non-zero.
    async fn start_work_steps(&self, request: &StartWorkRequest, log: &mut StepLog) -> Result<bool> {
        let set_url = self.git.set_remote_url_from_credentials().await?;
        if !log.record("Set remote URL", set_url) {
            return Ok(false);
        }
        if !log.record("Pull", self.git.pull().await?) {
            return Ok(false);
        }
        let branch = self
            .git
            .create_and_push_branch(&request.branch, request.start_point.as_deref())
            .await?;
        if !log.absorb(branch) {
            return Ok(false);
        }
        let installed = self.npm.install_all(&request.cwd, request.legacy_peer_deps).await?;
        Ok(log.record("Install dependencies", installed))
    }

    // --- Package manager ---

    pub async fn install_dependencies(&self, cwd: &str, legacy_peer_deps: bool, commit_message: &str) -> ToolResponse {
        let result = async {
            require_message(commit_message)?;
            let out = self.npm.install_all(cwd, legacy_peer_deps).await?;
            self.npm_then_commit("npm install", out, commit_message).await
        };
        ToolResponse::from_result(result.await)
    }

    pub async fn install_package(&self, cwd: &str, name: &str, commit_message: &str) -> ToolResponse {
        let result = async {
            require_message(commit_message)?;
            let out = self.npm.install_package(cwd, name).await?;
            self.npm_then_commit(&format!("npm install {}", name), out, commit_message)
                .await
        };
        ToolResponse::from_result(result.await)
    }

    pub async fn run_build(&self, cwd: &str, commit_message: &str) -> ToolResponse {
        let result = async {
            require_message(commit_message)?;
            let out = self.npm.run_build(cwd).await?;
            self.npm_then_commit("npm run build", out, commit_message).await
        };
        ToolResponse::from_result(result.await)
    }

    pub async fn run_script(&self, cwd: &str, script: &str, commit_message: &str) -> ToolResponse {
        let result = async {
            require_message(commit_message)?;
            let out = self.npm.run_script(cwd, script).await?;
            self.npm_then_commit(&format!("npm run {}", script), out, commit_message)
                .await
        };
        ToolResponse::from_result(result.await)
    }

    // --- Rendering ---

    async fn npm_then_commit(&self, label: &str, out: CommandOutput, commit_message: &str) -> Result<ToolResponse> {
        let step = format_step(label, &out, self.max_lines);
        if !out.success() {
            return Ok(ToolResponse::error(step));
        }
        // Lockfiles and build output can change anywhere, so stage everything.
        let committed = self.committer.commit_and_push(commit_message, None).await?;
        Ok(self.append_commit(step, committed))
    }

    async fn commit_scoped(&self, summary: String, commit_message: &str, paths: Vec<String>) -> Result<ToolResponse> {
        require_message(commit_message)?;
        let committed = self.committer.commit_and_push(commit_message, Some(&paths)).await?;
        Ok(self.append_commit(summary, committed))
    }

    fn single_step(&self, label: &str, out: CommandOutput) -> ToolResponse {
        if out.success() {
            let text = format_output(&out, self.max_lines);
            ToolResponse::success(if text.is_empty() { "(no output)".to_string() } else { text })
        } else {
            ToolResponse::error(format_step(label, &out, self.max_lines))
        }
    }

    fn render_sequence(&self, outcome: &SequenceOutcome) -> String {
        outcome
            .steps()
            .iter()
            .map(|step| step.render(self.max_lines))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn append_commit(&self, head: String, outcome: CommitOutcome) -> ToolResponse {
        match outcome {
            CommitOutcome::Committed { outputs } => {
                ToolResponse::success(format!("{}\n\n{}", head, outputs.join("\n\n")))
            }
            CommitOutcome::NoOp { outputs, reason } => {
                ToolResponse::success(format!("{}\n\n{}\n\n{}", head, outputs.join("\n\n"), reason))
            }
            CommitOutcome::Failed { step, result } => ToolResponse::error(format!(
                "{}\n\nCommit-and-push failed at the {} step.\n\n{}",
                head,
                step,
                format_step(step.label(), &result, self.max_lines)
            )),
        }
    }
}

fn require_message(message: &str) -> Result<()> {
    if message.trim().is_empty() {
        return Err(WorkbenchError::invalid_argument("commit message must not be empty"));
    }
    Ok(())
}

fn render_hits(hits: Vec<String>) -> ToolResponse {
    if hits.is_empty() {
        return ToolResponse::success("No matches.");
    }
    let mut text = hits.join("\n");
    if hits.len() >= fs::MAX_SEARCH_RESULTS {
        text.push_str(&format!("\n(results capped at {})", fs::MAX_SEARCH_RESULTS));
    }
    ToolResponse::success(text)
}
