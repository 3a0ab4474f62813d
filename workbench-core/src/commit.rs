// workbench-core/src/commit.rs

//! Stage, commit and push as one operation.

use crate::errors::Result;
use crate::format::{format_step, preview};
use crate::git::{AddScope, GitClient};
use crate::runner::CommandOutput;
use std::fmt;
use tracing::{info, warn};

const NO_OP_SIGNATURES: [&str; 2] = ["nothing to commit", "no changes added to commit"];

/// The step of stage/commit/push that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStep {
    Stage,
    Commit,
    Push,
}

impl CommitStep {
    /// Heading used for this step in formatted reports.
    pub fn label(&self) -> &'static str {
        match self {
            CommitStep::Stage => "Stage changes",
            CommitStep::Commit => "Commit",
            CommitStep::Push => "Push",
        }
    }
}

impl fmt::Display for CommitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CommitStep::Stage => "stage",
            CommitStep::Commit => "commit",
            CommitStep::Push => "push",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Staged, committed and pushed; one formatted block per step.
    Committed { outputs: Vec<String> },
    /// The commit found nothing to record. Push was not attempted.
    NoOp { outputs: Vec<String>, reason: String },
    /// `step` exited non-zero; its result is carried verbatim.
    Failed { step: CommitStep, result: CommandOutput },
}

/// True if a failed commit only failed because there was nothing staged.
pub fn is_nothing_to_commit(result: &CommandOutput) -> bool {
    let text = result.combined().to_lowercase();
    NO_OP_SIGNATURES.iter().any(|sig| text.contains(sig))
}

#[derive(Clone)]
pub struct Committer {
    git: GitClient,
    max_lines: usize,
}

impl Committer {
    pub fn new(git: GitClient, max_lines: usize) -> Self {
        Self { git, max_lines }
    }

    /// Stages `scope` (everything when `None`), commits with `message` and
    /// pushes HEAD to the configured remote.
    pub async fn commit_and_push(&self, message: &str, scope: Option<&[String]>) -> Result<CommitOutcome> {
        let scope = match scope {
            Some(paths) if !paths.is_empty() => AddScope::Paths(paths.to_vec()),
            _ => AddScope::All,
        };
        info!(message = %preview(message, 60), ?scope, "Committing workspace changes");

        let mut outputs = Vec::with_capacity(3);

        let staged = self.git.add(&scope).await?;
        if !staged.success() {
            warn!(status = staged.status, "Staging failed");
            return Ok(CommitOutcome::Failed {
                step: CommitStep::Stage,
                result: staged,
            });
        }
        outputs.push(format_step(CommitStep::Stage.label(), &staged, self.max_lines));

        let committed = self.git.commit(message).await?;
        if !committed.success() {
            if is_nothing_to_commit(&committed) {
                info!("Nothing to commit; skipping push");
                outputs.push(format_step(
                    CommitStep::Commit.label(),
                    &CommandOutput::new(0, committed.stdout.clone(), committed.stderr.clone()),
                    self.max_lines,
                ));
                return Ok(CommitOutcome::NoOp {
                    outputs,
                    reason: "Nothing to commit; working tree already matches HEAD.".to_string(),
                });
            }
            warn!(status = committed.status, "Commit failed");
            return Ok(CommitOutcome::Failed {
                step: CommitStep::Commit,
                result: committed,
            });
        }
        outputs.push(format_step(CommitStep::Commit.label(), &committed, self.max_lines));

        let remote = self.git.remote_name().to_string();
        let pushed = self.git.push(&remote, Some("HEAD")).await?;
        if !pushed.success() {
            warn!(status = pushed.status, remote = %remote, "Push failed");
            return Ok(CommitOutcome::Failed {
                step: CommitStep::Push,
                result: pushed,
            });
        }
        outputs.push(format_step(CommitStep::Push.label(), &pushed, self.max_lines));

        Ok(CommitOutcome::Committed { outputs })
    }
}
