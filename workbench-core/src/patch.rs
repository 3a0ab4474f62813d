// workbench-core/src/patch.rs

//! Applies unified diffs to the workspace with `git apply`, after checking
//! that every file the diff touches is inside the workspace.

use crate::errors::{Result, WorkbenchError};
use crate::git::GitClient;
use crate::runner::CommandOutput;
use std::collections::BTreeSet;
use tempfile::TempDir;
use tracing::{debug, info, warn};

const SCRATCH_FILE: &str = "patch.diff";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOptions {
    /// Validate only; the working tree is not touched.
    pub dry_run: bool,
    /// Apply the patch in reverse.
    pub reverse: bool,
    /// Context lines that must match, passed as `-C<n>`.
    pub fuzz: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Dry run: `git apply --check` passed.
    Checked { paths: Vec<String> },
    Applied { paths: Vec<String>, output: CommandOutput },
    /// `git apply --check` rejected the patch. Nothing was written.
    CheckFailed { paths: Vec<String>, result: CommandOutput },
    /// The real apply failed after the check passed; the tree may be partly patched.
    ApplyFailed { paths: Vec<String>, result: CommandOutput },
}

impl PatchOutcome {
    pub fn paths(&self) -> &[String] {
        match self {
            PatchOutcome::Checked { paths }
            | PatchOutcome::Applied { paths, .. }
            | PatchOutcome::CheckFailed { paths, .. }
            | PatchOutcome::ApplyFailed { paths, .. } => paths,
        }
    }
}

/// Paths named by the `---`/`+++` headers, with `a/`/`b/` stripped and
/// `/dev/null` left out.
pub fn extract_patch_paths(diff: &str) -> BTreeSet<String> {
    diff.lines()
        .filter_map(|line| {
            line.strip_prefix("--- ")
                .or_else(|| line.strip_prefix("+++ "))
        })
        .filter_map(|rest| rest.split_whitespace().next())
        .map(|raw| {
            raw.strip_prefix("a/")
                .or_else(|| raw.strip_prefix("b/"))
                .unwrap_or(raw)
        })
        .filter(|path| !path.is_empty() && *path != "/dev/null")
        .map(str::to_string)
        .collect()
}

#[derive(Clone)]
pub struct PatchApplier {
    git: GitClient,
}

impl PatchApplier {
    pub fn new(git: GitClient) -> Self {
        Self { git }
    }

    pub async fn apply(&self, diff: &str, options: PatchOptions) -> Result<PatchOutcome> {
        let path_set = extract_patch_paths(diff);
        if path_set.is_empty() {
            return Err(WorkbenchError::InvalidPatch("no file paths in patch".to_string()));
        }
        for path in &path_set {
            self.git.workspace().resolve(path).map_err(|_| {
                warn!(path = %path, "Patch touches a path outside the workspace");
                WorkbenchError::invalid_path(format!("patch path '{}' is outside the workspace", path))
            })?;
        }
        let paths: Vec<String> = path_set.into_iter().collect();
        info!(files = paths.len(), ?options, "Applying patch");

        // Dropping the TempDir removes it, whichever way this function returns.
        let scratch = TempDir::new().map_err(|e| WorkbenchError::io(std::env::temp_dir(), e))?;
        let patch_file = scratch.path().join(SCRATCH_FILE);
        tokio::fs::write(&patch_file, diff)
            .await
            .map_err(|e| WorkbenchError::io(&patch_file, e))?;
        debug!(path = ?patch_file, bytes = diff.len(), "Wrote patch to scratch file");

        let mut flags = Vec::new();
        if options.reverse {
            flags.push("--reverse".to_string());
        }
        if let Some(fuzz) = options.fuzz {
            flags.push(format!("-C{}", fuzz));
        }
        let patch_arg = patch_file.to_string_lossy().into_owned();

        let mut check_args = vec!["apply".to_string(), "--check".to_string()];
        check_args.extend(flags.iter().cloned());
        check_args.push(patch_arg.clone());
        let checked = self.git.run(&check_args).await?;
        if !checked.success() {
            warn!(status = checked.status, "Patch check failed");
            return Ok(PatchOutcome::CheckFailed {
                paths,
                result: checked,
            });
        }

        if options.dry_run {
            info!("Dry run: patch applies cleanly");
            return Ok(PatchOutcome::Checked { paths });
        }

        let mut apply_args = vec!["apply".to_string()];
        apply_args.extend(flags);
        apply_args.push(patch_arg);
        let applied = self.git.run(&apply_args).await?;
        if !applied.success() {
            warn!(status = applied.status, "Patch apply failed after a clean check");
            return Ok(PatchOutcome::ApplyFailed {
                paths,
                result: applied,
            });
        }

        Ok(PatchOutcome::Applied {
            paths,
            output: applied,
        })
    }
}
