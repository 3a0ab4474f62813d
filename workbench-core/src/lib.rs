// workbench-core/src/lib.rs

#![doc = include_str!("../../README.md")]

pub mod commit;
pub mod config;
pub mod errors;
pub mod format;
pub mod fs;
pub mod git;
pub mod npm;
pub mod patch;
pub mod runner;
pub mod sequence;
pub mod workbench;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use commit::{CommitOutcome, CommitStep, Committer};
pub use config::WorkbenchConfig;
pub use errors::{Result, WorkbenchError};
pub use git::{DiffOptions, GitClient, RemoteSettings};
pub use npm::NpmClient;
pub use patch::{PatchApplier, PatchOptions, PatchOutcome};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner, RunnerLimits};
pub use workbench::{StartWorkRequest, ToolResponse, Workbench};
pub use workspace::Workspace;

