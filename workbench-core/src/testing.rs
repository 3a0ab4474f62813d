// workbench-core/src/testing.rs

//! Scripted [`CommandRunner`] for exercising command sequences without
//! spawning processes.

use crate::errors::{Result, WorkbenchError};
use crate::runner::{CommandOutput, CommandRunner};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

enum Reply {
    Output(CommandOutput),
    LaunchFailure,
}

/// Replies to commands by prefix; anything unscripted succeeds silently.
#[derive(Default)]
pub(crate) struct ScriptedRunner {
    rules: Mutex<Vec<(String, Reply)>>,
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every command line starting with `prefix` (e.g. `"git commit"`) gets `output`.
    pub(crate) fn on(self, prefix: &str, output: CommandOutput) -> Self {
        self.rules
            .lock()
            .unwrap()
            .push((prefix.to_string(), Reply::Output(output)));
        self
    }

    pub(crate) fn fail(self, prefix: &str, status: i32, stderr: &str) -> Self {
        self.on(prefix, CommandOutput::new(status, "", stderr))
    }

    pub(crate) fn fail_launch(self, prefix: &str) -> Self {
        self.rules
            .lock()
            .unwrap()
            .push((prefix.to_string(), Reply::LaunchFailure));
        self
    }

    /// Command lines in call order, `program arg arg ...`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(line, _)| line.clone())
            .collect()
    }

    pub(crate) fn dirs(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, dir)| dir.clone())
            .collect()
    }

    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        working_dir: &Path,
    ) -> Result<CommandOutput> {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls
            .lock()
            .unwrap()
            .push((line.clone(), working_dir.to_path_buf()));

        let rules = self.rules.lock().unwrap();
        match rules.iter().find(|(prefix, _)| line.starts_with(prefix.as_str())) {
            Some((_, Reply::Output(output))) => Ok(output.clone()),
            Some((_, Reply::LaunchFailure)) => Err(WorkbenchError::Launch {
                program: program.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted"),
            }),
            None => Ok(CommandOutput::new(0, "", "")),
        }
    }
}
