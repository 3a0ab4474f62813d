// workbench-core/src/sequence.rs

//! Bookkeeping for linear chains of commands that stop at the first failure.

use crate::format::format_step;
use crate::runner::CommandOutput;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub label: String,
    pub output: CommandOutput,
}

impl Step {
    pub fn new(label: impl Into<String>, output: CommandOutput) -> Self {
        Self {
            label: label.into(),
            output,
        }
    }

    pub fn render(&self, max_lines: usize) -> String {
        format_step(&self.label, &self.output, max_lines)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceOutcome {
    /// Every step exited zero.
    Completed(Vec<Step>),
    /// `failed` exited non-zero; nothing after it ran.
    Aborted { completed: Vec<Step>, failed: Step },
}

impl SequenceOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SequenceOutcome::Completed(_))
    }

    /// All steps that ran, in order, the failed one last.
    pub fn steps(&self) -> Vec<&Step> {
        match self {
            SequenceOutcome::Completed(steps) => steps.iter().collect(),
            SequenceOutcome::Aborted { completed, failed } => {
                completed.iter().chain(std::iter::once(failed)).collect()
            }
        }
    }

    pub fn failed(&self) -> Option<&Step> {
        match self {
            SequenceOutcome::Completed(_) => None,
            SequenceOutcome::Aborted { failed, .. } => Some(failed),
        }
    }
}

/// Accumulates steps as they run.
///
/// ```ignore
/// let mut log = StepLog::default();
/// if !log.record("Create branch", git.checkout_new_branch(..).await?) {
///     return Ok(log.abort());
/// }
/// ```
#[derive(Debug, Default)]
pub struct StepLog {
    steps: Vec<Step>,
}

impl StepLog {
    /// Records a step and reports whether it succeeded.
    pub fn record(&mut self, label: impl Into<String>, output: CommandOutput) -> bool {
        let ok = output.success();
        self.steps.push(Step::new(label, output));
        ok
    }

    /// Takes over the steps of a finished sub-sequence. Returns `false` if that
    /// sequence was aborted, in which case its failed step is now the last one.
    pub fn absorb(&mut self, outcome: SequenceOutcome) -> bool {
        match outcome {
            SequenceOutcome::Completed(steps) => {
                self.steps.extend(steps);
                true
            }
            SequenceOutcome::Aborted { completed, failed } => {
                self.steps.extend(completed);
                self.steps.push(failed);
                false
            }
        }
    }

    pub fn complete(self) -> SequenceOutcome {
        SequenceOutcome::Completed(self.steps)
    }

    /// Closes the log with the most recently recorded step as the failure.
    pub fn abort(mut self) -> SequenceOutcome {
        match self.steps.pop() {
            Some(failed) => SequenceOutcome::Aborted {
                completed: self.steps,
                failed,
            },
            None => SequenceOutcome::Completed(Vec::new()),
        }
    }

    pub fn render(&self, max_lines: usize) -> Vec<String> {
        self.steps.iter().map(|s| s.render(max_lines)).collect()
    }
}
