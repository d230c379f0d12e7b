//! Maps phase outcomes onto the public result vocabulary.

use std::time::Duration;

use crate::core::domain::{
    ExecutionResult, ExecutionStatus, PhaseOutcome, PhaseOutput, ValidationResult,
};

pub fn timeout_message(timeout: Duration) -> String {
    format!("code execution timed out after {}s", timeout.as_secs())
}

/// Diagnostics of a failed build: stderr, else stdout, else the exit itself.
pub fn build_diagnostics(build: &PhaseOutput) -> String {
    if let PhaseOutcome::SpawnFailed { msg } = &build.outcome {
        return msg.clone();
    }
    if !build.stderr.is_empty() {
        return build.stderr.clone();
    }
    if !build.stdout.is_empty() {
        return build.stdout.clone();
    }
    build.outcome.describe()
}

/// Returns the final result if the build ended the pipeline, `None` if the
/// run phase should follow.
pub fn classify_build(build: &PhaseOutput, timeout: Duration) -> Option<ExecutionResult> {
    match build.outcome {
        PhaseOutcome::ExitedZero => None,
        PhaseOutcome::TimedOut => Some(ExecutionResult {
            output: String::new(),
            error: timeout_message(timeout),
            execution_time: build.elapsed,
            status: ExecutionStatus::Timeout,
        }),
        PhaseOutcome::ExitedNonZero { .. } | PhaseOutcome::SpawnFailed { .. } => {
            Some(ExecutionResult {
                output: String::new(),
                error: build_diagnostics(build),
                execution_time: build.elapsed,
                status: ExecutionStatus::Error,
            })
        }
    }
}

/// `build_elapsed` is added so the reported time covers both phases.
pub fn classify_run(run: PhaseOutput, build_elapsed: Duration, timeout: Duration) -> ExecutionResult {
    let execution_time = build_elapsed + run.elapsed;
    match run.outcome {
        PhaseOutcome::ExitedZero => ExecutionResult {
            output: run.stdout,
            error: run.stderr,
            execution_time,
            status: ExecutionStatus::Success,
        },
        PhaseOutcome::TimedOut => ExecutionResult {
            output: run.stdout,
            error: timeout_message(timeout),
            execution_time,
            status: ExecutionStatus::Timeout,
        },
        PhaseOutcome::ExitedNonZero { .. } | PhaseOutcome::SpawnFailed { .. } => {
            let error = if run.stderr.is_empty() {
                run.outcome.describe()
            } else {
                run.stderr
            };
            ExecutionResult {
                output: run.stdout,
                error,
                execution_time,
                status: ExecutionStatus::Error,
            }
        }
    }
}

/// Result when the build used up the whole budget before the run could start.
pub fn budget_exhausted(build_elapsed: Duration, timeout: Duration) -> ExecutionResult {
    ExecutionResult {
        output: String::new(),
        error: timeout_message(timeout),
        execution_time: build_elapsed,
        status: ExecutionStatus::Timeout,
    }
}

pub fn classify_validation(check: &PhaseOutput, deadline: Duration) -> ValidationResult {
    match check.outcome {
        PhaseOutcome::ExitedZero => ValidationResult::valid(),
        PhaseOutcome::TimedOut => ValidationResult::invalid(format!(
            "Syntax check timed out after {}s",
            deadline.as_secs()
        )),
        PhaseOutcome::ExitedNonZero { .. } | PhaseOutcome::SpawnFailed { .. } => {
            ValidationResult::invalid(build_diagnostics(check))
        }
    }
}
