use crate::core::domain::{PhaseCommand, PhaseOutput};

/// Runs one build or run phase to completion.
///
/// Implementations never fail in the `Result` sense: a subprocess that
/// cannot be started is reported as `PhaseOutcome::SpawnFailed`, and a
/// phase that outlives its deadline is killed together with every process
/// in its group before `run` returns.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProcessRunner: std::fmt::Debug + Send + Sync {
    async fn run(&self, command: PhaseCommand) -> PhaseOutput;
}
