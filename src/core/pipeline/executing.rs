use std::time::Duration;

use crate::core::{
    classifier,
    domain::{ExecutionRequest, ExecutionResult},
    pipeline::ExecutionEngine,
    traits::workspace::Workspace,
};

impl ExecutionEngine {
    /// Runs the full pipeline: size check, prepare, build (compiled
    /// languages only), run, classify. Never fails: every error is reported
    /// inside the result.
    #[tracing::instrument(skip_all, fields(language = %self.pipeline.language))]
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        if let Err(msg) = self.check_size(&request.code) {
            tracing::info!("Rejected: {}", msg);
            return ExecutionResult::rejected(msg);
        }

        let timeout = self.effective_timeout(request.timeout_seconds);
        let _permit = self.admit().await;

        let result = self
            .with_workspace(ExecutionResult::rejected, |workspace| {
                self.run_pipeline(workspace, request, timeout)
            })
            .await;

        tracing::info!(
            status = ?result.status,
            elapsed = ?result.execution_time,
            "Execution finished"
        );
        result
    }

    #[tracing::instrument(skip_all, fields(workspace = %workspace.id()))]
    async fn run_pipeline(
        &self,
        workspace: Workspace,
        request: ExecutionRequest,
        timeout: Duration,
    ) -> ExecutionResult {
        if let Err(e) = self.pipeline.prepare(&workspace, &request.code).await {
            tracing::error!("Failed to prepare sources: {}", e);
            return ExecutionResult::rejected(e.to_string());
        }

        let mut build_elapsed = Duration::ZERO;
        if let Some(build) = self.pipeline.build_phase(&workspace, &self.settings, timeout) {
            tracing::debug!("Start building");
            let output = self.runner.run(build).await;
            tracing::debug!("Build result: {:?}", output.outcome);

            if let Some(result) = classifier::classify_build(&output, timeout) {
                return result;
            }
            build_elapsed = output.elapsed;
        }

        // Build and run share one budget.
        let remaining = timeout.saturating_sub(build_elapsed);
        if remaining.is_zero() {
            return classifier::budget_exhausted(build_elapsed, timeout);
        }

        let run = self.pipeline.run_phase(
            &workspace,
            &self.settings,
            &request.input_data,
            remaining,
        );
        tracing::debug!("Start running");
        let output = self.runner.run(run).await;
        tracing::debug!("Run result: {:?}", output.outcome);

        classifier::classify_run(output, build_elapsed, timeout)
    }
}
