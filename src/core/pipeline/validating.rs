use crate::{
    constants::VALIDATION_TIMEOUT,
    core::{
        classifier,
        domain::{ValidationRequest, ValidationResult},
        pipeline::ExecutionEngine,
        traits::workspace::Workspace,
    },
};

impl ExecutionEngine {
    /// Runs only the language's syntax check under a fixed deadline. The
    /// program itself is never started.
    #[tracing::instrument(skip_all, fields(language = %self.pipeline.language))]
    pub async fn validate(&self, request: ValidationRequest) -> ValidationResult {
        if let Err(msg) = self.check_size(&request.code) {
            return ValidationResult::invalid(msg);
        }

        let _permit = self.admit().await;

        let result = self
            .with_workspace(ValidationResult::invalid, |workspace| {
                self.check_syntax(workspace, request.code)
            })
            .await;

        tracing::info!(is_valid = result.is_valid, "Validation finished");
        result
    }

    #[tracing::instrument(skip_all, fields(workspace = %workspace.id()))]
    async fn check_syntax(&self, workspace: Workspace, code: String) -> ValidationResult {
        if let Err(e) = self.pipeline.prepare(&workspace, &code).await {
            tracing::error!("Failed to prepare sources: {}", e);
            return ValidationResult::invalid(e.to_string());
        }

        let check = self
            .pipeline
            .check_phase(&workspace, &self.settings, VALIDATION_TIMEOUT);
        let output = self.runner.run(check).await;
        tracing::debug!("Check result: {:?}", output.outcome);

        classifier::classify_validation(&output, VALIDATION_TIMEOUT)
    }
}
