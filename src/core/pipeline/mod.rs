//! The request pipeline shared by every language.
//!
//! `execute` and `validate` differ only in which phases they run; both go
//! through the same size check, admission, workspace lifecycle and panic
//! handling defined here.

use std::{future::Future, num::NonZeroUsize, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures::FutureExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::{
    constants::{INTERNAL_ERROR_MSG, MAX_TIMEOUT_SECONDS, MIN_TIMEOUT_SECONDS},
    core::traits::{
        runner::ProcessRunner,
        workspace::{Workspace, WorkspaceProvider},
    },
    languages::{LanguagePipeline, PhaseSettings},
};

pub mod executing;
pub mod validating;

#[derive(Clone, Debug)]
pub struct ExecutionEngine {
    pipeline: Arc<LanguagePipeline>,
    runner: Arc<dyn ProcessRunner>,
    workspaces: Arc<dyn WorkspaceProvider>,
    settings: PhaseSettings,
    admission: Option<Arc<Semaphore>>,
}

impl ExecutionEngine {
    pub fn new(
        pipeline: Arc<LanguagePipeline>,
        runner: Arc<dyn ProcessRunner>,
        workspaces: Arc<dyn WorkspaceProvider>,
        settings: PhaseSettings,
    ) -> Self {
        ExecutionEngine {
            pipeline,
            runner,
            workspaces,
            settings,
            admission: None,
        }
    }

    /// Caps how many requests may hold a workspace at once. Requests over
    /// the cap wait for a permit.
    pub fn with_max_concurrency(mut self, limit: Option<NonZeroUsize>) -> Self {
        self.admission = limit.map(|n| Arc::new(Semaphore::new(n.get())));
        self
    }

    pub fn pipeline(&self) -> &LanguagePipeline {
        &self.pipeline
    }

    /// Rejects code over the configured size, measured in bytes.
    pub fn check_size(&self, code: &str) -> Result<(), String> {
        let size = code.len() as u64;
        if size <= self.pipeline.max_code_size_bytes() {
            return Ok(());
        }
        Err(format!(
            "Code size ({:.1}KB) exceeds maximum allowed size ({}KB)",
            size as f64 / 1024.0,
            self.pipeline.limits.max_code_size_kb
        ))
    }

    /// The request's timeout, or the configured default, clamped to the
    /// allowed range.
    pub fn effective_timeout(&self, requested: Option<i64>) -> Duration {
        let default = i64::try_from(self.pipeline.limits.max_execution_time_seconds)
            .unwrap_or(MAX_TIMEOUT_SECONDS);
        let seconds = requested
            .unwrap_or(default)
            .clamp(MIN_TIMEOUT_SECONDS, MAX_TIMEOUT_SECONDS);
        Duration::from_secs(seconds as u64)
    }

    async fn admit(&self) -> Option<OwnedSemaphorePermit> {
        let semaphore = self.admission.clone()?;
        // The semaphore is never closed.
        semaphore.acquire_owned().await.ok()
    }

    /// Runs `work` inside a fresh workspace and destroys the workspace on
    /// every exit path, including a panic inside `work`. Failures to create
    /// the workspace or a caught panic are reported through `on_error`.
    async fn with_workspace<T, E, F, Fut>(&self, on_error: E, work: F) -> T
    where
        E: FnOnce(String) -> T,
        F: FnOnce(Workspace) -> Fut,
        Fut: Future<Output = T>,
    {
        let workspace = match self.workspaces.create().await {
            Ok(workspace) => workspace,
            Err(e) => {
                tracing::error!("Workspace creation failed: {}", e);
                return on_error(e.to_string());
            }
        };

        let outcome = AssertUnwindSafe(work(workspace.clone()))
            .catch_unwind()
            .await;

        if let Err(e) = self.workspaces.destroy(&workspace).await {
            tracing::warn!("Workspace cleanup failed: {}", e);
        }

        match outcome {
            Ok(value) => value,
            Err(_) => {
                tracing::error!(workspace = %workspace.id(), "Pipeline panicked");
                on_error(INTERNAL_ERROR_MSG.to_string())
            }
        }
    }
}
