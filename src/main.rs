use std::panic;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::config::ServiceConfig;
use crate::core::pipeline::ExecutionEngine;
use crate::http::services::{AppState, router, shutdown_signal};
use crate::languages::LanguagePipeline;
use crate::native::{runner::NativeProcessRunner, workspace::TempWorkspaceManager};

mod config;
mod constants;
mod core;
mod http;
mod languages;
mod native;

#[cfg(test)]
mod integration_test;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    set_panic_hook();

    let config = ServiceConfig::parse();
    tracing::debug!("Configuration: {:?}", config);

    let pipeline = LanguagePipeline::for_language(config.language, config.pipeline_limits())
        .with_host_env(|key| std::env::var(key).ok());
    let workspaces = TempWorkspaceManager::new(config.workspace_root());
    tracing::info!(
        language = %config.language,
        version = pipeline.version,
        build = ?pipeline.build_command().map(|cmd| cmd.command_line()),
        run = %pipeline.run_command().command_line(),
        workspace_root = %workspaces.root().display(),
        "Language pipeline loaded"
    );

    let engine = ExecutionEngine::new(
        Arc::new(pipeline),
        Arc::new(NativeProcessRunner::new()),
        Arc::new(workspaces),
        config.phase_settings(),
    )
    .with_max_concurrency(config.max_concurrency);

    let listener = TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(
        "{} listening on {}",
        config.language.service_name(),
        listener.local_addr()?
    );

    axum::serve(listener, router(AppState::new(engine)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
