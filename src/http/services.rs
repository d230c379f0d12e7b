use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    constants::INTERNAL_ERROR_MSG,
    core::{
        domain::{ExecutionRequest, ExecutionResult, ValidationRequest, ValidationResult},
        pipeline::ExecutionEngine,
    },
    http::{
        mappers::RequestError,
        models::{
            ExecuteRequest, ExecuteResponse, HealthResponse, InfoResponse, ValidateRequest,
            ValidateResponse,
        },
    },
};

#[derive(Clone, Debug)]
pub struct AppState {
    engine: ExecutionEngine,
}

impl AppState {
    pub fn new(engine: ExecutionEngine) -> Self {
        Self { engine }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/execute", post(execute))
        .route("/validate", post(validate))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: state.engine.pipeline().language.service_name(),
    })
}

async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(state.engine.pipeline().into())
}

// The pipeline runs on its own task so a client that disconnects mid-request
// cannot cancel it between workspace creation and cleanup.

async fn execute(
    State(state): State<AppState>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<ExecuteResponse>, RequestError> {
    let Json(body) = payload?;
    let request: ExecutionRequest = body.try_into()?;

    let engine = state.engine.clone();
    let result = tokio::spawn(async move { engine.execute(request).await })
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Execution task failed: {}", e);
            ExecutionResult::rejected(INTERNAL_ERROR_MSG.to_string())
        });

    Ok(Json(result.into()))
}

async fn validate(
    State(state): State<AppState>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<ValidateResponse>, RequestError> {
    let Json(body) = payload?;
    let request: ValidationRequest = body.try_into()?;

    let engine = state.engine.clone();
    let result = tokio::spawn(async move { engine.validate(request).await })
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Validation task failed: {}", e);
            ValidationResult::invalid(INTERNAL_ERROR_MSG.to_string())
        });

    Ok(Json(result.into()))
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
