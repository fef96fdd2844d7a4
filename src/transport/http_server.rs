use std::net::SocketAddr;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::repomap::{ErrorEnvelope, ErrorResponse, PipelineError, RepoMapResponse};
use crate::services::RepoMapService;

/// Header carrying the caller credential
pub const API_KEY_HEADER: &str = "x-api-key";

pub const GENERATE_PATH: &str = "/api/v1/repomap/generate";
pub const HEALTH_PATH: &str = "/health";

/// Builds the HTTP routes around a service instance
pub fn router(service: RepoMapService) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(GENERATE_PATH, post(generate_repo_map))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

/// Generates a repository map
///
/// The body is taken as raw bytes so the credential is checked before the body
/// is parsed and so malformed JSON is reported as 422 like any other shape error.
async fn generate_repo_map(
    State(service): State<RepoMapService>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<RepoMapResponse>, (StatusCode, Json<ErrorResponse>)> {
    let credential = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    service
        .generate_map(credential, &body)
        .await
        .map(|result| Json(RepoMapResponse::from(result)))
        .map_err(error_response)
}

fn error_response(err: PipelineError) -> (StatusCode, Json<ErrorResponse>) {
    let envelope = ErrorEnvelope::from(err);
    let status = StatusCode::from_u16(envelope.status_class.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(envelope.to_response()))
}

pub struct HttpServerApp {
    bind_addr: SocketAddr,
    service: RepoMapService,
}

impl HttpServerApp {
    pub fn new(bind_addr: SocketAddr, service: RepoMapService) -> Self {
        Self { bind_addr, service }
    }

    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;
        tracing::info!("Repository map server listening on {}", listener.local_addr()?);

        axum::serve(listener, router(self.service))
            // Wait for Ctrl+C signal to gracefully shutdown
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for shutdown signal: {}", e);
                    std::future::pending::<()>().await;
                }
            })
            .await?;

        Ok(())
    }
}
