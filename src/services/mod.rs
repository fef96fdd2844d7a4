//! Repository map service
//!
//! [`RepoMapService`] runs one request through the pipeline:
//!
//! ```text
//! Start -> Authenticated -> Validated -> ConfigMerged -> RepoAcquired -> MapGenerated -> Responded
//! ```
//!
//! Any stage may end the run in `Failed`; the first failure is reported and no
//! later stage runs. Leaving `RepoAcquired` always removes the working copy.
//!
//! The service holds no per-request state and is cheap to clone, so transports
//! share one instance across concurrent requests.
//!
//! ```no_run
//! use std::sync::Arc;
//! use repomap_service::repomap::{
//!     ApiKeyGate, CommandMapEngine, GixCloner, MapGenerator, RepositoryAcquirer,
//! };
//! use repomap_service::services::RepoMapService;
//!
//! # async fn example() {
//! let service = RepoMapService::new(
//!     ApiKeyGate::open(),
//!     RepositoryAcquirer::new(Arc::new(GixCloner::new()), std::env::temp_dir()),
//!     MapGenerator::new(Arc::new(CommandMapEngine::new("repomap-engine", vec![]))),
//! );
//! let result = service
//!     .generate_map(Some("my-key"), br#"{"repository_url": "https://github.com/tacogips/gitcodes-mcp-test-1.git"}"#)
//!     .await;
//! # }
//! ```

use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::repomap::{
    merge, ApiKeyGate, MapGenerator, MapRequest, MapResult, PipelineError, PipelineResult,
    RepositoryAcquirer, DEFAULT_MAP_CONFIG,
};

/// States of a single pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum PipelineStage {
    Start,
    Authenticated,
    Validated,
    ConfigMerged,
    RepoAcquired,
    MapGenerated,
    Responded,
    Failed,
}

/// A pipeline failure together with the stage it left from
#[derive(Debug, Clone, PartialEq)]
pub struct StageFailure {
    pub stage: PipelineStage,
    pub error: PipelineError,
}

#[derive(Clone)]
pub struct RepoMapService {
    gate: ApiKeyGate,
    acquirer: RepositoryAcquirer,
    generator: MapGenerator,
}

impl RepoMapService {
    pub fn new(gate: ApiKeyGate, acquirer: RepositoryAcquirer, generator: MapGenerator) -> Self {
        Self {
            gate,
            acquirer,
            generator,
        }
    }

    pub fn gate(&self) -> &ApiKeyGate {
        &self.gate
    }

    /// Runs the pipeline for a raw JSON request body
    pub async fn generate_map(
        &self,
        credential: Option<&str>,
        body: &[u8],
    ) -> PipelineResult<MapResult> {
        self.run(credential, || MapRequest::from_body(body))
            .await
            .map_err(|failure| failure.error)
    }

    /// Runs the pipeline for an already parsed request body
    pub async fn generate_map_from_value(
        &self,
        credential: Option<&str>,
        body: Value,
    ) -> PipelineResult<MapResult> {
        self.run(credential, move || MapRequest::from_value(body))
            .await
            .map_err(|failure| failure.error)
    }

    /// Runs the pipeline, reporting the stage a failure left from
    ///
    /// `validate` is only called once the credential has been accepted.
    pub async fn run<F>(
        &self,
        credential: Option<&str>,
        validate: F,
    ) -> Result<MapResult, StageFailure>
    where
        F: FnOnce() -> PipelineResult<MapRequest>,
    {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "repomap.generate",
            request_id = %request_id,
            repository_url = tracing::field::Empty,
        );

        async move {
            let result = self.execute(credential, validate).await;
            match &result {
                Ok(_) => {
                    tracing::info!(stage = %PipelineStage::Responded, "Repository map generated")
                }
                Err(failure) => tracing::warn!(
                    stage = %PipelineStage::Failed,
                    failed_after = %failure.stage,
                    kind = %failure.error.kind(),
                    "Repository map request failed: {}",
                    failure.error
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute<F>(
        &self,
        credential: Option<&str>,
        validate: F,
    ) -> Result<MapResult, StageFailure>
    where
        F: FnOnce() -> PipelineResult<MapRequest>,
    {
        let mut stage = PipelineStage::Start;

        self.gate.authenticate(credential).map_err(failed_at(stage))?;
        advance(&mut stage, PipelineStage::Authenticated);

        let request = validate().map_err(failed_at(stage))?;
        tracing::Span::current().record("repository_url", request.repository_url.as_str());
        advance(&mut stage, PipelineStage::Validated);

        let resolved = merge(&DEFAULT_MAP_CONFIG, &request.config);
        advance(&mut stage, PipelineStage::ConfigMerged);

        let repository = self
            .acquirer
            .acquire(request.clone_url())
            .await
            .map_err(failed_at(stage))?;
        advance(&mut stage, PipelineStage::RepoAcquired);

        let generated = self.generator.generate(repository.path(), &resolved).await;

        let repository_dir = repository.path().to_path_buf();
        if let Err(e) = repository.close() {
            tracing::warn!(
                "Failed to remove working copy {}: {}",
                repository_dir.display(),
                e
            );
        }

        let content = generated.map_err(failed_at(stage))?;
        advance(&mut stage, PipelineStage::MapGenerated);

        Ok(MapResult {
            content,
            repository_url: request.repository_url,
            config: request.config.raw().clone(),
        })
    }
}

fn failed_at(stage: PipelineStage) -> impl FnOnce(PipelineError) -> StageFailure {
    move |error| StageFailure { stage, error }
}

fn advance(stage: &mut PipelineStage, next: PipelineStage) {
    tracing::debug!("Pipeline stage {} -> {}", stage, next);
    *stage = next;
}
