//! Success and error envelopes returned to callers

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{PipelineError, StatusClass};

/// Result of a successful pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct MapResult {
    pub content: String,
    pub repository_url: String,
    /// Config exactly as supplied by the caller, empty when none was sent
    pub config: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMetadata {
    pub repo_url: String,
    pub config: Map<String, Value>,
}

/// Wire form of a successful response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoMapResponse {
    pub repo_map: String,
    pub metadata: MapMetadata,
}

impl From<MapResult> for RepoMapResponse {
    fn from(result: MapResult) -> Self {
        Self {
            repo_map: result.content,
            metadata: MapMetadata {
                repo_url: result.repository_url,
                config: result.config,
            },
        }
    }
}

/// Failure of a pipeline run, ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEnvelope {
    pub status_class: StatusClass,
    pub detail: String,
}

/// Wire form of an error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl From<&PipelineError> for ErrorEnvelope {
    fn from(err: &PipelineError) -> Self {
        Self {
            status_class: err.status_class(),
            detail: err.to_string(),
        }
    }
}

impl From<PipelineError> for ErrorEnvelope {
    fn from(err: PipelineError) -> Self {
        Self::from(&err)
    }
}

impl ErrorEnvelope {
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            detail: self.detail.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_wire_format() {
        let response = RepoMapResponse::from(MapResult {
            content: "X".to_string(),
            repository_url: "https://example.com/r.git".to_string(),
            config: Map::new(),
        });
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "repo_map": "X",
                "metadata": {"repo_url": "https://example.com/r.git", "config": {}}
            })
        );
    }

    #[test]
    fn test_error_envelope() {
        let envelope = ErrorEnvelope::from(PipelineError::MapGeneration("empty".into()));
        assert_eq!(envelope.status_class, StatusClass::InternalFailure);
        assert_eq!(
            serde_json::to_value(envelope.to_response()).unwrap(),
            json!({"detail": "Failed to generate repository map: empty"})
        );
    }
}
