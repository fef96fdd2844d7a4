//! Request body validation
//!
//! Bodies are parsed from raw JSON rather than through a derived
//! `Deserialize` so the pipeline decides when validation happens (after the
//! credential check) and which message a caller sees.

use serde_json::{Map, Value};

use super::error::{PipelineError, PipelineResult};
use super::map_config::{json_type_name, ConfigOverrides};

pub const REPOSITORY_URL_FIELD: &str = "repository_url";
/// Field name accepted for older clients
pub const REPOSITORY_URL_ALIAS: &str = "repo_url";
pub const CONFIG_FIELD: &str = "config";

/// A validated map request
#[derive(Debug, Clone, PartialEq)]
pub struct MapRequest {
    /// The URL exactly as the caller sent it
    pub repository_url: String,
    pub config: ConfigOverrides,
}

impl MapRequest {
    /// The URL handed to the cloner, without surrounding whitespace
    pub fn clone_url(&self) -> &str {
        self.repository_url.trim()
    }

    /// Validates a raw request body
    ///
    /// # Errors
    ///
    /// `PipelineError::RequestShape` when the body is not a JSON object, the
    /// repository URL is missing, null, blank or not a string, `config` is
    /// neither an object nor null, or a recognized config key has the wrong type.
    pub fn from_body(body: &[u8]) -> PipelineResult<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| PipelineError::RequestShape(format!("Malformed JSON body: {}", e)))?;
        Self::from_value(value)
    }

    /// Validates an already parsed request body
    pub fn from_value(value: Value) -> PipelineResult<Self> {
        let mut body = match value {
            Value::Object(map) => map,
            other => {
                return Err(PipelineError::RequestShape(format!(
                    "Request body must be an object, got {}",
                    json_type_name(&other)
                )));
            }
        };

        let repository_url = take_repository_url(&mut body)?;

        let config = match body.remove(CONFIG_FIELD) {
            None | Some(Value::Null) => ConfigOverrides::default(),
            Some(Value::Object(map)) => ConfigOverrides::from_map(map)?,
            Some(other) => {
                return Err(PipelineError::RequestShape(format!(
                    "config must be an object, got {}",
                    json_type_name(&other)
                )));
            }
        };

        Ok(Self {
            repository_url,
            config,
        })
    }
}

fn take_repository_url(body: &mut Map<String, Value>) -> PipelineResult<String> {
    let value = match body.remove(REPOSITORY_URL_FIELD) {
        Some(Value::Null) | None => body.remove(REPOSITORY_URL_ALIAS),
        found => found,
    };

    match value {
        None | Some(Value::Null) => Err(PipelineError::RequestShape(format!(
            "{} is required",
            REPOSITORY_URL_FIELD
        ))),
        Some(Value::String(url)) => {
            if url.trim().is_empty() {
                Err(PipelineError::RequestShape(format!(
                    "{} must not be empty",
                    REPOSITORY_URL_FIELD
                )))
            } else {
                Ok(url)
            }
        }
        Some(other) => Err(PipelineError::RequestShape(format!(
            "{} must be a string, got {}",
            REPOSITORY_URL_FIELD,
            json_type_name(&other)
        ))),
    }
}
