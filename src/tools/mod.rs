//! MCP tools exposing the repository map service
//!
//! The MCP surface has no per-call headers, so the credential is fixed when
//! the server starts and presented to the service on every tool call.

use rmcp::{model::*, tool, ServerHandler};
use serde_json::{Map, Value};

use crate::repomap::{ErrorEnvelope, RepoMapResponse};
use crate::services::RepoMapService;

#[derive(Clone)]
pub struct RepoMapTools {
    service: RepoMapService,
    credential: Option<String>,
}

impl RepoMapTools {
    /// # Parameters
    ///
    /// * `service` - The service every tool call is routed to
    /// * `credential` - API key presented on behalf of the MCP client
    pub fn new(service: RepoMapService, credential: Option<String>) -> Self {
        Self {
            service,
            credential,
        }
    }

    /// Runs a map request and renders the outcome as tool output
    pub async fn call_generate(&self, body: Value) -> String {
        match self
            .service
            .generate_map_from_value(self.credential.as_deref(), body)
            .await
        {
            Ok(result) => serde_json::to_string_pretty(&RepoMapResponse::from(result))
                .unwrap_or_else(|e| format!("InternalFailure: Failed to serialize response: {}", e)),
            Err(err) => {
                let envelope = ErrorEnvelope::from(err);
                format!(
                    "{}: {}",
                    envelope.status_class,
                    serde_json::to_string(&envelope.to_response())
                        .unwrap_or_else(|_| envelope.detail.clone())
                )
            }
        }
    }
}

#[tool(tool_box)]
impl ServerHandler for RepoMapTools {
    fn get_info(&self) -> ServerInfo {
        let instructions = "# Repository Map MCP Server

## Available Tools
- `generate_repo_map`: Clone a remote git repository and return a token-budgeted structural map of its source files

## Configuration keys
- `map_tokens` (integer, default 1024): target size of the map
- `max_context_window` (integer, default 8192): upper bound on context considered
- `map_mul_no_files` (number, default 8): multiplier used when no files are active
- `refresh` (string, default \"auto\"): recompute cadence of the mapping engine

Other keys are passed to the mapping engine unchanged.
"
        .to_string();

        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(instructions),
        }
    }
}

#[tool(tool_box)]
impl RepoMapTools {
    #[tool(
        description = "Generate a structural map of a remote git repository. Clones the repository into a temporary directory, maps every non-hidden file and removes the clone afterwards. Example usage: `{\"name\": \"generate_repo_map\", \"arguments\": {\"repository_url\": \"https://github.com/tacogips/gitcodes-mcp-test-1.git\"}}`. With configuration: `{\"name\": \"generate_repo_map\", \"arguments\": {\"repository_url\": \"https://github.com/serde-rs/serde\", \"config\": {\"map_tokens\": 2048}}}`"
    )]
    async fn generate_repo_map(
        &self,
        #[tool(param)]
        #[schemars(
            description = "Repository URL (required) - any URL git can clone, e.g. 'https://github.com/user/repo.git' or 'git@github.com:user/repo.git'."
        )]
        repository_url: String,

        #[tool(param)]
        #[schemars(
            description = "Mapping engine configuration (optional). Recognized keys: map_tokens (integer), max_context_window (integer), map_mul_no_files (number), refresh (string). Unknown keys are passed through."
        )]
        config: Option<Map<String, Value>>,
    ) -> String {
        let mut body = Map::new();
        body.insert("repository_url".to_string(), Value::String(repository_url));
        if let Some(config) = config {
            body.insert("config".to_string(), Value::Object(config));
        }

        self.call_generate(Value::Object(body)).await
    }
}
