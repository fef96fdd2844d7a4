//! Building blocks of the repository map pipeline
//!
//! - [`auth`]: credential gate
//! - [`request`]: request body validation
//! - [`map_config`]: engine configuration and the shallow config merger
//! - [`repository_acquirer`]: request-scoped clones of remote repositories
//! - [`map_generator`]: file selection and delegation to the mapping engine
//! - [`error`] and [`response`]: error taxonomy and response envelopes

pub mod auth;
pub mod error;
pub mod map_config;
pub mod map_generator;
pub mod repository_acquirer;
pub mod request;
pub mod response;

pub use auth::ApiKeyGate;
pub use error::{ErrorKind, PipelineError, PipelineResult, StatusClass};
pub use map_config::{merge, ConfigOverrides, MapConfig, DEFAULT_MAP_CONFIG};
pub use map_generator::{
    collect_source_files, CommandMapEngine, MapEngine, MapEngineRequest, MapGenerator,
};
pub use repository_acquirer::{
    EphemeralRepository, GixCloner, RepositoryAcquirer, RepositoryCloner,
};
pub use request::MapRequest;
pub use response::{ErrorEnvelope, ErrorResponse, MapMetadata, MapResult, RepoMapResponse};
