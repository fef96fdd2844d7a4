//! Error taxonomy for the map generation pipeline
//!
//! Every pipeline stage returns a [`PipelineError`] whose variant identifies the
//! stage that failed. The variant decides the externally visible
//! [`StatusClass`]; the `Display` text becomes the `detail` of the error
//! envelope, so it must never carry a raw debug dump of an internal error.

use thiserror::Error;

/// Kind of failure, one per pipeline stage that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ErrorKind {
    #[strum(serialize = "CredentialError")]
    Credential,
    #[strum(serialize = "RequestShapeError")]
    RequestShape,
    #[strum(serialize = "RepositoryAcquisitionError")]
    RepositoryAcquisition,
    #[strum(serialize = "MapGenerationError")]
    MapGeneration,
    #[strum(serialize = "UnexpectedError")]
    Unexpected,
}

/// External status class reported to callers
///
/// `TooManyRequests` is reserved for a rate limiter in front of the service and
/// is never produced by the pipeline itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum StatusClass {
    Unauthorized,
    UnprocessableEntity,
    TooManyRequests,
    InternalFailure,
}

impl StatusClass {
    /// HTTP status code for this class
    pub fn http_status_code(&self) -> u16 {
        match self {
            StatusClass::Unauthorized => 401,
            StatusClass::UnprocessableEntity => 422,
            StatusClass::TooManyRequests => 429,
            StatusClass::InternalFailure => 500,
        }
    }
}

/// Failure of a single pipeline run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Credential absent, blank, or rejected
    #[error("{0}")]
    Credential(String),

    /// Request body or a recognized config field is malformed
    #[error("{0}")]
    RequestShape(String),

    /// The remote repository could not be cloned
    #[error("Failed to clone repository: {0}")]
    RepositoryAcquisition(String),

    /// The mapping engine failed or returned nothing
    #[error("Failed to generate repository map: {0}")]
    MapGeneration(String),

    /// Anything not covered above
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Credential(_) => ErrorKind::Credential,
            PipelineError::RequestShape(_) => ErrorKind::RequestShape,
            PipelineError::RepositoryAcquisition(_) => ErrorKind::RepositoryAcquisition,
            PipelineError::MapGeneration(_) => ErrorKind::MapGeneration,
            PipelineError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    pub fn status_class(&self) -> StatusClass {
        match self.kind() {
            ErrorKind::Credential => StatusClass::Unauthorized,
            ErrorKind::RequestShape => StatusClass::UnprocessableEntity,
            ErrorKind::RepositoryAcquisition
            | ErrorKind::MapGeneration
            | ErrorKind::Unexpected => StatusClass::InternalFailure,
        }
    }

    /// Wraps a collaborator error raised while cloning
    ///
    /// The alternate formatting keeps the `anyhow` context chain on a single line.
    pub fn acquisition(err: &anyhow::Error) -> Self {
        PipelineError::RepositoryAcquisition(format!("{:#}", err))
    }

    /// Wraps a collaborator error raised while generating the map
    pub fn generation(err: &anyhow::Error) -> Self {
        PipelineError::MapGeneration(format!("{:#}", err))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_class_mapping() {
        assert_eq!(
            PipelineError::Credential("API key is required".into()).status_class(),
            StatusClass::Unauthorized
        );
        assert_eq!(
            PipelineError::RequestShape("bad".into()).status_class(),
            StatusClass::UnprocessableEntity
        );
        for err in [
            PipelineError::RepositoryAcquisition("x".into()),
            PipelineError::MapGeneration("x".into()),
            PipelineError::Unexpected("x".into()),
        ] {
            assert_eq!(err.status_class(), StatusClass::InternalFailure);
        }
    }

    #[test]
    fn test_stage_prefixes() {
        let err = PipelineError::acquisition(&anyhow::anyhow!("connection refused"));
        assert_eq!(
            err.to_string(),
            "Failed to clone repository: connection refused"
        );

        let err = PipelineError::generation(
            &anyhow::anyhow!("exit status 2").context("engine crashed"),
        );
        assert_eq!(
            err.to_string(),
            "Failed to generate repository map: engine crashed: exit status 2"
        );
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::Credential.to_string(), "CredentialError");
        assert_eq!(
            PipelineError::MapGeneration("x".into()).kind().to_string(),
            "MapGenerationError"
        );
        assert_eq!(StatusClass::TooManyRequests.http_status_code(), 429);
    }
}
