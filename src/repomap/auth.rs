//! Credential gate run before any other request work

use std::collections::HashSet;

use super::error::{PipelineError, PipelineResult};

/// Credential value that is always rejected
pub const INVALID_CREDENTIAL_SENTINEL: &str = "invalid-key";

/// API key gate
///
/// With an empty key set the gate runs in open mode: any non-blank credential
/// other than [`INVALID_CREDENTIAL_SENTINEL`] is accepted. Otherwise the
/// credential must be one of the configured keys.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyGate {
    accepted_keys: HashSet<String>,
}

impl ApiKeyGate {
    pub fn new(accepted_keys: HashSet<String>) -> Self {
        Self { accepted_keys }
    }

    /// Gate that accepts any plausible credential
    pub fn open() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.accepted_keys.is_empty()
    }

    /// Checks the caller credential and hands it back on success
    ///
    /// Pure check: no I/O, no logging of the credential value.
    pub fn authenticate<'a>(&self, credential: Option<&'a str>) -> PipelineResult<&'a str> {
        let credential = match credential.map(str::trim) {
            Some(c) if !c.is_empty() => c,
            _ => return Err(PipelineError::Credential("API key is required".to_string())),
        };

        if credential == INVALID_CREDENTIAL_SENTINEL {
            return Err(PipelineError::Credential("Invalid API key".to_string()));
        }

        if !self.is_open() && !self.accepted_keys.contains(credential) {
            return Err(PipelineError::Credential("Invalid API key".to_string()));
        }

        Ok(credential)
    }
}
