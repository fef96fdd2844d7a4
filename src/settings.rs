//! Process level settings
//!
//! Values come from command line arguments first, then environment variables:
//!
//! | setting          | environment variable      | default                 |
//! |------------------|---------------------------|-------------------------|
//! | accepted keys    | `REPOMAP_API_KEYS`        | none (open mode)        |
//! | work directory   | `REPOMAP_WORK_DIR`        | system temp directory   |
//! | engine command   | `REPOMAP_ENGINE_COMMAND`  | none, required to serve |

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use crate::repomap::{
    ApiKeyGate, CommandMapEngine, GixCloner, MapGenerator, RepositoryAcquirer,
};
use crate::services::RepoMapService;

pub const API_KEYS_ENV: &str = "REPOMAP_API_KEYS";
pub const WORK_DIR_ENV: &str = "REPOMAP_WORK_DIR";
pub const ENGINE_COMMAND_ENV: &str = "REPOMAP_ENGINE_COMMAND";
pub const CLIENT_API_KEY_ENV: &str = "REPOMAP_CLIENT_API_KEY";

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_keys: HashSet<String>,
    pub work_dir: PathBuf,
    pub engine_command: Option<String>,
}

impl Settings {
    /// Resolves settings, falling back to the environment for anything not given
    pub fn resolve(
        api_keys: Vec<String>,
        work_dir: Option<PathBuf>,
        engine_command: Option<String>,
    ) -> Self {
        let api_keys = if api_keys.is_empty() {
            std::env::var(API_KEYS_ENV)
                .map(|keys| parse_api_keys(&keys))
                .unwrap_or_default()
        } else {
            api_keys
                .iter()
                .flat_map(|keys| parse_api_keys(keys))
                .collect()
        };

        let work_dir = work_dir
            .or_else(|| std::env::var(WORK_DIR_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(std::env::temp_dir);

        let engine_command =
            engine_command.or_else(|| std::env::var(ENGINE_COMMAND_ENV).ok());

        Self {
            api_keys,
            work_dir,
            engine_command,
        }
    }

    /// Makes sure the work directory exists and is a directory
    pub fn prepare_work_dir(&self) -> Result<()> {
        if !self.work_dir.exists() {
            std::fs::create_dir_all(&self.work_dir).with_context(|| {
                format!(
                    "Failed to create work directory {}",
                    self.work_dir.display()
                )
            })?;
        } else if !self.work_dir.is_dir() {
            return Err(anyhow!(
                "Specified path '{}' is not a directory",
                self.work_dir.display()
            ));
        }
        Ok(())
    }

    /// Wires the production collaborators into a service
    pub fn build_service(&self) -> Result<RepoMapService> {
        self.prepare_work_dir()?;

        let command = self.engine_command.as_deref().ok_or_else(|| {
            anyhow!(
                "No mapping engine configured. Pass --engine-command or set {}",
                ENGINE_COMMAND_ENV
            )
        })?;
        let engine = CommandMapEngine::from_command_line(command)?;

        let gate = ApiKeyGate::new(self.api_keys.clone());
        if gate.is_open() {
            tracing::warn!(
                "No API keys configured ({} is unset); any non-empty key is accepted",
                API_KEYS_ENV
            );
        }

        Ok(RepoMapService::new(
            gate,
            RepositoryAcquirer::new(Arc::new(GixCloner::new()), self.work_dir.clone()),
            MapGenerator::new(Arc::new(engine)),
        ))
    }
}

fn parse_api_keys(keys: &str) -> HashSet<String> {
    keys.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_keys() {
        let keys = parse_api_keys(" a, b ,,c");
        assert_eq!(
            keys,
            HashSet::from(["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn test_explicit_values_win() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::resolve(
            vec!["k1,k2".to_string()],
            Some(dir.path().to_path_buf()),
            Some("cat".to_string()),
        );
        assert_eq!(settings.api_keys.len(), 2);
        assert_eq!(settings.work_dir, dir.path());
        assert_eq!(settings.engine_command.as_deref(), Some("cat"));
        assert!(settings.build_service().is_ok());
    }

    #[test]
    fn test_work_dir_must_be_directory() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let settings = Settings::resolve(
            vec!["k".to_string()],
            Some(file.path().to_path_buf()),
            Some("cat".to_string()),
        );
        assert!(settings.prepare_work_dir().is_err());
    }

    #[test]
    fn test_missing_work_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        let settings = Settings::resolve(vec!["k".to_string()], Some(nested.clone()), None);
        settings.prepare_work_dir().unwrap();
        assert!(nested.is_dir());
        assert!(settings.build_service().is_err());
    }
}
