//! Map generation over an acquired repository
//!
//! This adapter only selects files and forwards the resolved configuration.
//! Ranking, truncation and token budgeting belong to the [`MapEngine`].

mod command_engine;

pub use command_engine::CommandMapEngine;

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use serde::Serialize;
use walkdir::WalkDir;

use super::error::{PipelineError, PipelineResult};
use super::map_config::MapConfig;
use super::repository_acquirer::InterruptOnDrop;

/// Marker byte that starts the name of a hidden file
pub const HIDDEN_FILE_MARKER: u8 = b'.';

/// Everything the mapping engine receives for one map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapEngineRequest {
    /// Root of the working copy
    pub root: PathBuf,
    /// Files currently open/active; always empty for this service
    pub chat_files: Vec<PathBuf>,
    /// Candidate files to map
    pub other_files: Vec<PathBuf>,
    pub mentioned_fnames: BTreeSet<String>,
    pub mentioned_idents: BTreeSet<String>,
    pub config: MapConfig,
}

/// External mapping engine
///
/// Runs on the blocking pool. `Ok(None)` means the engine produced nothing.
/// `interrupt` is raised when the requesting pipeline goes away; engines
/// doing long work should poll it and stop.
pub trait MapEngine: Send + Sync {
    fn get_repo_map(
        &self,
        request: &MapEngineRequest,
        interrupt: &AtomicBool,
    ) -> anyhow::Result<Option<String>>;
}

fn is_hidden(file_name: &OsStr) -> bool {
    file_name.as_encoded_bytes().first() == Some(&HIDDEN_FILE_MARKER)
}

/// Lists every non-hidden file below `root`
///
/// All directories are descended, including hidden ones; only the file's own
/// name is checked against [`HIDDEN_FILE_MARKER`]. Symlinks are not followed.
/// Paths that are not valid UTF-8 cannot be handed to the engine and are
/// skipped with a warning. Output is ordered by path for stable engine input.
pub fn collect_source_files(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if is_hidden(entry.file_name()) {
            continue;
        }
        if entry.path().to_str().is_none() {
            tracing::warn!(
                "Skipping file with non UTF-8 path: {}",
                entry.path().display()
            );
            continue;
        }
        files.push(entry.into_path());
    }

    Ok(files)
}

/// Generates maps by delegating to a [`MapEngine`]
#[derive(Clone)]
pub struct MapGenerator {
    engine: Arc<dyn MapEngine>,
}

impl MapGenerator {
    pub fn new(engine: Arc<dyn MapEngine>) -> Self {
        Self { engine }
    }

    /// Builds the map of the repository at `repository_path`
    ///
    /// # Errors
    ///
    /// `PipelineError::MapGeneration` when enumeration fails, the engine fails
    /// or panics, or the engine returns an empty map.
    ///
    /// Dropping the returned future raises the engine's interrupt flag.
    pub async fn generate(
        &self,
        repository_path: &Path,
        config: &MapConfig,
    ) -> PipelineResult<String> {
        let engine = self.engine.clone();
        let root = repository_path.to_path_buf();
        let config = config.clone();

        let interrupt = Arc::new(AtomicBool::new(false));
        let _interrupt_guard = InterruptOnDrop(interrupt.clone());

        let outcome = tokio::task::spawn_blocking(move || {
            let other_files = collect_source_files(&root)?;
            tracing::debug!(
                "Collected {} candidate files under {}",
                other_files.len(),
                root.display()
            );

            let request = MapEngineRequest {
                root,
                chat_files: Vec::new(),
                other_files,
                mentioned_fnames: BTreeSet::new(),
                mentioned_idents: BTreeSet::new(),
                config,
            };
            engine.get_repo_map(&request, &interrupt)
        })
        .await;

        let map = match outcome {
            Ok(Ok(map)) => map,
            Ok(Err(e)) => {
                tracing::error!("Error in map generation: {:#}", e);
                return Err(PipelineError::generation(&e));
            }
            Err(e) if e.is_panic() => {
                tracing::error!("Mapping engine panicked: {}", e);
                return Err(PipelineError::MapGeneration(
                    "mapping engine panicked".to_string(),
                ));
            }
            Err(e) => {
                return Err(PipelineError::Unexpected(format!(
                    "map generation task failed: {}",
                    e
                )));
            }
        };

        match map {
            Some(content) if !content.is_empty() => Ok(content),
            _ => Err(PipelineError::MapGeneration(
                "mapping engine returned an empty map".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_hidden() {
        assert!(is_hidden(OsStr::new(".env")));
        assert!(is_hidden(OsStr::new(".")));
        assert!(!is_hidden(OsStr::new("main.rs")));
        assert!(!is_hidden(OsStr::new("dir.d")));
        assert!(!is_hidden(OsStr::new("")));
    }

    #[cfg(unix)]
    #[test]
    fn test_is_hidden_non_utf8_name() {
        use std::os::unix::ffi::OsStrExt;

        assert!(is_hidden(OsStr::from_bytes(b".caf\xe9")));
        assert!(!is_hidden(OsStr::from_bytes(b"caf\xe9.rs")));
    }
}
