//! Ephemeral repository acquisition
//!
//! Every request clones into its own freshly created directory under the
//! manager's work directory. The directory is owned by an
//! [`EphemeralRepository`] and removed when that value is dropped, which
//! covers success, stage errors, panics and cancellation of the request future.

mod git_cloner;

pub use git_cloner::GixCloner;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tempfile::TempDir;

use super::error::{PipelineError, PipelineResult};

/// Capability to clone a remote repository into a local directory
///
/// Implementations block; the acquirer runs them on the blocking thread pool.
/// `interrupt` is raised when the requesting pipeline goes away and should be
/// polled by long running transfers.
pub trait RepositoryCloner: Send + Sync {
    fn clone_repository(
        &self,
        url: &str,
        destination: &Path,
        interrupt: &AtomicBool,
    ) -> anyhow::Result<()>;
}

/// A request-scoped working copy of a remote repository
///
/// Dropping it deletes the directory tree.
#[derive(Debug)]
pub struct EphemeralRepository {
    dir: TempDir,
}

impl EphemeralRepository {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Removes the working copy now, reporting failures instead of ignoring them
    pub fn close(self) -> std::io::Result<()> {
        self.dir.close()
    }
}

/// Raises the interrupt flag when the owning scope is left
pub(crate) struct InterruptOnDrop(pub(crate) Arc<AtomicBool>);

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Creates ephemeral repositories
#[derive(Clone)]
pub struct RepositoryAcquirer {
    cloner: Arc<dyn RepositoryCloner>,
    work_dir: PathBuf,
}

impl RepositoryAcquirer {
    /// Prefix of every directory created by the acquirer
    pub const REPOSITORY_DIR_PREFIX: &'static str = "repomap_";

    pub fn new(cloner: Arc<dyn RepositoryCloner>, work_dir: PathBuf) -> Self {
        Self { cloner, work_dir }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Clones `url` into a new uniquely named directory
    ///
    /// The clone runs on the blocking pool so it never holds up other requests.
    /// If the returned future is dropped mid-clone, the interrupt flag is raised
    /// and the directory is removed once the cloner has returned.
    ///
    /// # Errors
    ///
    /// `PipelineError::RepositoryAcquisition` when the directory cannot be
    /// created or the clone fails, `PipelineError::Unexpected` when the clone
    /// task panics.
    pub async fn acquire(&self, url: &str) -> PipelineResult<EphemeralRepository> {
        let dir = tempfile::Builder::new()
            .prefix(Self::REPOSITORY_DIR_PREFIX)
            .tempdir_in(&self.work_dir)
            .map_err(|e| {
                PipelineError::RepositoryAcquisition(format!(
                    "unable to create working directory in {}: {}",
                    self.work_dir.display(),
                    e
                ))
            })?;

        let interrupt = Arc::new(AtomicBool::new(false));
        let _interrupt_guard = InterruptOnDrop(interrupt.clone());

        tracing::info!("Cloning repository {} into {}", url, dir.path().display());

        // The blocking task owns `dir` until the cloner returns. A cancelled
        // acquisition drops the task output, so removal never races the clone.
        let cloner = self.cloner.clone();
        let url_owned = url.to_string();
        let (dir, clone_result) = tokio::task::spawn_blocking(move || {
            let result = cloner.clone_repository(&url_owned, dir.path(), &interrupt);
            (dir, result)
        })
        .await
        .map_err(|e| PipelineError::Unexpected(format!("clone task failed: {}", e)))?;

        if let Err(e) = clone_result {
            tracing::error!("Error cloning repository {}: {:#}", url, e);
            drop(dir);
            return Err(PipelineError::acquisition(&e));
        }

        Ok(EphemeralRepository { dir })
    }
}
