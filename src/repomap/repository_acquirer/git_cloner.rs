use std::path::Path;
use std::sync::atomic::AtomicBool;

use anyhow::{anyhow, Context};
use gix::{bstr::ByteSlice, progress::Discard};

use super::RepositoryCloner;

const SUPPORTED_URL_PREFIXES: [&str; 6] =
    ["https://", "http://", "git://", "ssh://", "git@", "file://"];

/// Clones repositories with gix
///
/// Performs a full clone (all history, default branch checked out) using an
/// isolated git configuration so host-level settings don't leak in.
#[derive(Debug, Clone, Default)]
pub struct GixCloner;

impl GixCloner {
    pub fn new() -> Self {
        Self
    }
}

impl RepositoryCloner for GixCloner {
    fn clone_repository(
        &self,
        url: &str,
        destination: &Path,
        interrupt: &AtomicBool,
    ) -> anyhow::Result<()> {
        if !SUPPORTED_URL_PREFIXES
            .iter()
            .any(|prefix| url.starts_with(prefix))
        {
            return Err(anyhow!("Invalid Git URL format: {}", url));
        }

        let options = gix::open::Options::isolated().config_overrides(["protocol.version=2"]);

        let mut prepare = gix::clone::PrepareFetch::new(
            url.as_bytes().as_bstr(),
            destination,
            gix::create::Kind::WithWorktree,
            gix::create::Options::default(),
            options,
        )
        .context("unable to prepare clone")?;

        let (mut checkout, _outcome) = prepare
            .fetch_then_checkout(Discard, interrupt)
            .context("fetch failed")?;

        let (_repo, _stats) = checkout
            .main_worktree(Discard, interrupt)
            .context("checkout failed")?;

        if !destination.join(".git").exists() {
            return Err(anyhow!(
                "clone appears to be incomplete at {}",
                destination.display()
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unknown_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let interrupt = AtomicBool::new(false);
        let err = GixCloner::new()
            .clone_repository("ftp://example.com/r.git", dir.path(), &interrupt)
            .unwrap_err();
        assert!(err.to_string().contains("Invalid Git URL format"));
    }

    #[test]
    fn test_nonexistent_local_repository_fails() {
        let source = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let url = format!("file://{}/missing", source.path().display());
        let interrupt = AtomicBool::new(false);
        assert!(
            GixCloner::new()
                .clone_repository(&url, dest.path(), &interrupt)
                .is_err()
        );
    }
}
