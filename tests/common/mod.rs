//! Test doubles for the cloner and mapping engine ports

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use repomap_service::repomap::{
    ApiKeyGate, MapEngine, MapEngineRequest, MapGenerator, RepositoryAcquirer, RepositoryCloner,
};
use repomap_service::services::RepoMapService;

pub const VALID_KEY: &str = "test-key";
pub const REPO_URL: &str = "https://example.com/r.git";

/// What the fake cloner does once called
#[derive(Clone)]
pub enum CloneBehavior {
    /// Writes the given relative files into the destination
    Files(Vec<&'static str>),
    /// Fails like a transport error would
    Fail(&'static str),
    /// Blocks until interrupted
    Hang,
}

pub struct FakeCloner {
    behavior: CloneBehavior,
    pub destinations: Mutex<Vec<PathBuf>>,
    pub urls: Mutex<Vec<String>>,
    pub interrupted: AtomicBool,
}

impl FakeCloner {
    pub fn new(behavior: CloneBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            destinations: Mutex::new(Vec::new()),
            urls: Mutex::new(Vec::new()),
            interrupted: AtomicBool::new(false),
        })
    }

    pub fn call_count(&self) -> usize {
        self.destinations.lock().unwrap().len()
    }

    pub fn destinations(&self) -> Vec<PathBuf> {
        self.destinations.lock().unwrap().clone()
    }
}

impl RepositoryCloner for FakeCloner {
    fn clone_repository(
        &self,
        url: &str,
        destination: &Path,
        interrupt: &AtomicBool,
    ) -> anyhow::Result<()> {
        self.urls.lock().unwrap().push(url.to_string());
        self.destinations
            .lock()
            .unwrap()
            .push(destination.to_path_buf());

        match &self.behavior {
            CloneBehavior::Files(files) => {
                for file in files {
                    let path = destination.join(file);
                    std::fs::create_dir_all(path.parent().unwrap())?;
                    std::fs::write(&path, format!("// {}\n", file))?;
                }
                Ok(())
            }
            CloneBehavior::Fail(message) => Err(anyhow!("{}", message)),
            CloneBehavior::Hang => {
                std::fs::write(destination.join("partial.pack"), b"partial")?;
                while !interrupt.load(Ordering::SeqCst) {
                    std::thread::sleep(Duration::from_millis(10));
                }
                self.interrupted.store(true, Ordering::SeqCst);
                Err(anyhow!("interrupted"))
            }
        }
    }
}

/// Mapping engine returning a fixed answer and recording what it was given
pub struct StubEngine {
    answer: Result<Option<String>, String>,
    panic: bool,
    pub requests: Mutex<Vec<MapEngineRequest>>,
}

impl StubEngine {
    pub fn returning(map: &str) -> Arc<Self> {
        Self::with_answer(Ok(Some(map.to_string())))
    }

    pub fn with_answer(answer: Result<Option<String>, String>) -> Arc<Self> {
        Arc::new(Self {
            answer,
            panic: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn panicking() -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(None),
            panic: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn last_request(&self) -> Option<MapEngineRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl MapEngine for StubEngine {
    fn get_repo_map(
        &self,
        request: &MapEngineRequest,
        _interrupt: &AtomicBool,
    ) -> anyhow::Result<Option<String>> {
        self.requests.lock().unwrap().push(request.clone());
        if self.panic {
            panic!("engine exploded");
        }
        self.answer.clone().map_err(|e| anyhow!("{}", e))
    }
}

/// Service wired to the doubles, cloning into a private work directory
pub struct Harness {
    pub service: RepoMapService,
    pub cloner: Arc<FakeCloner>,
    pub engine: Arc<StubEngine>,
    pub work_dir: tempfile::TempDir,
}

impl Harness {
    pub fn new(behavior: CloneBehavior, engine: Arc<StubEngine>) -> Self {
        let work_dir = tempfile::tempdir().expect("Failed to create temporary directory");
        let cloner = FakeCloner::new(behavior);
        let service = RepoMapService::new(
            ApiKeyGate::new([VALID_KEY.to_string()].into_iter().collect()),
            RepositoryAcquirer::new(cloner.clone(), work_dir.path().to_path_buf()),
            MapGenerator::new(engine.clone()),
        );
        Self {
            service,
            cloner,
            engine,
            work_dir,
        }
    }

    pub fn succeeding(map: &str) -> Self {
        Self::new(
            CloneBehavior::Files(vec!["src/main.rs", "README.md"]),
            StubEngine::returning(map),
        )
    }

    /// Entries left in the work directory
    pub fn leftovers(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.work_dir.path())
            .expect("work dir readable")
            .map(|entry| entry.expect("dir entry").path())
            .collect()
    }
}
