use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Context};

use super::{MapEngine, MapEngineRequest};

/// How often a running engine is checked for exit or interruption
const ENGINE_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Mapping engine run as an external program
///
/// The program starts in the repository root, reads the JSON encoded
/// [`MapEngineRequest`] from stdin and writes the map to stdout. It is killed
/// when the interrupt flag goes up before it exits.
#[derive(Debug, Clone)]
pub struct CommandMapEngine {
    program: String,
    args: Vec<String>,
}

impl CommandMapEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Builds an engine from a whitespace separated command line
    pub fn from_command_line(command_line: &str) -> anyhow::Result<Self> {
        let mut parts = command_line.split_whitespace().map(String::from);
        let program = parts
            .next()
            .ok_or_else(|| anyhow!("mapping engine command is empty"))?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

type PipeReader = JoinHandle<std::io::Result<Vec<u8>>>;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<PipeReader> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn collect(handle: Option<PipeReader>, name: &str) -> anyhow::Result<Vec<u8>> {
    match handle {
        None => Ok(Vec::new()),
        Some(handle) => handle
            .join()
            .map_err(|_| anyhow!("mapping engine {} reader panicked", name))?
            .with_context(|| format!("unable to read mapping engine {}", name)),
    }
}

impl MapEngine for CommandMapEngine {
    fn get_repo_map(
        &self,
        request: &MapEngineRequest,
        interrupt: &AtomicBool,
    ) -> anyhow::Result<Option<String>> {
        let payload = serde_json::to_vec(request).context("unable to encode engine request")?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&request.root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("unable to start mapping engine '{}'", self.program))?;

        // Pipes are serviced from their own threads so a chatty engine can't
        // fill stdout while we are still blocked on stdin.
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || stdin.write_all(&payload))
        });
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = loop {
            if let Some(status) = child.try_wait().context("mapping engine did not finish")? {
                break status;
            }
            if interrupt.load(Ordering::SeqCst) {
                if let Err(e) = child.kill() {
                    tracing::warn!("Failed to kill mapping engine '{}': {}", self.program, e);
                }
                // Reap the process; the pipe readers end on their own
                if let Err(e) = child.wait() {
                    tracing::warn!("Failed to reap mapping engine '{}': {}", self.program, e);
                }
                return Err(anyhow!("mapping engine interrupted"));
            }
            std::thread::sleep(ENGINE_POLL_INTERVAL);
        };

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // Engines may exit without draining stdin
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(e).context("unable to send request to mapping engine"),
                Err(_) => return Err(anyhow!("mapping engine stdin writer panicked")),
            }
        }

        let stdout = collect(stdout, "stdout")?;
        let stderr = collect(stderr, "stderr")?;

        if !status.success() {
            return Err(anyhow!(
                "mapping engine exited with {}: {}",
                status,
                String::from_utf8_lossy(&stderr).trim()
            ));
        }

        let map = String::from_utf8_lossy(&stdout).into_owned();
        if map.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(map))
        }
    }
}
