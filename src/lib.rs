//! Repository map service
//!
//! Produces a structural "map" of a remote git repository on request. Each
//! request is authenticated, validated, cloned into a throwaway directory,
//! handed to an external mapping engine and answered with either the map or a
//! typed error.
//!
//! ## Surfaces
//!
//! - HTTP API: `POST /api/v1/repomap/generate` with an `X-API-Key` header
//! - MCP server (STDIN/STDOUT mode) with a `generate_repo_map` tool
//! - Directly as a Rust library through [`services::RepoMapService`]
//!
//! ## Request
//!
//! ```json
//! {"repository_url": "https://github.com/user/repo.git", "config": {"map_tokens": 2048}}
//! ```
//!
//! Recognized config keys are `map_tokens`, `max_context_window`,
//! `map_mul_no_files` and `refresh`. They are type-checked before anything is
//! cloned; unknown keys reach the mapping engine unchanged.
//!
//! ## Configuration
//!
//! ```bash
//! # Accepted API keys (comma separated). Without it any non-empty key is accepted.
//! export REPOMAP_API_KEYS=key1,key2
//! # Mapping engine executable; receives the request as JSON on stdin
//! export REPOMAP_ENGINE_COMMAND="python3 -m my_repomap"
//! # Where per-request clones are created (defaults to the system temp dir)
//! export REPOMAP_WORK_DIR=/var/tmp/repomap
//! ```
//!
//! Clones are never cached: each request gets a fresh directory that is
//! removed before the response is sent.

pub mod repomap;
pub mod services;
pub mod settings;
pub mod tools;
pub mod transport;
