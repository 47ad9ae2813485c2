// src/error.rs
//
// Only run-level failures are errors. Per-record and per-cell problems are
// absorbed where they occur (defaults + a WARN line) and never reach here.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Fetch failed on every allowed attempt.
    #[error("fetch failed after {attempts} attempt(s) for {url}: {reason}")]
    Transport {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// Writing a table after a successful merge failed.
    #[error("failed to write {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Bad arguments or missing credentials; raised before any fetch.
    #[error("config: {0}")]
    Config(String),
}

impl Error {
    pub fn persist(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Persist { path: path.into(), source }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
