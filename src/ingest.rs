// Dataset ingestion boundary. The engine never fetches by itself; a source hands over the
// delimited text and the engine only parses it.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{EngineError, Result};

pub trait DatasetSource {
    /// Fetch the raw delimited text of `filename` for a session. Failures are reported
    /// as `EngineError::Network` and are not retried by the engine.
    fn fetch(&self, filename: &str, session_id: &str) -> Result<String>;
}

/// Serves files from a local directory.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DatasetSource for FileSource {
    fn fetch(&self, filename: &str, session_id: &str) -> Result<String> {
        let path = self.root.join(filename);
        debug!("Session {} fetching {}", session_id, path.display());
        fs::read_to_string(&path).map_err(|e| EngineError::network(filename, e.to_string()))
    }
}

/// In-memory files, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, filename: impl Into<String>, text: impl Into<String>) {
        self.files.insert(filename.into(), text.into());
    }
}

impl DatasetSource for MemorySource {
    fn fetch(&self, filename: &str, _session_id: &str) -> Result<String> {
        self.files
            .get(filename)
            .cloned()
            .ok_or_else(|| EngineError::network(filename, "no such file"))
    }
}
