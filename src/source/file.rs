//! File-based snapshot fetcher.
//!
//! Reads a full metrics payload from a JSON file. This is the offline
//! counterpart of the pull endpoint and the main fixture mechanism in
//! tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use super::SnapshotFetch;
use crate::error::FetchError;

/// A fetcher that reads the payload from a file on each pull.
#[derive(Debug)]
pub struct FileFetch {
    path: PathBuf,
    description: String,
}

impl FileFetch {
    /// Create a fetcher for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self { path, description }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotFetch for FileFetch {
    async fn fetch(&self) -> Result<Value, FetchError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| FetchError::Parse(e.to_string()))
    }

    fn description(&self) -> &str {
        &self.description
    }
}
