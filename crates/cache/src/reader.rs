//! Read-only access to the cache directory.

use crate::format::decode_artifact;
use crate::listing::list_artifacts;
use indexmap::IndexMap;
use std::path::PathBuf;
use tokio::fs;
use trackdash_core::{CacheArtifact, Error, ReportRow, Result};

/// The latest artifact, fully parsed.
#[derive(Debug, Clone)]
pub struct LatestArtifact {
    pub artifact: CacheArtifact,
    pub metadata: IndexMap<String, String>,
    pub rows: Vec<ReportRow>,
}

/// The outcome of a read: an empty cache directory is a distinguishable
/// state, not an error.
#[derive(Debug, Clone)]
pub enum ReadOutcome {
    Latest(Box<LatestArtifact>),
    NoArtifacts,
}

/// Parses the most recent artifact back into metadata and rows.
///
/// Never writes, renames, or deletes anything.
#[derive(Debug, Clone)]
pub struct CacheReader {
    dir: PathBuf,
}

impl CacheReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Read and parse the most recent artifact.
    pub async fn read_latest(&self) -> Result<ReadOutcome> {
        let artifacts = list_artifacts(&self.dir).await?;
        let Some(artifact) = artifacts.into_iter().next() else {
            return Ok(ReadOutcome::NoArtifacts);
        };

        let text = fs::read_to_string(&artifact.path)
            .await
            .map_err(|e| Error::file_system(&artifact.path, "read artifact", e))?;
        let (metadata, rows) = decode_artifact(&artifact.name, &text)?;
        Ok(ReadOutcome::Latest(Box::new(LatestArtifact {
            artifact,
            metadata,
            rows,
        })))
    }
}
