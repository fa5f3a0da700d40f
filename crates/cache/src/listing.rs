//! Artifact enumeration shared by the store (pruning) and the reader.

use crate::format::is_artifact_name;
use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::fs;
use trackdash_core::{CacheArtifact, Error, Result};

/// List artifacts in a cache directory, most recent first.
///
/// Ordered by modification time descending, with the timestamp-derived name
/// as tiebreaker. Temporary and foreign files are skipped. A missing
/// directory is an empty listing, not an error.
pub async fn list_artifacts(dir: &Path) -> Result<Vec<CacheArtifact>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::file_system(dir, "read cache directory", e)),
    };

    let mut artifacts = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::file_system(dir, "read cache directory entry", e))?
    {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !is_artifact_name(name) {
            continue;
        }
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                // The artifact may have been pruned between listing and stat.
                tracing::warn!(artifact = name, error = %e, "failed to stat artifact, skipping");
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        let mtime: DateTime<Utc> = metadata
            .modified()
            .map_err(|e| Error::file_system(entry.path(), "read modification time", e))?
            .into();
        artifacts.push(CacheArtifact {
            name: name.to_string(),
            path: entry.path(),
            mtime,
            size_bytes: metadata.len(),
        });
    }

    artifacts.sort_by(|a, b| b.mtime.cmp(&a.mtime).then_with(|| b.name.cmp(&a.name)));
    Ok(artifacts)
}
