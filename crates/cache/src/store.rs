//! The cache store: sole writer of the cache directory.

use crate::format::{artifact_name, encode_artifact};
use crate::listing::list_artifacts;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use trackdash_core::{
    CacheArtifact, CacheMetadata, DiagnosticEvent, Diagnostics, Error, ReportRow, Result,
};
use uuid::Uuid;

/// Durably persists one fetch result as a new, immutable artifact.
///
/// Writes go to a temporary file in the same directory, are verified
/// non-empty, then atomically renamed, so readers never observe a partially
/// written artifact. Expected to run with at most one concurrent writer per
/// directory; concurrent writers could race on the prune step, an accepted
/// limitation of the single-process, low-frequency refresh cadence.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    retention: usize,
    diagnostics: Diagnostics,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>, retention: usize, diagnostics: Diagnostics) -> Self {
        Self {
            dir: dir.into(),
            retention,
            diagnostics,
        }
    }

    /// Persist rows and metadata as a brand-new artifact, then prune
    /// artifacts beyond the retention count.
    ///
    /// Always produces a new artifact; never mutates an existing one. A
    /// failed prune is logged and reported on the diagnostics channel but
    /// does not fail the write.
    pub async fn write(
        &self,
        rows: &[ReportRow],
        metadata: &CacheMetadata,
    ) -> Result<CacheArtifact> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::file_system(&self.dir, "create cache directory", e))?;

        let content = encode_artifact(&metadata.to_pairs(), rows)?;
        let final_path = self.claim_artifact_path().await?;
        let temp_path = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));

        if let Err(error) = self.write_temp(&temp_path, content.as_bytes()).await {
            self.remove_temp(&temp_path).await;
            return Err(error);
        }

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            self.remove_temp(&temp_path).await;
            return Err(Error::file_system(&final_path, "atomic rename", e));
        }

        let file_meta = fs::metadata(&final_path)
            .await
            .map_err(|e| Error::file_system(&final_path, "stat artifact", e))?;
        let artifact = CacheArtifact {
            name: final_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string(),
            path: final_path.clone(),
            mtime: file_meta
                .modified()
                .map_err(|e| Error::file_system(&final_path, "read modification time", e))?
                .into(),
            size_bytes: file_meta.len(),
        };
        tracing::info!(
            artifact = %artifact.name,
            rows = metadata.total_rows,
            size_bytes = artifact.size_bytes,
            "artifact written"
        );

        self.prune().await;
        Ok(artifact)
    }

    /// Pick an unused timestamp-derived filename. Millisecond precision
    /// makes collisions possible only for writes within the same
    /// millisecond, so waiting it out is enough.
    async fn claim_artifact_path(&self) -> Result<PathBuf> {
        for _ in 0..16 {
            let candidate = self.dir.join(artifact_name(Utc::now()));
            match fs::try_exists(&candidate).await {
                Ok(false) => return Ok(candidate),
                Ok(true) => tokio::time::sleep(std::time::Duration::from_millis(1)).await,
                Err(e) => return Err(Error::file_system(&candidate, "probe artifact name", e)),
            }
        }
        Err(Error::configuration(
            "could not derive an unused artifact name".to_string(),
        ))
    }

    async fn write_temp(&self, temp_path: &Path, content: &[u8]) -> Result<()> {
        fs::write(temp_path, content)
            .await
            .map_err(|e| Error::file_system(temp_path, "write temporary file", e))?;

        // Verify the temporary file before the rename makes it visible.
        let written = fs::metadata(temp_path)
            .await
            .map_err(|e| Error::file_system(temp_path, "verify temporary file", e))?;
        if written.len() == 0 {
            return Err(Error::file_system(
                temp_path,
                "verify temporary file",
                std::io::Error::new(std::io::ErrorKind::WriteZero, "temporary file is empty"),
            ));
        }
        Ok(())
    }

    /// Best-effort temp-file cleanup after a failed write.
    async fn remove_temp(&self, temp_path: &Path) {
        match fs::remove_file(temp_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %temp_path.display(), error = %e, "failed to remove temporary file");
                self.diagnostics.emit(DiagnosticEvent::TempFileCleanupFailed {
                    path: temp_path.display().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    /// Delete every artifact beyond the retention count, best-effort.
    async fn prune(&self) {
        let artifacts = match list_artifacts(&self.dir).await {
            Ok(artifacts) => artifacts,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list artifacts for pruning");
                return;
            }
        };
        for stale in artifacts.iter().skip(self.retention) {
            match fs::remove_file(&stale.path).await {
                Ok(()) => {
                    tracing::debug!(artifact = %stale.name, "pruned artifact beyond retention");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(artifact = %stale.name, error = %e, "failed to prune artifact");
                    self.diagnostics.emit(DiagnosticEvent::ArtifactPruneFailed {
                        path: stale.path.display().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }
}
