//! Combined-report refresh orchestration.
//!
//! [`CombinedReportBuilder`] fetches two configurable reports, concatenates
//! their rows, and hands the result to the cache store. There is no
//! partial-success mode: if either upstream call fails, nothing is
//! persisted.

use async_trait::async_trait;
use chrono::Utc;
use std::time::Instant;
use trackdash_cache::CacheStore;
use trackdash_client::RemoteReportClient;
use trackdash_core::{
    CacheArtifact, CacheMetadata, CombinedFetchResult, Error, FetchResult, Result, SourceCounts,
};

/// Anything that can run a configurable report by ID.
///
/// The production implementation is [`RemoteReportClient`]; tests substitute
/// a scripted source.
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn run_report(
        &self,
        report_id: u32,
        filters: &[(String, String)],
    ) -> Result<FetchResult>;
}

#[async_trait]
impl ReportSource for RemoteReportClient {
    async fn run_report(
        &self,
        report_id: u32,
        filters: &[(String, String)],
    ) -> Result<FetchResult> {
        RemoteReportClient::run_report(self, report_id, filters).await
    }
}

/// The outcome of one combined refresh, including the persisted artifact.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub artifact: CacheArtifact,
    pub result: CombinedFetchResult,
}

/// Orchestrates two report fetches into one persisted artifact.
///
/// Rows are concatenated without deduplication by any natural key; the two
/// source reports are understood to be disjoint in practice. Worth
/// confirming with the report's data owner before hardening.
pub struct CombinedReportBuilder<S: ReportSource> {
    source: S,
    store: CacheStore,
    report_a: u32,
    report_b: u32,
}

impl<S: ReportSource> CombinedReportBuilder<S> {
    pub fn new(source: S, store: CacheStore, report_a: u32, report_b: u32) -> Self {
        Self {
            source,
            store,
            report_a,
            report_b,
        }
    }

    /// Fetch both reports, concatenate (source A first), and persist.
    ///
    /// Fails fast without writing when either fetch fails or when both
    /// sources come back empty; a single empty source is fine.
    pub async fn build_and_persist(&self) -> Result<RefreshOutcome> {
        let started = Instant::now();

        let result_a = self.source.run_report(self.report_a, &[]).await?;
        let result_b = self.source.run_report(self.report_b, &[]).await?;

        let counts = SourceCounts {
            source_a: result_a.rows.len(),
            source_b: result_b.rows.len(),
        };
        if counts.source_a == 0 && counts.source_b == 0 {
            return Err(Error::EmptyCombinedResult {
                source_a: format!("report {}", self.report_a),
                source_b: format!("report {}", self.report_b),
            });
        }

        let mut rows = result_a.rows;
        rows.extend(result_b.rows);

        let result = CombinedFetchResult {
            counts,
            fetched_at: Utc::now(),
            fetch_duration: started.elapsed(),
            rows,
        };
        let metadata = CacheMetadata {
            last_fetch: result.fetched_at,
            fetch_duration_ms: result.fetch_duration.as_millis() as u64,
            total_rows: result.rows.len(),
            per_source: Some(result.counts),
        };
        let artifact = self.store.write(&result.rows, &metadata).await?;
        tracing::info!(
            artifact = %artifact.name,
            source_a = counts.source_a,
            source_b = counts.source_b,
            duration_ms = metadata.fetch_duration_ms,
            "combined report persisted"
        );
        Ok(RefreshOutcome { artifact, result })
    }
}
