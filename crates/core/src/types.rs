use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// One record of a fetched report.
///
/// Reports have no fixed schema; column names are whatever the upstream
/// returns for a given report ID. Keys keep their insertion order, and the
/// first row of a fetch defines the column order used for persistence.
/// Heterogeneous key sets within one fetch are unsupported: keys missing
/// from a later row persist as null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportRow(IndexMap<String, Value>);

impl ReportRow {
    /// Create a new empty row
    #[must_use]
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Insert a column value, returning the previous value if any
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Get a column value by name
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Column names in insertion order
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    /// Values for the given header, null-filling missing columns
    #[must_use]
    pub fn values_for(&self, header: &[String]) -> Vec<Value> {
        header
            .iter()
            .map(|key| self.0.get(key).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Number of columns
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the row has no columns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for ReportRow {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Derive the persisted column header from a row set: the first row's keys,
/// in order. An empty row set has an empty header.
#[must_use]
pub fn header_for(rows: &[ReportRow]) -> Vec<String> {
    rows.first().map(ReportRow::columns).unwrap_or_default()
}

/// The outcome of one remote report fetch. Immutable once created.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub rows: Vec<ReportRow>,
    pub fetched_at: DateTime<Utc>,
    pub fetch_duration: Duration,
    /// The endpoint that ultimately produced the rows
    pub source_label: String,
}

/// Row counts attributed to each source of a combined report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    pub source_a: usize,
    pub source_b: usize,
}

/// The outcome of a two-source combined fetch. Rows are the plain
/// concatenation of the sources' rows, source A first; no deduplication is
/// performed.
#[derive(Debug, Clone)]
pub struct CombinedFetchResult {
    pub rows: Vec<ReportRow>,
    pub counts: SourceCounts,
    pub fetched_at: DateTime<Utc>,
    pub fetch_duration: Duration,
}

/// Metadata stored in the `[meta]` section of a cache artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub last_fetch: DateTime<Utc>,
    pub fetch_duration_ms: u64,
    pub total_rows: usize,
    pub per_source: Option<SourceCounts>,
}

impl CacheMetadata {
    /// Flatten into the key/value pairs persisted in the meta section
    #[must_use]
    pub fn to_pairs(&self) -> IndexMap<String, String> {
        let mut pairs = IndexMap::new();
        pairs.insert(
            "last_fetch".to_string(),
            self.last_fetch.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        );
        pairs.insert(
            "fetch_duration_ms".to_string(),
            self.fetch_duration_ms.to_string(),
        );
        pairs.insert("total_rows".to_string(), self.total_rows.to_string());
        if let Some(counts) = &self.per_source {
            pairs.insert("source_a_rows".to_string(), counts.source_a.to_string());
            pairs.insert("source_b_rows".to_string(), counts.source_b.to_string());
        }
        pairs
    }
}

/// One persisted fetch snapshot on durable storage.
///
/// Created atomically by the cache store, enumerated read-only by the cache
/// reader, deleted only by retention pruning. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheArtifact {
    pub name: String,
    pub path: PathBuf,
    pub mtime: DateTime<Utc>,
    pub size_bytes: u64,
}
