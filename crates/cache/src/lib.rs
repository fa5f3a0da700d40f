//! File-backed cache of fetched reports.
//!
//! Each fetch produces one immutable, timestamp-named artifact in the cache
//! directory. [`CacheStore`] is the sole writer: it persists atomically via
//! a temporary file and rename, then prunes artifacts beyond the retention
//! count. [`CacheReader`] only ever observes fully-renamed artifacts, so
//! concurrent readers never see a torn write; they may see different
//! artifacts if a write completes between two reads, which is an accepted
//! staleness window.

mod format;
mod listing;
mod reader;
mod store;

pub use format::{artifact_name, decode_artifact, encode_artifact, is_artifact_name};
pub use listing::list_artifacts;
pub use reader::{CacheReader, LatestArtifact, ReadOutcome};
pub use store::CacheStore;
