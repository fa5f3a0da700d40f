//! Remote-report acquisition for trackdash.
//!
//! [`RetryableHttpFetcher`] performs one bounded HTTP call and classifies
//! failures into retryable and non-retryable transport errors.
//! [`RemoteReportClient`] builds on it to run a configurable report against
//! the upstream RPC, trying an ordered list of endpoint strategies and, for
//! known-heavy report IDs, a direct view-report fallback.

mod fetcher;
mod report;

pub use fetcher::RetryableHttpFetcher;
pub use report::RemoteReportClient;
