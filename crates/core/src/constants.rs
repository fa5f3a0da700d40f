/// Constants used throughout the trackdash codebase
// Environment variable names
pub const UPSTREAM_BASE_VAR: &str = "TRACKDASH_UPSTREAM_BASE";
pub const ACCESS_TOKEN_VAR: &str = "TRACKDASH_ACCESS_TOKEN";
pub const REFRESH_SECRET_VAR: &str = "TRACKDASH_REFRESH_SECRET";
pub const CACHE_DIR_VAR: &str = "TRACKDASH_CACHE_DIR";
pub const RETENTION_VAR: &str = "TRACKDASH_RETENTION";
pub const FETCH_TIMEOUT_VAR: &str = "TRACKDASH_FETCH_TIMEOUT_SECS";
pub const REFRESH_INTERVAL_VAR: &str = "TRACKDASH_REFRESH_INTERVAL_SECS";
pub const HEAVY_REPORT_IDS_VAR: &str = "TRACKDASH_HEAVY_REPORT_IDS";
pub const REPORT_A_VAR: &str = "TRACKDASH_REPORT_A";
pub const REPORT_B_VAR: &str = "TRACKDASH_REPORT_B";
pub const LISTEN_VAR: &str = "TRACKDASH_LISTEN";

// Cache defaults
pub const DEFAULT_CACHE_DIR: &str = "./cache";
pub const DEFAULT_RETENTION: usize = 7;
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8088";

// Upstream report computation can take minutes, so the fetch and proxy
// timeout is far longer than a typical request timeout.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 1800;
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 21600;

// Report IDs known in advance to be slow under load and eligible for the
// view-report fallback path.
pub const DEFAULT_HEAVY_REPORT_IDS: &[u32] = &[42];

// Upstream endpoint paths
pub const RPC_PATH: &str = "/reporting/rpc";
pub const VIEW_REPORT_PATH: &str = "/reporting/viewreport.php";

// RPC function names for "get report data", tried in order.
pub const RPC_FUNCTION_CANDIDATES: &[&str] = &["get_report_data", "run_report"];

// Artifact naming
pub const ARTIFACT_PREFIX: &str = "report-";
pub const ARTIFACT_EXTENSION: &str = "snap";

// Artifact section markers
pub const META_SECTION: &str = "[meta]";
pub const DATA_SECTION: &str = "[data]";

// Proxy retry behavior
pub const PROXY_MAX_ATTEMPTS: u32 = 3;
pub const PROXY_BASE_DELAY_MS: u64 = 1000;
pub const PROXY_MAX_DELAY_MS: u64 = 10_000;
pub const PROXY_JITTER_MS: u64 = 500;

// Request headers the proxy forwards to the upstream. `accept-encoding` is
// deliberately absent to avoid double-compression mismatches.
pub const FORWARDED_REQUEST_HEADERS: &[&str] = &["accept", "content-type", "user-agent"];

// Hop-by-hop and encoding headers stripped from proxied responses.
pub const STRIPPED_RESPONSE_HEADERS: &[&str] = &[
    "content-encoding",
    "transfer-encoding",
    "connection",
    "keep-alive",
    "content-length",
];
