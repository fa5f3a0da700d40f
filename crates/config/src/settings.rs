use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Resolved application settings.
///
/// Constructed once at startup by [`SettingsLoader`](crate::SettingsLoader)
/// and shared by reference; components never read the environment themselves.
#[derive(Clone)]
pub struct Settings {
    /// Origin of the upstream reporting engine
    pub upstream_base: Url,
    /// Access token passed to the upstream's report RPC
    pub access_token: String,
    /// Shared secret guarding the auto-refresh trigger endpoint
    pub refresh_secret: String,
    /// Directory holding cache artifacts
    pub cache_dir: PathBuf,
    /// Number of artifacts retained per directory
    pub retention: usize,
    /// Bound on upstream fetches and proxied calls
    pub fetch_timeout: Duration,
    /// Advisory interval between scheduled refreshes
    pub refresh_interval: Duration,
    /// Report IDs eligible for the view-report fallback path
    pub heavy_report_ids: Vec<u32>,
    /// First source of the combined report
    pub report_a: Option<u32>,
    /// Second source of the combined report
    pub report_b: Option<u32>,
    /// Server bind address
    pub listen: SocketAddr,
}

impl Settings {
    /// Whether the given report ID is on the heavy-report allow-list
    #[must_use]
    pub fn is_heavy_report(&self, report_id: u32) -> bool {
        self.heavy_report_ids.contains(&report_id)
    }

    /// The two combined-report sources, or a configuration error naming the
    /// missing variable.
    pub fn combined_report_ids(&self) -> trackdash_core::Result<(u32, u32)> {
        let a = self.report_a.ok_or_else(|| {
            trackdash_core::Error::configuration(format!(
                "{} is not set",
                trackdash_core::REPORT_A_VAR
            ))
        })?;
        let b = self.report_b.ok_or_else(|| {
            trackdash_core::Error::configuration(format!(
                "{} is not set",
                trackdash_core::REPORT_B_VAR
            ))
        })?;
        Ok((a, b))
    }
}

// Credentials are redacted from debug output.
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("upstream_base", &self.upstream_base.as_str())
            .field("access_token", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("cache_dir", &self.cache_dir)
            .field("retention", &self.retention)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("refresh_interval", &self.refresh_interval)
            .field("heavy_report_ids", &self.heavy_report_ids)
            .field("report_a", &self.report_a)
            .field("report_b", &self.report_b)
            .field("listen", &self.listen)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            upstream_base: Url::parse("https://lms.example.edu").unwrap(),
            access_token: "tok-secret".into(),
            refresh_secret: "refresh-secret".into(),
            cache_dir: PathBuf::from("./cache"),
            retention: 7,
            fetch_timeout: Duration::from_secs(1800),
            refresh_interval: Duration::from_secs(21600),
            heavy_report_ids: vec![42],
            report_a: Some(10),
            report_b: None,
            listen: "127.0.0.1:8088".parse().unwrap(),
        }
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let rendered = format!("{:?}", settings());
        assert!(!rendered.contains("tok-secret"));
        assert!(!rendered.contains("refresh-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn combined_report_ids_requires_both_sources() {
        let err = settings().combined_report_ids().unwrap_err();
        assert!(err.to_string().contains(trackdash_core::REPORT_B_VAR));
    }

    #[test]
    fn heavy_report_allow_list() {
        let s = settings();
        assert!(s.is_heavy_report(42));
        assert!(!s.is_heavy_report(7));
    }
}
