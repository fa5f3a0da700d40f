//! Settings loader.
//!
//! Reads the `TRACKDASH_*` environment once at startup. Builder methods
//! override individual values, which keeps tests independent of the process
//! environment.

use crate::settings::Settings;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use trackdash_core::{constants, Error, Result};
use url::Url;

/// Builder-style loader for [`Settings`]
#[derive(Debug, Default)]
pub struct SettingsLoader {
    upstream_base: Option<String>,
    access_token: Option<String>,
    refresh_secret: Option<String>,
    cache_dir: Option<PathBuf>,
    retention: Option<usize>,
    fetch_timeout: Option<Duration>,
    refresh_interval: Option<Duration>,
    heavy_report_ids: Option<Vec<u32>>,
    report_a: Option<u32>,
    report_b: Option<u32>,
    listen: Option<SocketAddr>,
}

impl SettingsLoader {
    /// Create a new loader with no overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the upstream origin
    #[must_use]
    pub fn upstream_base(mut self, base: impl Into<String>) -> Self {
        self.upstream_base = Some(base.into());
        self
    }

    /// Override the access token
    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Override the auto-refresh shared secret
    #[must_use]
    pub fn refresh_secret(mut self, secret: impl Into<String>) -> Self {
        self.refresh_secret = Some(secret.into());
        self
    }

    /// Override the cache directory
    #[must_use]
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Override the retention count
    #[must_use]
    pub fn retention(mut self, retention: usize) -> Self {
        self.retention = Some(retention);
        self
    }

    /// Override the fetch/proxy timeout
    #[must_use]
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Override the combined-report source IDs
    #[must_use]
    pub fn reports(mut self, report_a: u32, report_b: u32) -> Self {
        self.report_a = Some(report_a);
        self.report_b = Some(report_b);
        self
    }

    /// Override the heavy-report allow-list
    #[must_use]
    pub fn heavy_report_ids(mut self, ids: Vec<u32>) -> Self {
        self.heavy_report_ids = Some(ids);
        self
    }

    /// Override the bind address
    #[must_use]
    pub fn listen(mut self, listen: SocketAddr) -> Self {
        self.listen = Some(listen);
        self
    }

    /// Resolve settings from overrides, then the environment, then defaults
    pub fn load(self) -> Result<Settings> {
        let upstream_base = self
            .upstream_base
            .or_else(|| env_var(constants::UPSTREAM_BASE_VAR))
            .ok_or_else(|| missing(constants::UPSTREAM_BASE_VAR))?;
        let upstream_base = Url::parse(&upstream_base).map_err(|e| {
            Error::configuration(format!(
                "{} is not a valid URL: {e}",
                constants::UPSTREAM_BASE_VAR
            ))
        })?;

        let access_token = self
            .access_token
            .or_else(|| env_var(constants::ACCESS_TOKEN_VAR))
            .ok_or_else(|| missing(constants::ACCESS_TOKEN_VAR))?;
        let refresh_secret = self
            .refresh_secret
            .or_else(|| env_var(constants::REFRESH_SECRET_VAR))
            .ok_or_else(|| missing(constants::REFRESH_SECRET_VAR))?;

        let cache_dir = self
            .cache_dir
            .or_else(|| env_var(constants::CACHE_DIR_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_CACHE_DIR));

        let retention = match self.retention {
            Some(n) => n,
            None => parse_env(constants::RETENTION_VAR)?.unwrap_or(constants::DEFAULT_RETENTION),
        };
        if retention == 0 {
            return Err(Error::configuration(format!(
                "{} must be at least 1",
                constants::RETENTION_VAR
            )));
        }

        let fetch_timeout = match self.fetch_timeout {
            Some(t) => t,
            None => Duration::from_secs(
                parse_env(constants::FETCH_TIMEOUT_VAR)?
                    .unwrap_or(constants::DEFAULT_FETCH_TIMEOUT_SECS),
            ),
        };
        let refresh_interval = match self.refresh_interval {
            Some(t) => t,
            None => Duration::from_secs(
                parse_env(constants::REFRESH_INTERVAL_VAR)?
                    .unwrap_or(constants::DEFAULT_REFRESH_INTERVAL_SECS),
            ),
        };

        let heavy_report_ids = match self.heavy_report_ids {
            Some(ids) => ids,
            None => match env_var(constants::HEAVY_REPORT_IDS_VAR) {
                Some(raw) => parse_id_list(&raw)?,
                None => constants::DEFAULT_HEAVY_REPORT_IDS.to_vec(),
            },
        };

        let report_a = match self.report_a {
            Some(id) => Some(id),
            None => parse_env(constants::REPORT_A_VAR)?,
        };
        let report_b = match self.report_b {
            Some(id) => Some(id),
            None => parse_env(constants::REPORT_B_VAR)?,
        };

        let listen = match self.listen {
            Some(addr) => addr,
            None => {
                let raw = env_var(constants::LISTEN_VAR)
                    .unwrap_or_else(|| constants::DEFAULT_LISTEN.to_string());
                raw.parse().map_err(|e| {
                    Error::configuration(format!(
                        "{} is not a valid socket address: {e}",
                        constants::LISTEN_VAR
                    ))
                })?
            }
        };

        let settings = Settings {
            upstream_base,
            access_token,
            refresh_secret,
            cache_dir,
            retention,
            fetch_timeout,
            refresh_interval,
            heavy_report_ids,
            report_a,
            report_b,
            listen,
        };
        tracing::debug!(?settings, "settings loaded");
        Ok(settings)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn missing(name: &str) -> Error {
    Error::configuration(format!("{name} is not set"))
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| Error::configuration(format!("{name} has an invalid value '{raw}': {e}"))),
    }
}

fn parse_id_list(raw: &str) -> Result<Vec<u32>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse().map_err(|e| {
                Error::configuration(format!(
                    "{} contains an invalid report ID '{part}': {e}",
                    constants::HEAVY_REPORT_IDS_VAR
                ))
            })
        })
        .collect()
}
