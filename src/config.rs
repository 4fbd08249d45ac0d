//! Immutable server configuration, loaded from a `KEY=VALUE` text file.
//!
//! Grounded in the original C `config.c`: one pass over lines, `#`-prefixed
//! and blank lines skipped, `KEY=VALUE` split on the first `=`. `VHOST_`
//! keys are special-cased and accumulated into the vhost table.

use crate::error::ConfigError;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

const MAX_VHOSTS: usize = 10;

/// Immutable configuration consumed by every other component.
///
/// Constructed once at startup by [`ServerConfig::load`] and shared by
/// `Arc` thereafter; nothing here is mutable after construction.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub default_doc_root: PathBuf,
    pub vhosts: Vec<(String, PathBuf)>,
    pub default_vhost: Option<String>,
    pub workers: u32,
    pub threads_per_worker: u32,
    pub queue_capacity: u32,
    pub cache_bytes: u64,
    pub idle_timeout_s: u32,
    pub log_path: PathBuf,
}

impl ServerConfig {
    /// Loads and validates configuration from a `KEY=VALUE` file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::parse(&text)
    }

    fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut values: HashMap<&str, &str> = HashMap::new();
        let mut vhosts: Vec<(String, PathBuf)> = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            if let Some(hostname) = key.strip_prefix("VHOST_") {
                if vhosts.len() >= MAX_VHOSTS {
                    return Err(ConfigError::TooManyVhosts);
                }
                if vhosts.iter().any(|(h, _)| h == hostname) {
                    return Err(ConfigError::DuplicateVhost(hostname.to_string()));
                }
                vhosts.push((hostname.to_ascii_lowercase(), PathBuf::from(value)));
                continue;
            }

            values.insert(key, value);
        }

        let port = parse_required(&values, "PORT", |v| v.parse::<u16>().ok().filter(|p| *p != 0))?;
        let default_doc_root = PathBuf::from(required(&values, "DOCUMENT_ROOT")?);
        let workers = parse_required(&values, "NUM_WORKERS", |v| {
            v.parse::<u32>().ok().filter(|n| *n > 0)
        })?;
        let threads_per_worker = parse_required(&values, "THREADS_PER_WORKER", |v| {
            v.parse::<u32>().ok().filter(|n| *n > 0)
        })?;
        let queue_capacity = parse_required(&values, "MAX_QUEUE_SIZE", |v| {
            v.parse::<u32>().ok().filter(|n| *n > 0)
        })?;
        let log_path = PathBuf::from(required(&values, "LOG_FILE")?);
        let cache_mb = parse_required(&values, "CACHE_SIZE_MB", |v| v.parse::<u64>().ok())?;
        let idle_timeout_s = parse_required(&values, "TIMEOUT_SECONDS", |v| {
            v.parse::<u32>().ok().filter(|n| *n > 0)
        })?;

        let default_vhost = values.get("DEFAULT_VHOST").map(|v| v.to_ascii_lowercase());

        Ok(Self {
            port,
            default_doc_root,
            vhosts,
            default_vhost,
            workers,
            threads_per_worker,
            queue_capacity,
            cache_bytes: cache_mb * 1024 * 1024,
            idle_timeout_s,
            log_path,
        })
    }

    /// Total worker-pool size: `workers * threads_per_worker`.
    #[inline(always)]
    pub fn pool_size(&self) -> usize {
        (self.workers as usize) * (self.threads_per_worker as usize)
    }

    #[inline(always)]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_s as u64)
    }

    /// Resolves the document root for a request's `Host` header, per §4.G:
    /// matching vhost, else `default_vhost` if configured and matching,
    /// else the default document root.
    pub fn resolve_doc_root(&self, hostname: Option<&str>) -> &Path {
        if let Some(host) = hostname {
            let host = strip_port(host).to_ascii_lowercase();

            if let Some((_, root)) = self.vhosts.iter().find(|(h, _)| *h == host) {
                return root;
            }
            if let Some(default_host) = &self.default_vhost {
                if *default_host == host {
                    return &self.default_doc_root;
                }
            }
        }

        &self.default_doc_root
    }
}

fn strip_port(host: &str) -> &str {
    host.split(':').next().unwrap_or(host)
}

fn required<'a>(values: &HashMap<&'a str, &'a str>, key: &'static str) -> Result<&'a str, ConfigError> {
    values.get(key).copied().ok_or(ConfigError::MissingKey(key))
}

fn parse_required<T>(
    values: &HashMap<&str, &str>,
    key: &'static str,
    f: impl FnOnce(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    let raw = required(values, key)?;
    f(raw).ok_or_else(|| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}
