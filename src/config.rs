//! Service configuration. Raw string fields coming from the deployment
//! environment are parsed leniently: a malformed TTL falls back to the
//! default with a warning rather than failing startup.

use crate::error::Result;
use chrono::TimeDelta;
use log::warn;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SNAPSHOT_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How long a cached ledger snapshot stays fresh, e.g. "24h", "90m",
    /// "300s" or a bare number of seconds.
    pub snapshot_ttl: String,
    /// Comma-separated transaction sub-types whose penalties are
    /// kill-switched (status `Disabled`) without touching the allow-list.
    pub disabled_penalty_types: String,
    /// Company code for late filing penalties.
    pub late_filing_company_code: String,
    /// Company code for sanctions penalties.
    pub sanctions_company_code: String,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_ttl: format!("{DEFAULT_SNAPSHOT_TTL_HOURS}h"),
            disabled_penalty_types: String::new(),
            late_filing_company_code: "LP".to_string(),
            sanctions_company_code: "C1".to_string(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// The configured snapshot TTL, falling back to the 24h default when the
    /// configured value does not parse.
    pub fn snapshot_ttl(&self) -> TimeDelta {
        match parse_ttl(&self.snapshot_ttl) {
            Some(ttl) => ttl,
            None => {
                warn!(
                    "unparseable snapshot_ttl {:?}, falling back to {}h",
                    self.snapshot_ttl, DEFAULT_SNAPSHOT_TTL_HOURS
                );
                TimeDelta::hours(DEFAULT_SNAPSHOT_TTL_HOURS)
            }
        }
    }

    pub fn disabled_subtypes(&self) -> HashSet<String> {
        self.disabled_penalty_types
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn parse_ttl(raw: &str) -> Option<TimeDelta> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let (value, ctor): (&str, fn(i64) -> TimeDelta) = match raw.char_indices().last()? {
        (idx, 'h') => (&raw[..idx], TimeDelta::hours),
        (idx, 'm') => (&raw[..idx], TimeDelta::minutes),
        (idx, 's') => (&raw[..idx], TimeDelta::seconds),
        _ => (raw, TimeDelta::seconds),
    };
    let n: i64 = value.trim().parse().ok()?;
    if n < 0 {
        return None;
    }
    Some(ctor(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_suffixed_ttl() {
        assert_eq!(parse_ttl("24h"), Some(TimeDelta::hours(24)));
        assert_eq!(parse_ttl("90m"), Some(TimeDelta::minutes(90)));
        assert_eq!(parse_ttl("300s"), Some(TimeDelta::seconds(300)));
        assert_eq!(parse_ttl("45"), Some(TimeDelta::seconds(45)));
    }

    #[test]
    fn rejects_garbage_ttl() {
        assert_eq!(parse_ttl(""), None);
        assert_eq!(parse_ttl("soon"), None);
        assert_eq!(parse_ttl("-4h"), None);
    }

    #[test]
    fn malformed_ttl_falls_back_to_default() {
        let config = Config {
            snapshot_ttl: "whenever".to_string(),
            ..Config::default()
        };
        assert_eq!(config.snapshot_ttl(), TimeDelta::hours(24));
    }

    #[test]
    fn disabled_subtypes_are_split_and_trimmed() {
        let config = Config {
            disabled_penalty_types: "EU, S1 ,,A2".to_string(),
            ..Config::default()
        };
        let disabled = config.disabled_subtypes();
        assert_eq!(disabled.len(), 3);
        assert!(disabled.contains("EU"));
        assert!(disabled.contains("S1"));
        assert!(disabled.contains("A2"));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: Config = serde_json::from_str(r#"{"snapshot_ttl": "12h"}"#).unwrap();
        assert_eq!(config.snapshot_ttl(), TimeDelta::hours(12));
        assert_eq!(config.late_filing_company_code, "LP");
        assert_eq!(config.retry.max_attempts, 3);
    }
}
