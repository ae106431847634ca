//! Ingestion configuration
//!
//! Loaded from the environment (after reading `.env` if present) with
//! defaults for every value. The source list defaults to the three production
//! sources and can be replaced by a JSON file named in `JOBFEED_SOURCES_FILE`.

use jobfeed_common::{JobfeedError, Result};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::retry::{RetryPolicy, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS};
use crate::scheduler::DEFAULT_RUN_INTERVAL_SECS;
use crate::sources::http::{DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::sources::{default_sources, HttpSettings, SourceConfig};

/// Default maximum database connections in the pool
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Ingestion configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub http: HttpSettings,
    pub retry: RetryPolicy,
    /// Pause between scheduled run starts
    pub run_interval: Duration,
    /// Sources in run order
    pub sources: Vec<SourceConfig>,
    pub database: DatabaseConfig,
}

/// Optional PostgreSQL store settings
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            http: HttpSettings::default(),
            retry: RetryPolicy::default(),
            run_interval: Duration::from_secs(DEFAULT_RUN_INTERVAL_SECS),
            sources: default_sources(),
            database: DatabaseConfig {
                url: None,
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            },
        }
    }
}

impl IngestConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sources = match lookup("JOBFEED_SOURCES_FILE") {
            Some(path) if !path.trim().is_empty() => load_sources(Path::new(path.trim()))?,
            _ => default_sources(),
        };

        let config = Self {
            http: HttpSettings {
                timeout: Duration::from_secs(parse_var(
                    &lookup,
                    "JOBFEED_HTTP_TIMEOUT_SECS",
                    DEFAULT_HTTP_TIMEOUT_SECS,
                )?),
                user_agent: lookup("JOBFEED_USER_AGENT")
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            },
            retry: RetryPolicy::new(
                parse_var(&lookup, "JOBFEED_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
                Duration::from_millis(parse_var(
                    &lookup,
                    "JOBFEED_RETRY_BASE_DELAY_MS",
                    DEFAULT_BASE_DELAY_MS,
                )?),
            ),
            run_interval: Duration::from_secs(parse_var(
                &lookup,
                "JOBFEED_RUN_INTERVAL_SECS",
                DEFAULT_RUN_INTERVAL_SECS,
            )?),
            sources,
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
                max_connections: parse_var(
                    &lookup,
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout.is_zero() {
            return Err(JobfeedError::config("HTTP timeout must be greater than 0"));
        }

        if self.retry.max_attempts == 0 {
            return Err(JobfeedError::config("Max attempts must be greater than 0"));
        }

        if self.run_interval.is_zero() {
            return Err(JobfeedError::config("Run interval must be greater than 0"));
        }

        if self.database.max_connections == 0 {
            return Err(JobfeedError::config(
                "Database max_connections must be greater than 0",
            ));
        }

        if self.sources.is_empty() {
            return Err(JobfeedError::config("At least one source must be configured"));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(JobfeedError::config("Source name cannot be empty"));
            }
            if source.endpoint.trim().is_empty() {
                return Err(JobfeedError::config(format!(
                    "Source '{}' has an empty endpoint",
                    source.name
                )));
            }
            if !names.insert(source.name.as_str()) {
                return Err(JobfeedError::config(format!(
                    "Duplicate source name '{}'",
                    source.name
                )));
            }
        }

        Ok(())
    }
}

/// Read a JSON array of source configurations
pub fn load_sources(path: &Path) -> Result<Vec<SourceConfig>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn parse_var<T, F>(lookup: &F, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| JobfeedError::InvalidEnv {
            name: name.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sources::WireFormat;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = IngestConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.http.timeout, Duration::from_secs(15));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_millis(2000));
        assert_eq!(config.run_interval, Duration::from_secs(14_400));
        assert_eq!(config.sources.len(), 3);
        assert!(config.database.url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = IngestConfig::from_lookup(lookup(&[
            ("JOBFEED_MAX_ATTEMPTS", "5"),
            ("JOBFEED_RETRY_BASE_DELAY_MS", "10"),
            ("JOBFEED_USER_AGENT", "jobfeed-test"),
            ("DATABASE_URL", "postgresql://localhost/jobfeed"),
        ]))
        .unwrap();

        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.delay_for(2), Duration::from_millis(20));
        assert_eq!(config.http.user_agent, "jobfeed-test");
        assert_eq!(
            config.database.url.as_deref(),
            Some("postgresql://localhost/jobfeed")
        );
    }

    #[test]
    fn test_unparsable_value_is_rejected() {
        let err = IngestConfig::from_lookup(lookup(&[("JOBFEED_MAX_ATTEMPTS", "three")]))
            .unwrap_err();
        assert!(matches!(err, JobfeedError::InvalidEnv { ref name, .. } if name == "JOBFEED_MAX_ATTEMPTS"));
    }

    #[test]
    fn test_zero_values_fail_validation() {
        let err = IngestConfig::from_lookup(lookup(&[("JOBFEED_HTTP_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(err, JobfeedError::Config(_)));

        let err =
            IngestConfig::from_lookup(lookup(&[("JOBFEED_MAX_ATTEMPTS", "0")])).unwrap_err();
        assert!(matches!(err, JobfeedError::Config(_)));
    }

    #[test]
    fn test_duplicate_and_blank_sources_fail_validation() {
        let mut config = IngestConfig::default();
        config.sources.push(config.sources[0].clone());
        assert!(config.validate().is_err());

        let mut config = IngestConfig::default();
        config.sources[1].endpoint = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = IngestConfig::default();
        config.sources.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sources_file_replaces_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{
                "name": "Local Feed",
                "endpoint": "http://127.0.0.1:8080/feed.rss",
                "format": {{ "kind": "rss" }},
                "base_url": "http://127.0.0.1:8080"
            }}]"#
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let config =
            IngestConfig::from_lookup(lookup(&[("JOBFEED_SOURCES_FILE", path.as_str())])).unwrap();

        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].name, "Local Feed");
        assert_eq!(config.sources[0].format, WireFormat::Rss);
    }

    #[test]
    fn test_missing_sources_file_is_io_error() {
        let err = IngestConfig::from_lookup(lookup(&[(
            "JOBFEED_SOURCES_FILE",
            "/nonexistent/jobfeed/sources.json",
        )]))
        .unwrap_err();
        assert!(matches!(err, JobfeedError::Io(_)));
    }
}
