//! Configuration file support for sbom-enricher.
//!
//! Provides YAML-based configuration through `sbom-enricher.config.yml`
//! files, including data structures, file loading, validation and the
//! conversion into the settings the stage factory consumes.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use sbom_enricher::adapters::outbound::network::{
    RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
};
use sbom_enricher::application::factories::SourceSettings;
use sbom_enricher::shared::Result;

pub const CONFIG_FILENAME: &str = "sbom-enricher.config.yml";

/// Environment variable consulted for the Snyk organization when the
/// config file names none.
pub const SNYK_ORG_ENV: &str = "SNYK_ORG_ID";

const MAX_CONCURRENCY: usize = 256;

/// Top-level configuration file schema.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub concurrency: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub rate_limit: Option<RateLimitConfig>,
    pub retry: Option<RetryConfig>,
    pub endpoints: Option<EndpointsConfig>,
    pub snyk: Option<SnykConfig>,
    /// Captures unknown fields for warnings.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

/// Token bucket shared by all requests to one service.
#[derive(Debug, Deserialize, Default)]
pub struct RateLimitConfig {
    pub requests_per_second: Option<u32>,
    pub burst: Option<u32>,
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RetryConfig {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

/// Base URL overrides, e.g. for mirrors.
#[derive(Debug, Deserialize, Default)]
pub struct EndpointsConfig {
    pub ecosystems: Option<String>,
    pub deps_dev: Option<String>,
    pub scorecard: Option<String>,
    pub osv: Option<String>,
    pub snyk: Option<String>,
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SnykConfig {
    pub org_id: Option<String>,
    pub token_env: Option<String>,
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

impl RetryConfig {
    fn base_delay(&self) -> Duration {
        self.base_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_BASE_DELAY)
    }

    fn max_delay(&self) -> Duration {
        self.max_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_MAX_DELAY)
    }
}

impl ConfigFile {
    /// Builds stage settings, falling back to defaults for every value the
    /// file leaves out. `env_org_id` is used when the file names no Snyk
    /// organization.
    pub fn source_settings(&self, env_org_id: Option<String>) -> SourceSettings {
        let mut settings = SourceSettings::default();

        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency;
        }
        if let Some(seconds) = self.timeout_seconds {
            settings.timeout = Duration::from_secs(seconds);
        }
        if let Some(rate_limit) = &self.rate_limit {
            if let Some(rps) = rate_limit.requests_per_second {
                settings.requests_per_second = rps;
            }
            if let Some(burst) = rate_limit.burst {
                settings.burst = burst;
            }
        }
        if let Some(retry) = &self.retry {
            settings.retry = RetryPolicy::new(
                retry.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
                retry.base_delay(),
                retry.max_delay(),
            );
        }
        if let Some(endpoints) = &self.endpoints {
            let target = &mut settings.endpoints;
            for (value, slot) in [
                (&endpoints.ecosystems, &mut target.ecosystems),
                (&endpoints.deps_dev, &mut target.deps_dev),
                (&endpoints.scorecard, &mut target.scorecard),
                (&endpoints.osv, &mut target.osv),
                (&endpoints.snyk, &mut target.snyk),
            ] {
                if let Some(url) = value {
                    *slot = url.trim_end_matches('/').to_string();
                }
            }
        }

        let snyk = self.snyk.as_ref();
        settings.snyk_org_id = snyk
            .and_then(|s| s.org_id.clone())
            .or(env_org_id)
            .filter(|id| !id.trim().is_empty());
        if let Some(token_env) = snyk.and_then(|s| s.token_env.clone()) {
            settings.snyk_token_env = token_env;
        }

        settings
    }
}

/// Load config from an explicit path. Returns an error if the file is not found.
pub fn load_config_from_path(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read config file: {}\n\n💡 Hint: Check that the file exists and is readable.",
            path.display()
        )
    })?;

    let config: ConfigFile = serde_yaml_ng::from_str(&content).with_context(|| {
        format!(
            "Failed to parse config file: {}\n\n💡 Hint: Ensure the file contains valid YAML syntax.",
            path.display()
        )
    })?;

    validate_config(&config)?;
    warn_unknown_fields(&config);

    Ok(config)
}

/// Auto-discover config in a directory. Returns `None` silently if not found.
pub fn discover_config(dir: &Path) -> Result<Option<ConfigFile>> {
    let config_path = dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        return Ok(None);
    }

    let config = load_config_from_path(&config_path)?;
    Ok(Some(config))
}

/// Validates a concurrency value from either the file or the command line.
pub fn validate_concurrency(concurrency: usize) -> Result<()> {
    if !(1..=MAX_CONCURRENCY).contains(&concurrency) {
        bail!(
            "Invalid config: concurrency must be between 1 and {}, got {}.\n\n\
             💡 Hint: The default of 20 concurrent lookups suits most public APIs.",
            MAX_CONCURRENCY,
            concurrency
        );
    }
    Ok(())
}

/// Validate the loaded configuration.
fn validate_config(config: &ConfigFile) -> Result<()> {
    if let Some(concurrency) = config.concurrency {
        validate_concurrency(concurrency)?;
    }

    if config.timeout_seconds == Some(0) {
        bail!("Invalid config: timeout_seconds must be at least 1.");
    }

    if let Some(rate_limit) = &config.rate_limit {
        if rate_limit.requests_per_second == Some(0) {
            bail!("Invalid config: rate_limit.requests_per_second must be at least 1.");
        }
        if rate_limit.burst == Some(0) {
            bail!("Invalid config: rate_limit.burst must be at least 1.");
        }
    }

    if let Some(retry) = &config.retry {
        if retry.max_attempts == Some(0) {
            bail!(
                "Invalid config: retry.max_attempts must be at least 1.\n\n\
                 💡 Hint: Use 1 to disable retries."
            );
        }
        if retry.max_delay() < retry.base_delay() {
            bail!(
                "Invalid config: retry.max_delay_ms ({}) must not be smaller than retry.base_delay_ms ({}).",
                retry.max_delay().as_millis(),
                retry.base_delay().as_millis()
            );
        }
    }

    if let Some(endpoints) = &config.endpoints {
        for (key, value) in [
            ("ecosystems", &endpoints.ecosystems),
            ("deps_dev", &endpoints.deps_dev),
            ("scorecard", &endpoints.scorecard),
            ("osv", &endpoints.osv),
            ("snyk", &endpoints.snyk),
        ] {
            let Some(url) = value else { continue };
            let valid = reqwest::Url::parse(url)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                bail!(
                    "Invalid config: endpoints.{} is not an http(s) URL: '{}'.",
                    key,
                    url
                );
            }
        }
    }

    if let Some(token_env) = config.snyk.as_ref().and_then(|s| s.token_env.as_ref()) {
        if token_env.trim().is_empty() {
            bail!("Invalid config: snyk.token_env must not be empty.");
        }
    }

    Ok(())
}

/// Warn about unknown fields in the config file, nested sections included.
fn warn_unknown_fields(config: &ConfigFile) {
    for key in unknown_field_names(config) {
        eprintln!(
            "⚠️  Warning: Unknown config field '{}' will be ignored.",
            key
        );
    }
}

fn unknown_field_names(config: &ConfigFile) -> Vec<String> {
    let mut names: Vec<String> = config.unknown_fields.keys().cloned().collect();
    let sections = [
        ("rate_limit", config.rate_limit.as_ref().map(|s| &s.unknown_fields)),
        ("retry", config.retry.as_ref().map(|s| &s.unknown_fields)),
        ("endpoints", config.endpoints.as_ref().map(|s| &s.unknown_fields)),
        ("snyk", config.snyk.as_ref().map(|s| &s.unknown_fields)),
    ];
    for (section, fields) in sections {
        if let Some(fields) = fields {
            names.extend(fields.keys().map(|key| format!("{}.{}", section, key)));
        }
    }
    names.sort();
    names
}
