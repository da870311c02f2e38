use std::{collections::HashMap, time::Duration};

use anyhow::{Context, bail};
use ec2_metadata::DEFAULT_ENDPOINT;
use url::Url;

const PREFIX: &str = "TERMINATION_HANDLER_";

pub const INTERVAL_KEY: &str = "TERMINATION_HANDLER_INTERVAL";
pub const METADATA_URL_KEY: &str = "TERMINATION_HANDLER_METADATA_URL";
pub const REQUEST_TIMEOUT_KEY: &str = "TERMINATION_HANDLER_REQUEST_TIMEOUT";

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

#[non_exhaustive]
pub struct Config {
    kv: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        let kv = std::env::vars()
            .filter(|(k, _)| k.starts_with(PREFIX))
            .collect();

        Self { kv }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn from_map(kv: HashMap<String, String>) -> Self {
        Self { kv }
    }

    pub fn optional(&self, key: &str) -> Option<&str> {
        self.kv.get(key).map(|v| v.as_str())
    }

    /// Reads a humantime duration such as `5s` or `1m30s`.
    pub fn duration(&self, key: &str) -> anyhow::Result<Option<Duration>> {
        self.optional(key)
            .map(|raw| {
                humantime::parse_duration(raw.trim())
                    .with_context(|| format!("config key '{key}' is not a duration: '{raw}'"))
            })
            .transpose()
    }
}

/// Resolved runtime settings. Command-line values win over the environment,
/// which wins over the built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub interval: Duration,
    pub metadata_url: String,
    pub request_timeout: Duration,
}

impl Settings {
    pub fn resolve(
        config: &Config,
        interval: Option<Duration>,
        metadata_url: Option<String>,
    ) -> anyhow::Result<Self> {
        let interval = match interval {
            Some(interval) => interval,
            None => config.duration(INTERVAL_KEY)?.unwrap_or(DEFAULT_INTERVAL),
        };

        let metadata_url = metadata_url
            .or_else(|| config.optional(METADATA_URL_KEY).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        validate_endpoint(&metadata_url)
            .with_context(|| format!("config key '{METADATA_URL_KEY}' is not usable"))?;

        let request_timeout = config
            .duration(REQUEST_TIMEOUT_KEY)?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        if request_timeout.is_zero() {
            bail!("config key '{REQUEST_TIMEOUT_KEY}' must be greater than zero");
        }

        Ok(Self {
            interval,
            metadata_url,
            request_timeout,
        })
    }
}

fn validate_endpoint(raw: &str) -> anyhow::Result<()> {
    let url = Url::parse(raw).with_context(|| format!("invalid metadata endpoint '{raw}'"))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => bail!("metadata endpoint '{raw}' has unsupported scheme '{scheme}'"),
    }
}
