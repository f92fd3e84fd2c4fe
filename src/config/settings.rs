use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Url;

use crate::error::{AppError, AppResult, ConfigError};

use super::types::ConfigFile;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Values that take precedence over the config file (CLI flags and the
/// `BASE` / `KEY` / `VERBOSE` environment variables).
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub base: Option<String>,
    pub key: Option<String>,
    pub verbose: bool,
}

/// Immutable run configuration, built once at start-up and handed to every
/// component that needs it.
#[derive(Debug, Clone)]
pub struct Settings {
    base: String,
    key: String,
    keys: BTreeMap<String, String>,
    client_id: Option<String>,
    endpoints: BTreeMap<String, String>,
    varnish: Vec<String>,
    request_timeout: Duration,
    verbose: bool,
}

impl Settings {
    /// Creates settings with a base URL and the process-wide key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingKey` for an empty key and
    /// `ConfigError::InvalidBaseUrl` when `base` does not parse.
    pub fn new(base: impl Into<String>, key: impl Into<String>) -> AppResult<Self> {
        let base = base.into();
        let key = key.into();
        if key.is_empty() {
            return Err(AppError::config(ConfigError::MissingKey));
        }
        let base = validate_url(base)?;
        Ok(Self {
            base,
            key,
            keys: BTreeMap::new(),
            client_id: None,
            endpoints: BTreeMap::new(),
            varnish: Vec::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            verbose: false,
        })
    }

    /// Merges an optional config file with start-up overrides.
    ///
    /// # Errors
    ///
    /// Fails when no key or base URL is available from any source, or when
    /// one of the configured URLs is invalid.
    pub fn from_sources(config: Option<ConfigFile>, overrides: Overrides) -> AppResult<Self> {
        let config = config.unwrap_or_default();
        let key = overrides
            .key
            .or(config.key)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::config(ConfigError::MissingKey))?;
        let base = overrides
            .base
            .or(config.base)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::config(ConfigError::MissingBaseUrl))?;

        let mut settings = Self::new(base, key)?;
        settings.keys = config.keys;
        settings.client_id = config.client_id.map(|id| id.to_string());
        if let Some(stage) = config.stage {
            settings = settings.with_endpoint("stage", stage)?;
        }
        if let Some(stagevarnish) = config.stagevarnish {
            settings = settings.with_endpoint("stagevarnish", stagevarnish)?;
        }
        for replica in config.varnish {
            settings = settings.with_varnish(replica)?;
        }
        if let Some(timeout_ms) = config.request_timeout_ms {
            settings.request_timeout = Duration::from_millis(timeout_ms);
        }
        settings.verbose = overrides.verbose || config.verbose.unwrap_or(false);
        Ok(settings)
    }

    #[must_use]
    pub fn with_client_token(
        mut self,
        client: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        self.keys.insert(client.into(), token.into());
        self
    }

    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Registers a named alternate server (e.g. `stage`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` when `url` does not parse.
    pub fn with_endpoint(
        mut self,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> AppResult<Self> {
        self.endpoints.insert(name.into(), validate_url(url.into())?);
        Ok(self)
    }

    /// Adds a cache-layer replica used for cross-server comparisons.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` when `url` does not parse.
    pub fn with_varnish(mut self, url: impl Into<String>) -> AppResult<Self> {
        self.varnish.push(validate_url(url.into())?);
        Ok(self)
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub const fn client_tokens(&self) -> &BTreeMap<String, String> {
        &self.keys
    }

    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Looks up a named alternate server.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownEndpoint` when the name was never
    /// configured.
    pub fn endpoint(&self, name: &str) -> AppResult<&str> {
        self.endpoints
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| {
                AppError::config(ConfigError::UnknownEndpoint {
                    name: name.to_owned(),
                })
            })
    }

    #[must_use]
    pub fn varnish(&self) -> &[String] {
        &self.varnish
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }
}

fn validate_url(url: String) -> AppResult<String> {
    match Url::parse(&url) {
        Ok(_) => Ok(url.trim_end_matches('/').to_owned()),
        Err(err) => Err(AppError::config(ConfigError::InvalidBaseUrl { url, source: err })),
    }
}
