use std::collections::BTreeMap;

use crate::config::Settings;
use crate::error::{AppError, AppResult, ConfigError};

/// A logical client name paired with the token its requests carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub name: String,
    pub token: String,
}

/// Maps client names to access tokens, falling back to the process-wide key.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    tokens: BTreeMap<String, String>,
    default_token: String,
}

impl CredentialResolver {
    /// # Errors
    ///
    /// Returns `ConfigError::MissingKey` when `default_token` is empty; there
    /// is no valid state without at least one usable credential.
    pub fn new(
        tokens: BTreeMap<String, String>,
        default_token: impl Into<String>,
    ) -> AppResult<Self> {
        let default_token = default_token.into();
        if default_token.is_empty() {
            return Err(AppError::config(ConfigError::MissingKey));
        }
        Ok(Self {
            tokens,
            default_token,
        })
    }

    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            tokens: settings.client_tokens().clone(),
            default_token: settings.key().to_owned(),
        }
    }

    /// Returns the explicit token for `client`, or the default token when the
    /// name is unknown or mapped to an empty value.
    #[must_use]
    pub fn resolve(&self, client: &str) -> &str {
        self.tokens
            .get(client)
            .map(String::as_str)
            .filter(|token| !token.is_empty())
            .unwrap_or(&self.default_token)
    }

    #[must_use]
    pub fn identity(&self, client: &str) -> ClientIdentity {
        ClientIdentity {
            name: client.to_owned(),
            token: self.resolve(client).to_owned(),
        }
    }
}
