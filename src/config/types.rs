use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

/// On-disk configuration (`media-e2e.toml` / `media-e2e.json`).
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub base: Option<String>,
    pub key: Option<String>,
    /// Client name -> access token.
    #[serde(default)]
    pub keys: BTreeMap<String, String>,
    #[serde(alias = "clientId")]
    pub client_id: Option<ClientId>,
    #[serde(default)]
    pub varnish: Vec<String>,
    pub stage: Option<String>,
    pub stagevarnish: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub verbose: Option<bool>,
}

/// Client ids show up both as JSON numbers and strings in existing configs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ClientId {
    Number(u64),
    Text(String),
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientId::Number(value) => write!(f, "{}", value),
            ClientId::Text(value) => f.write_str(value),
        }
    }
}
