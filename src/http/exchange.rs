use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;

use crate::error::CheckError;

/// A completed request/response pair.
#[derive(Debug, Clone)]
pub struct Exchange {
    method: Method,
    url: Url,
    status: StatusCode,
    headers: HeaderMap,
    elapsed: Duration,
    body: Vec<u8>,
    json: Option<Value>,
}

impl Exchange {
    /// Assembles an exchange; `parse_json` decodes the body eagerly.
    #[must_use]
    pub fn from_parts(
        method: Method,
        url: Url,
        status: StatusCode,
        headers: HeaderMap,
        elapsed: Duration,
        body: Vec<u8>,
        parse_json: bool,
    ) -> Self {
        let json = if parse_json {
            serde_json::from_slice(&body).ok()
        } else {
            None
        };
        Self {
            method,
            url,
            status,
            headers,
            elapsed,
            body,
            json,
        }
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The decoded JSON body.
    ///
    /// # Errors
    ///
    /// Returns `CheckError::InvalidJson` when the body was not decoded as
    /// JSON (non-JSON handle or malformed payload).
    pub fn json(&self) -> Result<&Value, CheckError> {
        if let Some(json) = self.json.as_ref() {
            return Ok(json);
        }
        match serde_json::from_slice::<Value>(&self.body) {
            Err(source) => Err(CheckError::InvalidJson {
                method: self.method.to_string(),
                url: self.url.to_string(),
                source,
            }),
            Ok(_) => Err(CheckError::message(format!(
                "{} {}: body was not decoded as JSON for this request",
                self.method, self.url
            ))),
        }
    }

    /// `body.data`, when present and not null.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.json
            .as_ref()
            .and_then(|json| json.get("data"))
            .filter(|value| !value.is_null())
    }

    /// `body.error` rendered as text, when present and non-empty.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let error = self.json.as_ref()?.get("error")?;
        let text = match error {
            Value::String(text) => text.clone(),
            Value::Null | Value::Bool(false) => return None,
            Value::Bool(true) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
                error.to_string()
            }
        };
        if text.is_empty() { None } else { Some(text) }
    }

    #[must_use]
    pub fn content_length(&self) -> Option<&str> {
        self.header("content-length")
    }
}
