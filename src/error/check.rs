use thiserror::Error;

use super::HttpError;

/// A failed expectation inside a suite.
///
/// Returning one of these from a suite (or passing it to
/// `Reporter::report_errors` with `should_throw`) aborts the rest of that
/// suite; the runner itself keeps going.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("{method} {url}: expected status {expected}, received {actual}")]
    StatusMismatch {
        method: String,
        url: String,
        expected: u16,
        actual: u16,
    },
    #[error("{method} {url}: expected body key '{key}'")]
    MissingKey {
        method: String,
        url: String,
        key: String,
    },
    #[error("{method} {url}: expected header {name} = '{expected}', received {actual:?}")]
    HeaderMismatch {
        method: String,
        url: String,
        name: String,
        expected: String,
        actual: Option<String>,
    },
    #[error("{method} {url}: response body was not JSON: {source}")]
    InvalidJson {
        method: String,
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("suite panicked: {0}")]
    Panicked(String),
}

impl CheckError {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Compares two values and fails with an "expected vs received" message.
    ///
    /// # Errors
    ///
    /// Returns `CheckError::Message` when `actual != expected`.
    pub fn assert_eq<T>(actual: &T, expected: &T, label: &str) -> Result<(), Self>
    where
        T: PartialEq + std::fmt::Debug + ?Sized,
    {
        if actual == expected {
            return Ok(());
        }
        Err(Self::Message(format!(
            "{}: expected {:?}, received {:?}",
            label, expected, actual
        )))
    }
}

impl From<&'static str> for CheckError {
    fn from(message: &'static str) -> Self {
        Self::Message(message.to_owned())
    }
}

impl From<String> for CheckError {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}
