use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::error::{AppResult, CheckError};
use crate::http::{Exchange, RequestBuilder, RequestHandle, UrlSigner};
use crate::report::Reporter;

/// Fixed delay used when a suite waits for propagation without saying how long.
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(500);

/// Everything a suite can reach while it runs.
#[derive(Clone)]
pub struct SuiteContext {
    settings: Arc<Settings>,
    requests: RequestBuilder,
    signer: UrlSigner,
    reporter: Reporter,
}

impl SuiteContext {
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(settings: Settings, reporter: Reporter) -> AppResult<Self> {
        let requests = RequestBuilder::new(&settings, reporter.clone())?;
        Ok(Self::from_parts(settings, requests, reporter))
    }

    #[must_use]
    pub fn from_parts(settings: Settings, requests: RequestBuilder, reporter: Reporter) -> Self {
        let signer = UrlSigner::new(settings.key());
        Self {
            settings: Arc::new(settings),
            requests,
            signer,
            reporter,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub const fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    #[must_use]
    pub fn start(&self, client: &str) -> RequestHandle {
        self.requests.start(client)
    }

    #[must_use]
    pub fn start_with(
        &self,
        client: &str,
        base: Option<&str>,
        multipart: bool,
        expect_json: bool,
    ) -> RequestHandle {
        self.requests
            .start_with(client, base, multipart, expect_json)
    }

    /// Signs `fragment` for the configured default client id.
    ///
    /// # Errors
    ///
    /// Fails when no `client_id` is configured.
    pub fn sign(&self, fragment: &str) -> Result<String, CheckError> {
        let client_id = self
            .settings
            .client_id()
            .ok_or_else(|| CheckError::message("No client_id configured for URL signing"))?;
        Ok(self.signer.sign(fragment, client_id))
    }

    #[must_use]
    pub fn sign_as(&self, fragment: &str, client_id: &str) -> String {
        self.signer.sign(fragment, client_id)
    }

    /// # Errors
    ///
    /// Fails when the named server is not configured.
    pub fn endpoint(&self, name: &str) -> Result<&str, CheckError> {
        self.settings
            .endpoint(name)
            .map_err(|err| CheckError::message(err.to_string()))
    }

    #[must_use]
    pub fn report(&self, exchange: Exchange) -> Exchange {
        self.reporter.report(exchange)
    }

    #[must_use]
    pub fn report_with(&self, exchange: Exchange, extras: &str) -> Exchange {
        self.reporter.report_with(exchange, extras)
    }

    pub fn log_errors<E>(&self, err: E)
    where
        E: Into<CheckError>,
    {
        self.reporter.log_errors(err);
    }

    /// # Errors
    ///
    /// Propagates `err` when `should_throw` is set.
    pub fn report_errors<E>(&self, err: Option<E>, should_throw: bool) -> Result<(), CheckError>
    where
        E: Into<CheckError>,
    {
        self.reporter.report_errors(err, should_throw)
    }

    pub fn suite(&self, title: &str) {
        self.reporter.suite(title);
    }

    /// Announces and waits out a fixed delay (cache invalidation and the like).
    pub async fn pause(&self, duration: Duration) {
        self.reporter
            .notice(&format!("Timeout set for {} ms", duration.as_millis()));
        tokio::time::sleep(duration).await;
    }
}
