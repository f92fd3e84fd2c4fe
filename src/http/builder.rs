use std::sync::Arc;

use reqwest::{Client, Method};

use crate::config::Settings;
use crate::error::{AppError, AppResult, HttpError};
use crate::report::Reporter;

use super::credentials::CredentialResolver;
use super::decorators::{IdentityHeaders, Preview, RequestDecorator};
use super::request::PendingRequest;

/// Everything that determines header injection and body handling for one
/// exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfiguration {
    pub base_url: String,
    pub client_name: String,
    pub multipart: bool,
    pub expect_json: bool,
}

/// Produces per-client request handles sharing one HTTP client and one
/// decorator pipeline.
#[derive(Clone)]
pub struct RequestBuilder {
    client: Client,
    default_base: String,
    credentials: CredentialResolver,
    decorators: Vec<Arc<dyn RequestDecorator>>,
    reporter: Option<Reporter>,
}

impl RequestBuilder {
    /// Builds the standard pipeline: identity headers, then the verbose
    /// preview stage.
    ///
    /// # Errors
    ///
    /// Returns `HttpError::BuildClientFailed` when the HTTP client cannot be
    /// constructed.
    pub fn new(settings: &Settings, reporter: Reporter) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|err| AppError::http(HttpError::BuildClientFailed { source: err }))?;
        let credentials = CredentialResolver::from_settings(settings);
        Ok(Self::bare(client, settings.base(), credentials.clone())
            .with_decorator(IdentityHeaders::new(credentials))
            .with_decorator(Preview::new(settings.verbose(), reporter.clone()))
            .with_reporter(reporter))
    }

    /// A builder without any decorators. Soft expectation failures go to
    /// `tracing` until a reporter is attached.
    #[must_use]
    pub fn bare(client: Client, default_base: &str, credentials: CredentialResolver) -> Self {
        Self {
            client,
            default_base: default_base.trim_end_matches('/').to_owned(),
            credentials,
            decorators: Vec::new(),
            reporter: None,
        }
    }

    /// Where soft expectation failures are printed.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Appends a stage to the end of the pipeline.
    #[must_use]
    pub fn with_decorator<D>(mut self, decorator: D) -> Self
    where
        D: RequestDecorator + 'static,
    {
        self.decorators.push(Arc::new(decorator));
        self
    }

    #[must_use]
    pub const fn credentials(&self) -> &CredentialResolver {
        &self.credentials
    }

    #[must_use]
    pub fn default_base(&self) -> &str {
        &self.default_base
    }

    /// JSON handle against the default base URL.
    #[must_use]
    pub fn start(&self, client_name: &str) -> RequestHandle {
        self.start_with(client_name, None, false, true)
    }

    /// An empty or missing `base_override` falls back to the default base.
    #[must_use]
    pub fn start_with(
        &self,
        client_name: &str,
        base_override: Option<&str>,
        multipart: bool,
        expect_json: bool,
    ) -> RequestHandle {
        let base_url = base_override
            .filter(|base| !base.is_empty())
            .map_or_else(
                || self.default_base.clone(),
                |base| base.trim_end_matches('/').to_owned(),
            );
        RequestHandle {
            client: self.client.clone(),
            config: RequestConfiguration {
                base_url,
                client_name: client_name.to_owned(),
                multipart,
                expect_json,
            },
            decorators: self.decorators.clone(),
            reporter: self.reporter.clone(),
        }
    }
}

/// A configured, not-yet-dispatched request factory for one client.
#[derive(Clone)]
pub struct RequestHandle {
    client: Client,
    config: RequestConfiguration,
    decorators: Vec<Arc<dyn RequestDecorator>>,
    reporter: Option<Reporter>,
}

impl RequestHandle {
    #[must_use]
    pub const fn config(&self) -> &RequestConfiguration {
        &self.config
    }

    #[must_use]
    pub fn get<'check>(&self, path: &str) -> PendingRequest<'check> {
        self.request(Method::GET, path)
    }

    #[must_use]
    pub fn post<'check>(&self, path: &str) -> PendingRequest<'check> {
        self.request(Method::POST, path)
    }

    #[must_use]
    pub fn put<'check>(&self, path: &str) -> PendingRequest<'check> {
        self.request(Method::PUT, path)
    }

    #[must_use]
    pub fn patch<'check>(&self, path: &str) -> PendingRequest<'check> {
        self.request(Method::PATCH, path)
    }

    #[must_use]
    pub fn delete<'check>(&self, path: &str) -> PendingRequest<'check> {
        self.request(Method::DELETE, path)
    }

    /// Any verb, including extension methods such as `PURGE`.
    ///
    /// # Errors
    ///
    /// Returns `HttpError::InvalidMethod` when `method` is not a valid token.
    pub fn method<'check>(
        &self,
        method: &str,
        path: &str,
    ) -> Result<PendingRequest<'check>, HttpError> {
        let parsed = Method::from_bytes(method.as_bytes()).map_err(|_invalid| {
            HttpError::InvalidMethod {
                method: method.to_owned(),
            }
        })?;
        Ok(self.request(parsed, path))
    }

    fn request<'check>(&self, method: Method, path: &str) -> PendingRequest<'check> {
        PendingRequest::new(
            self.client.clone(),
            self.config.clone(),
            self.decorators.clone(),
            self.reporter.clone(),
            method,
            path,
        )
    }
}
