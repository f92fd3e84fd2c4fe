use std::sync::Arc;

use reqwest::multipart::Form;
use reqwest::{Client, Method, Request, Url};
use serde_json::Value;
use tokio::time::Instant;

use crate::error::{CheckError, HttpError};
use crate::report::Reporter;

use super::builder::RequestConfiguration;
use super::decorators::RequestDecorator;
use super::exchange::Exchange;

type CheckFn<'check> = Box<dyn Fn(&Exchange) -> Result<(), CheckError> + Send + Sync + 'check>;

enum Body {
    Empty,
    Json(Value),
    Form(Form),
}

enum Expectation<'check> {
    Status(u16),
    Key(String),
    Header { name: String, value: String },
    Check(CheckFn<'check>),
    /// Logged on failure; the rest of the chain still runs.
    Soft(CheckFn<'check>),
}

impl Expectation<'_> {
    fn verify(&self, exchange: &Exchange, reporter: Option<&Reporter>) -> Result<(), CheckError> {
        match self {
            Expectation::Status(expected) => {
                let actual = exchange.status().as_u16();
                if actual == *expected {
                    return Ok(());
                }
                Err(CheckError::StatusMismatch {
                    method: exchange.method().to_string(),
                    url: exchange.url().to_string(),
                    expected: *expected,
                    actual,
                })
            }
            Expectation::Key(key) => {
                if exchange.json()?.get(key).is_some() {
                    return Ok(());
                }
                Err(CheckError::MissingKey {
                    method: exchange.method().to_string(),
                    url: exchange.url().to_string(),
                    key: key.clone(),
                })
            }
            Expectation::Header { name, value } => {
                let actual = exchange.header(name);
                if actual == Some(value.as_str()) {
                    return Ok(());
                }
                Err(CheckError::HeaderMismatch {
                    method: exchange.method().to_string(),
                    url: exchange.url().to_string(),
                    name: name.clone(),
                    expected: value.clone(),
                    actual: actual.map(str::to_owned),
                })
            }
            Expectation::Check(check) => check(exchange),
            Expectation::Soft(check) => {
                if let Err(err) = check(exchange) {
                    log_soft_failure(reporter, err);
                }
                Ok(())
            }
        }
    }
}

/// A request being assembled: verb and path are fixed, headers, query, body,
/// and expectations are chained on, and nothing is sent until [`end`].
///
/// [`end`]: PendingRequest::end
pub struct PendingRequest<'check> {
    client: Client,
    config: RequestConfiguration,
    decorators: Vec<Arc<dyn RequestDecorator>>,
    reporter: Option<Reporter>,
    method: Method,
    target: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    body: Body,
    discard_body: bool,
    expectations: Vec<Expectation<'check>>,
}

impl<'check> PendingRequest<'check> {
    #[must_use]
    pub(super) fn new(
        client: Client,
        config: RequestConfiguration,
        decorators: Vec<Arc<dyn RequestDecorator>>,
        reporter: Option<Reporter>,
        method: Method,
        target: &str,
    ) -> Self {
        Self {
            client,
            config,
            decorators,
            reporter,
            method,
            target: target.to_owned(),
            headers: Vec::new(),
            query: Vec::new(),
            body: Body::Empty,
            discard_body: false,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    #[must_use]
    pub fn form(mut self, form: Form) -> Self {
        self.body = Body::Form(form);
        self
    }

    /// Drops the response body instead of decoding it (image endpoints).
    #[must_use]
    pub const fn discard_body(mut self) -> Self {
        self.discard_body = true;
        self
    }

    #[must_use]
    pub fn expect_status(mut self, status: u16) -> Self {
        self.expectations.push(Expectation::Status(status));
        self
    }

    #[must_use]
    pub fn expect_key(mut self, key: impl Into<String>) -> Self {
        self.expectations.push(Expectation::Key(key.into()));
        self
    }

    #[must_use]
    pub fn expect_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.expectations.push(Expectation::Header {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Adds a custom check; checks run in the order they were chained and
    /// the first failure ends the exchange with that error.
    #[must_use]
    pub fn expect<F>(mut self, check: F) -> Self
    where
        F: Fn(&Exchange) -> Result<(), CheckError> + Send + Sync + 'check,
    {
        self.expectations.push(Expectation::Check(Box::new(check)));
        self
    }

    /// Adds a check whose failure is only printed. Later expectations
    /// still run and the exchange can still succeed.
    #[must_use]
    pub fn soft_expect<F>(mut self, check: F) -> Self
    where
        F: Fn(&Exchange) -> Result<(), CheckError> + Send + Sync + 'check,
    {
        self.expectations.push(Expectation::Soft(Box::new(check)));
        self
    }

    /// Builds the request and runs it through the decorator pipeline without
    /// sending it.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL, a header, or the body is invalid.
    pub fn build(self) -> Result<Request, HttpError> {
        self.into_parts().map(|(request, _dispatch)| request)
    }

    /// Sends the request, waits for the full body, and runs every
    /// expectation in order.
    ///
    /// # Errors
    ///
    /// Returns the first failed expectation, or the transport error when the
    /// exchange could not complete.
    pub async fn end(self) -> Result<Exchange, CheckError> {
        let (request, dispatch) = self.into_parts()?;
        dispatch.send(request).await
    }

    /// Runs the chained expectations against an exchange that was already
    /// recorded, without sending anything.
    ///
    /// # Errors
    ///
    /// Returns the first failed hard expectation, or a build error.
    pub fn verify(self, exchange: &Exchange) -> Result<(), CheckError> {
        let (_request, dispatch) = self.into_parts()?;
        dispatch.verify(exchange)
    }

    fn resolve_url(&self) -> Result<Url, HttpError> {
        let raw = if self.target.starts_with("http://") || self.target.starts_with("https://") {
            self.target.clone()
        } else {
            format!("{}{}", self.config.base_url, self.target)
        };
        let mut url = Url::parse(&raw).map_err(|err| HttpError::InvalidUrl {
            url: raw.clone(),
            source: err,
        })?;
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn into_parts(self) -> Result<(Request, Dispatch<'check>), HttpError> {
        let url = self.resolve_url()?;
        let mut builder = self.client.request(self.method, url);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match self.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Form(form) => builder.multipart(form),
        };
        let mut request = builder
            .build()
            .map_err(|err| HttpError::BuildRequestFailed { source: err })?;
        for decorator in &self.decorators {
            decorator.decorate(&mut request, &self.config)?;
        }
        Ok((
            request,
            Dispatch {
                client: self.client,
                reporter: self.reporter,
                parse_json: self.config.expect_json && !self.discard_body,
                discard_body: self.discard_body,
                expectations: self.expectations,
            },
        ))
    }
}

struct Dispatch<'check> {
    client: Client,
    reporter: Option<Reporter>,
    parse_json: bool,
    discard_body: bool,
    expectations: Vec<Expectation<'check>>,
}

impl Dispatch<'_> {
    async fn send(self, request: Request) -> Result<Exchange, CheckError> {
        let method = request.method().clone();
        let url = request.url().clone();
        let started = Instant::now();
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|err| HttpError::RequestFailed {
                url: url.to_string(),
                source: err,
            })?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(|err| HttpError::ReadBody {
            url: url.to_string(),
            source: err,
        })?;
        let elapsed = started.elapsed();
        let body = if self.discard_body {
            Vec::new()
        } else {
            bytes.to_vec()
        };

        let exchange =
            Exchange::from_parts(method, url, status, headers, elapsed, body, self.parse_json);
        self.verify(&exchange)?;
        Ok(exchange)
    }

    fn verify(&self, exchange: &Exchange) -> Result<(), CheckError> {
        for expectation in &self.expectations {
            expectation.verify(exchange, self.reporter.as_ref())?;
        }
        Ok(())
    }
}

fn log_soft_failure(reporter: Option<&Reporter>, err: CheckError) {
    if let Some(reporter) = reporter {
        reporter.log_errors(err);
        return;
    }
    tracing::warn!(error = %err, "soft expectation failed");
}
