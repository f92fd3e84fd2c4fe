use reqwest::Request;
use reqwest::header::{
    ACCEPT, ACCEPT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT,
};

use crate::error::HttpError;
use crate::report::Reporter;

use super::builder::RequestConfiguration;
use super::credentials::CredentialResolver;

pub const TOOL_USER_AGENT: &str = "media-library-end-to-end";
pub const CLIENT_ACCESS_TOKEN: &str = "client-access-token";
pub const REQUESTING_FOR: &str = "x-requesting-for";
pub const ACCEPT_JSON: &str = "application/json,text/plain;q=0.9,*/*;q=0.8";
pub const ACCEPT_MEDIA: &str = "application/json,binary,text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8,image/gif";
pub const ACCEPT_COMPRESSED: &str = "gzip, deflate, br";
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// One stage of the pre-dispatch pipeline. Stages run in registration order
/// against the fully built request.
pub trait RequestDecorator: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when a header value cannot be encoded.
    fn decorate(
        &self,
        request: &mut Request,
        config: &RequestConfiguration,
    ) -> Result<(), HttpError>;
}

/// Injects identity and content-negotiation headers.
#[derive(Debug, Clone)]
pub struct IdentityHeaders {
    credentials: CredentialResolver,
}

impl IdentityHeaders {
    #[must_use]
    pub const fn new(credentials: CredentialResolver) -> Self {
        Self { credentials }
    }
}

impl RequestDecorator for IdentityHeaders {
    fn decorate(
        &self,
        request: &mut Request,
        config: &RequestConfiguration,
    ) -> Result<(), HttpError> {
        let headers = request.headers_mut();
        set_header(headers, USER_AGENT, TOOL_USER_AGENT)?;
        set_header(
            headers,
            HeaderName::from_static(CLIENT_ACCESS_TOKEN),
            self.credentials.resolve(&config.client_name),
        )?;
        set_header(
            headers,
            HeaderName::from_static(REQUESTING_FOR),
            &config.client_name,
        )?;
        let accept = if config.expect_json {
            ACCEPT_JSON
        } else {
            ACCEPT_MEDIA
        };
        set_header(headers, ACCEPT, accept)?;
        set_header(headers, ACCEPT_ENCODING, ACCEPT_COMPRESSED)?;
        if config.multipart {
            // A form body already carries the boundary-qualified value.
            let has_form_type = headers
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.starts_with(MULTIPART_FORM_DATA));
            if !has_form_type {
                set_header(headers, CONTENT_TYPE, MULTIPART_FORM_DATA)?;
            }
        }
        Ok(())
    }
}

fn set_header(headers: &mut HeaderMap, name: HeaderName, value: &str) -> Result<(), HttpError> {
    let value = HeaderValue::from_str(value).map_err(|err| HttpError::InvalidHeader {
        name: name.to_string(),
        source: err,
    })?;
    headers.insert(name, value);
    Ok(())
}

/// Logs method, URL, and requesting client before dispatch when verbose.
#[derive(Debug, Clone)]
pub struct Preview {
    verbose: bool,
    reporter: Reporter,
}

impl Preview {
    #[must_use]
    pub const fn new(verbose: bool, reporter: Reporter) -> Self {
        Self { verbose, reporter }
    }
}

impl RequestDecorator for Preview {
    fn decorate(
        &self,
        request: &mut Request,
        config: &RequestConfiguration,
    ) -> Result<(), HttpError> {
        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            client = %config.client_name,
            "dispatching request"
        );
        if self.verbose {
            let client = request
                .headers()
                .get(REQUESTING_FOR)
                .and_then(|value| value.to_str().ok())
                .unwrap_or(&config.client_name);
            self.reporter
                .preview(request.method().as_str(), request.url().as_str(), client);
        }
        Ok(())
    }
}
