//! Suites bundled with the runner, one per API area.

mod client;
mod doc;
mod file;
mod filter;
mod pool;
mod search;
mod stage_fail;
mod varnish_cache_header;
mod varnish_get;

use serde_json::Value;

use crate::error::{CheckError, HarnessError};
use crate::harness::{SuiteContext, SuiteRegistry};
use crate::http::{Exchange, PendingRequest};

pub use client::ClientSuite;
pub use doc::DocSuite;
pub use file::FileSuite;
pub use filter::FilterSuite;
pub use pool::PoolSuite;
pub use search::SearchSuite;
pub use stage_fail::StageFailSuite;
pub use varnish_cache_header::VarnishCacheHeaderSuite;
pub use varnish_get::VarnishGetSuite;

/// # Errors
///
/// Returns an error when a name is already taken in `registry`.
pub fn register_builtins(registry: &mut SuiteRegistry) -> Result<(), HarnessError> {
    registry.register("client", ClientSuite::default)?;
    registry.register("doc", DocSuite::default)?;
    registry.register("file", FileSuite::default)?;
    registry.register("filter", FilterSuite::default)?;
    registry.register("pool", PoolSuite::default)?;
    registry.register("search", SearchSuite::default)?;
    registry.register("prod-varnish-get", VarnishGetSuite::default)?;
    registry.register("stage-fail", StageFailSuite::default)?;
    registry.register(
        "stage-varnish-cache-header-purge",
        VarnishCacheHeaderSuite::default,
    )?;
    Ok(())
}

/// Sends `request` and reports the exchange.
///
/// # Errors
///
/// Returns the first failed hard expectation, which aborts the calling
/// suite once propagated.
async fn check(ctx: &SuiteContext, request: PendingRequest<'_>) -> Result<Exchange, CheckError> {
    check_with(ctx, request, |_exchange: &Exchange| String::new()).await
}

/// Like [`check`], with a trailing annotation derived from the response.
///
/// # Errors
///
/// Same as [`check`].
async fn check_with<F>(
    ctx: &SuiteContext,
    request: PendingRequest<'_>,
    extras: F,
) -> Result<Exchange, CheckError>
where
    F: FnOnce(&Exchange) -> String,
{
    let exchange = request.end().await?;
    let extras = extras(&exchange);
    Ok(ctx.report_with(exchange, &extras))
}

fn length_note(exchange: &Exchange) -> String {
    format!("| length: {}", exchange.content_length().unwrap_or("-"))
}

/// Fails unless the body carries a non-empty `error`.
fn has_error(label: &'static str) -> impl Fn(&Exchange) -> Result<(), CheckError> + Send + Sync {
    move |exchange| {
        exchange
            .error_message()
            .map(|_message| ())
            .ok_or_else(|| CheckError::message(format!("Expected {} error", label)))
    }
}

/// Fails when the body's `error` does not mention `needle`.
fn error_contains(needle: String) -> impl Fn(&Exchange) -> Result<(), CheckError> + Send + Sync {
    move |exchange| match exchange.error_message() {
        Some(message) if message.contains(needle.as_str()) => Ok(()),
        Some(message) => Err(CheckError::message(format!(
            "Error message '{}' did not mention '{}'",
            message, needle
        ))),
        None => Err(CheckError::message(format!(
            "Expected an error mentioning '{}'",
            needle
        ))),
    }
}

/// Fails when `data` is present.
fn no_data(exchange: &Exchange) -> Result<(), CheckError> {
    exchange.data().map_or(Ok(()), |_data| {
        Err(CheckError::message(
            "Found data for a request that should not have matched anything",
        ))
    })
}

/// Fails unless `data` is a non-empty array.
fn non_empty_data(exchange: &Exchange) -> Result<(), CheckError> {
    match exchange.data().and_then(Value::as_array) {
        Some(items) if !items.is_empty() => Ok(()),
        Some(_) | None => Err(CheckError::message("Expected a non-empty data array")),
    }
}

fn image_content_type(exchange: &Exchange) -> Result<(), CheckError> {
    match exchange.header("content-type") {
        Some(value) if value.starts_with("image/") => Ok(()),
        other => Err(CheckError::message(format!(
            "Expected an image content type, received {:?}",
            other
        ))),
    }
}

/// `data.<field>` as text, accepting numbers and strings.
fn data_field(exchange: &Exchange, field: &str) -> Option<String> {
    match exchange.data()?.get(field)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Null
        | Value::Bool(_)
        | Value::String(_)
        | Value::Array(_)
        | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests;
