use async_trait::async_trait;
use futures_util::future::join_all;

use crate::error::CheckError;
use crate::harness::{SuiteContext, TestModule};
use crate::http::Exchange;

use super::{check_with, length_note};

const CACHED_IMAGE: &str = "/file/f6655d7361/hive/apthumbnail/image";

/// Fetches the same rendition from every cache replica at once.
#[derive(Debug, Default)]
pub struct VarnishGetSuite;

#[async_trait]
impl TestModule for VarnishGetSuite {
    async fn run(&mut self, ctx: &SuiteContext) -> Result<(), CheckError> {
        ctx.suite("Retrieving from our Varnish servers");

        let servers = ctx.settings().varnish();
        if servers.is_empty() {
            return Err(CheckError::message("No varnish servers configured"));
        }

        let fetches = servers.iter().map(|server| {
            check_with(
                ctx,
                ctx.start_with("hive", Some(server.as_str()), false, false)
                    .get(CACHED_IMAGE)
                    .discard_body()
                    .expect_status(200)
                    .expect_header("Content-Type", "image/jpeg")
                    .expect(|exchange: &Exchange| {
                        exchange
                            .header("age")
                            .map(|_age| ())
                            .ok_or_else(|| CheckError::message("Expected an Age header"))
                    }),
                length_note,
            )
        });
        let mut fetched = Vec::with_capacity(servers.len());
        let mut failures = Vec::new();
        for outcome in join_all(fetches).await {
            match outcome {
                Ok(exchange) => fetched.push(exchange),
                Err(err) => failures.push(err),
            }
        }
        let mut remaining = failures.into_iter();
        if let Some(first) = remaining.next() {
            for later in remaining {
                ctx.log_errors(later);
            }
            return Err(first);
        }

        let lengths: Vec<&str> = fetched.iter().filter_map(Exchange::content_length).collect();
        if let Some((first, rest)) = lengths.split_first() {
            for length in rest {
                CheckError::assert_eq(length, first, "Content length")?;
            }
        }
        Ok(())
    }
}
