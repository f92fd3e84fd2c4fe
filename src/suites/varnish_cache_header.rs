use async_trait::async_trait;

use crate::error::CheckError;
use crate::harness::{SuiteContext, TestModule};
use crate::http::Exchange;

use super::check;

const ID_HASH: &str = "2343384831";

#[derive(Debug, Default)]
pub struct VarnishCacheHeaderSuite;

#[async_trait]
impl TestModule for VarnishCacheHeaderSuite {
    async fn run(&mut self, ctx: &SuiteContext) -> Result<(), CheckError> {
        ctx.suite("Cache-Control header should be unset when sent to varnish");

        let cache = ctx.endpoint("stagevarnish")?.to_owned();
        check(
            ctx,
            ctx.start_with("hive", Some(&cache), false, false)
                .get(&format!("/file/{}", ID_HASH))
                .header("Cache-Control", "no-cache")
                .discard_body()
                .soft_expect(|exchange: &Exchange| {
                    exchange.header("cache-control").map_or(Ok(()), |value| {
                        Err(CheckError::message(format!(
                            "Cache-Control was not unset from the varnish request: {}",
                            value
                        )))
                    })
                }),
        )
        .await?;
        Ok(())
    }
}
