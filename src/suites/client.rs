use async_trait::async_trait;

use crate::error::CheckError;
use crate::harness::{SuiteContext, TestModule};

use super::{check, non_empty_data};

#[derive(Debug, Default)]
pub struct ClientSuite;

#[async_trait]
impl TestModule for ClientSuite {
    async fn run(&mut self, ctx: &SuiteContext) -> Result<(), CheckError> {
        ctx.suite("Pulling clients should work properly");

        check(
            ctx,
            ctx.start("hive")
                .get("/client")
                .expect_key("data")
                .expect(non_empty_data)
                .expect_status(200),
        )
        .await?;
        Ok(())
    }
}
