use async_trait::async_trait;
use serde_json::Value;

use crate::error::CheckError;
use crate::harness::{SuiteContext, TestModule};
use crate::http::{Exchange, PendingRequest};

use super::{check, has_error, non_empty_data};

const SEARCH_LIMIT: usize = 40;
const FILE_HASH: &str = "7cb3f8f2e64d1a9ebfa1eb0230b1de00";
/// Pool id to the client that owns it.
const POOL_OWNERS: [(&str, u64); 2] = [("331", 21), ("357", 20)];

#[derive(Debug, Default)]
pub struct SearchSuite;

#[async_trait]
impl TestModule for SearchSuite {
    async fn run(&mut self, ctx: &SuiteContext) -> Result<(), CheckError> {
        ctx.suite("Searching should return appropriate results");

        check(
            ctx,
            listing(ctx, "*:*")
                .expect_key("data")
                .soft_expect(non_empty_data)
                .soft_expect(|exchange: &Exchange| {
                    CheckError::assert_eq(&results(exchange).len(), &SEARCH_LIMIT, "Search limit")
                })
                .soft_expect(sorted_newest_first)
                .expect_status(200),
        )
        .await?;

        check(
            ctx,
            listing(ctx, "*:*")
                .query("pool_ids[0]", "357")
                .expect_key("data")
                .soft_expect(single_pool_owned_by_client)
                .expect_status(200),
        )
        .await?;

        check(
            ctx,
            listing(ctx, FILE_HASH)
                .expect_key("data")
                .soft_expect(|exchange: &Exchange| {
                    CheckError::assert_eq(&results(exchange).len(), &1, "File hash search results")
                })
                .expect_status(200),
        )
        .await?;

        check(
            ctx,
            listing(ctx, "Hello World")
                .expect_key("data")
                .soft_expect(non_empty_data)
                .expect_status(200),
        )
        .await?;

        check(
            ctx,
            ctx.start("hive")
                .get("/search")
                .expect_key("error")
                .soft_expect(has_error("empty query"))
                .expect_status(400),
        )
        .await?;

        check(
            ctx,
            ctx.start("hive")
                .get("/search")
                .query("q", "hello")
                .expect_key("data")
                .soft_expect(non_empty_data)
                .expect_status(200),
        )
        .await?;
        Ok(())
    }
}

/// Limited search sorted by creation date, newest first.
fn listing<'check>(ctx: &SuiteContext, phrase: &str) -> PendingRequest<'check> {
    ctx.start("hive")
        .get("/search")
        .query("q", phrase)
        .query("offset", "0")
        .query("sort", "date_created:desc")
        .query("limit", SEARCH_LIMIT.to_string())
}

fn results(exchange: &Exchange) -> &[Value] {
    exchange
        .data()
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice)
}

fn sorted_newest_first(exchange: &Exchange) -> Result<(), CheckError> {
    let dates: Vec<&str> = results(exchange)
        .iter()
        .filter_map(|media| media.get("date_created").and_then(Value::as_str))
        .collect();
    if dates.windows(2).all(|pair| match pair {
        [newer, older] => newer >= older,
        _ => true,
    }) {
        Ok(())
    } else {
        Err(CheckError::message(
            "Search results were not sorted by date_created descending",
        ))
    }
}

fn single_pool_owned_by_client(exchange: &Exchange) -> Result<(), CheckError> {
    for media in results(exchange) {
        let pools = media
            .get("pools")
            .and_then(Value::as_array)
            .map_or(&[][..], Vec::as_slice);
        let [pool] = pools else {
            return Err(CheckError::message(format!(
                "Expected exactly one pool per result, found {}",
                pools.len()
            )));
        };
        let pool = match pool {
            Value::Number(number) => number.to_string(),
            Value::String(text) => text.clone(),
            Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => String::new(),
        };
        let owner = POOL_OWNERS
            .iter()
            .find(|(pool_id, _)| *pool_id == pool)
            .map(|(_, client)| *client);
        let client = media.get("client_id").and_then(Value::as_u64);
        if owner.is_none() || owner != client {
            return Err(CheckError::message(format!(
                "Pool {} returned for client {:?}, expected {:?}",
                pool, client, owner
            )));
        }
    }
    Ok(())
}
