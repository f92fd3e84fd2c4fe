use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::CheckError;
use crate::harness::{SuiteContext, TestModule};
use crate::http::Exchange;

use super::{check, data_field, non_empty_data};

const DELETE_KEY: &str = "gpXHu7ipNtL94kvm";

/// Create, list, update, and delete storage pools.
#[derive(Debug, Default)]
pub struct PoolSuite {
    hive_pool: Option<String>,
    utah_pool: Option<String>,
}

#[async_trait]
impl TestModule for PoolSuite {
    async fn run(&mut self, ctx: &SuiteContext) -> Result<(), CheckError> {
        ctx.suite("Posting and getting pools");

        check(
            ctx,
            ctx.start("utah")
                .post("/pool")
                .json(json!({
                    "name": "Test bad request Utah.com Pool",
                    "client_access": { "15": ["edit"] },
                    "storage_id": 1
                }))
                .expect_key("data")
                .expect(rejected)
                .expect_status(400),
        )
        .await?;

        check(
            ctx,
            ctx.start("utah")
                .post("/pool/1")
                .json(json!({
                    "id": 1,
                    "name": "Test post with id Utah.com Pool",
                    "client_access": { "15": ["edit"] },
                    "storage_id": 15
                }))
                .expect_key("data")
                .expect(rejected)
                .expect_status(400),
        )
        .await?;

        let hive_pool = create(
            ctx,
            "hive",
            json!({
                "name": "Test Hive Pool",
                "client_access": { "14": ["edit"] },
                "storage_id": 14
            }),
        )
        .await?;
        self.hive_pool = Some(hive_pool);
        let utah_pool = create(
            ctx,
            "utah",
            json!({
                "name": "Test Utah.com Pool",
                "client_access": { "14": ["view"], "15": ["edit"] },
                "storage_id": 15
            }),
        )
        .await?;
        self.utah_pool = Some(utah_pool);

        self.listings(ctx).await?;
        self.update(ctx).await?;
        self.cleanup(ctx).await
    }
}

async fn create(ctx: &SuiteContext, client: &str, body: Value) -> Result<String, CheckError> {
    let exchange = check(
        ctx,
        ctx.start(client)
            .post("/pool")
            .json(body)
            .expect_key("data")
            .expect(created_pool)
            .expect_status(200),
    )
    .await?;
    data_field(&exchange, "id")
        .ok_or_else(|| CheckError::message(format!("POST pool ({}) returned no id", client)))
}

impl PoolSuite {
    async fn listings(&self, ctx: &SuiteContext) -> Result<(), CheckError> {
        let hive_pool = self.hive_pool.clone();
        check(
            ctx,
            ctx.start("hive")
                .get("/pool")
                .expect_key("data")
                .expect(non_empty_data)
                .expect(move |exchange: &Exchange| {
                    listed(exchange, hive_pool.as_deref(), |_pool| true)
                })
                .expect_status(200),
        )
        .await?;

        let utah_pool = self.utah_pool.clone();
        check(
            ctx,
            ctx.start("hive")
                .get("/pool/all")
                .expect_key("data")
                .expect(non_empty_data)
                .expect(move |exchange: &Exchange| {
                    listed(exchange, utah_pool.as_deref(), |pool| {
                        pool.get("client_access")
                            .and_then(|access| access.get("14"))
                            .is_some()
                    })
                })
                .expect_status(200),
        )
        .await?;

        for pool in [&self.hive_pool, &self.utah_pool].into_iter().flatten() {
            let expected = pool.clone();
            check(
                ctx,
                ctx.start("hive")
                    .get(&format!("/pool/{}", pool))
                    .expect_key("data")
                    .expect(move |exchange: &Exchange| {
                        let id = data_field(exchange, "id");
                        CheckError::assert_eq(&id, &Some(expected.clone()), "GET pool by id")
                    })
                    .expect_status(200),
            )
            .await?;
        }
        Ok(())
    }

    async fn update(&self, ctx: &SuiteContext) -> Result<(), CheckError> {
        let Some(utah_pool) = self.utah_pool.clone() else {
            return Ok(());
        };
        check(
            ctx,
            ctx.start("utah")
                .put("/pool")
                .json(json!({
                    "id": utah_pool,
                    "name": "Test Utah.com Pool",
                    "client_access": { "15": ["edit"] },
                    "storage_id": 15
                }))
                .expect_key("data")
                .expect(move |exchange: &Exchange| {
                    CheckError::assert_eq(
                        &data_field(exchange, "id"),
                        &Some(utah_pool.clone()),
                        "PUT pool id",
                    )?;
                    let dropped_hive = exchange
                        .data()
                        .and_then(|data| data.get("client_access"))
                        .is_some_and(|access| access.get("14").is_none());
                    if dropped_hive {
                        Ok(())
                    } else {
                        Err(CheckError::message("PUT pool did not replace client_access"))
                    }
                })
                .expect_status(200),
        )
        .await?;
        Ok(())
    }

    async fn cleanup(&self, ctx: &SuiteContext) -> Result<(), CheckError> {
        let owned = [("hive", &self.hive_pool), ("utah", &self.utah_pool)];
        for (client, pool) in owned {
            let Some(pool) = pool else {
                continue;
            };
            check(
                ctx,
                ctx.start(client)
                    .delete(&format!("/pool/{}", pool))
                    .json(json!({ "id": pool, "deleteKey": DELETE_KEY }))
                    .expect_key("data")
                    .expect(|exchange: &Exchange| {
                        exchange.error_message().map_or(Ok(()), |error| {
                            Err(CheckError::message(format!("DELETE pool failed: {}", error)))
                        })
                    })
                    .expect_status(200),
            )
            .await?;
        }
        Ok(())
    }
}

/// Rejected writes carry `error`, `errorId`, and a null `data`.
fn rejected(exchange: &Exchange) -> Result<(), CheckError> {
    let body = exchange.json()?;
    if exchange.error_message().is_none() {
        return Err(CheckError::message("Expected an error message"));
    }
    if body.get("errorId").is_none_or(Value::is_null) {
        return Err(CheckError::message("Expected an errorId"));
    }
    if !body.get("data").is_some_and(Value::is_null) {
        return Err(CheckError::message("Expected data to be null"));
    }
    Ok(())
}

fn created_pool(exchange: &Exchange) -> Result<(), CheckError> {
    let Some(data) = exchange.data() else {
        return Err(CheckError::message("Pool creation returned no data"));
    };
    let missing: Vec<&str> = ["id", "client_id", "name", "client_access", "storage_id"]
        .into_iter()
        .filter(|field| data.get(*field).is_none_or(Value::is_null))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CheckError::message(format!(
            "Pool response is missing {:?}",
            missing
        )))
    }
}

fn listed<P>(exchange: &Exchange, id: Option<&str>, accept: P) -> Result<(), CheckError>
where
    P: Fn(&Value) -> bool,
{
    let Some(id) = id else {
        return Ok(());
    };
    let found = exchange
        .data()
        .and_then(Value::as_array)
        .is_some_and(|pools| {
            pools.iter().any(|pool| {
                pool.get("id").is_some_and(|value| match value {
                    Value::String(text) => text == id,
                    Value::Number(number) => number.to_string() == id,
                    Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => false,
                }) && accept(pool)
            })
        });
    if found {
        Ok(())
    } else {
        Err(CheckError::message(format!("Pool {} was not listed", id)))
    }
}
