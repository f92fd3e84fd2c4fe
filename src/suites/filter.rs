use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::error::CheckError;
use crate::harness::{SuiteContext, TestModule};
use crate::http::Exchange;

use super::{check, data_field, error_contains, has_error};

const DELETE_KEY: &str = "gpXHu7ipNtL94kvm";
const DEFAULT_PARAMS: &str = "resize=width_300-height_300";
const ID_FIELDS: &[&str] = &["id"];
const ID_NAME_FIELDS: &[&str] = &["id", "name"];
const PERMISSION_DENIED: &str =
    "You do not have permission to perform the requested action with this resource";

#[derive(Debug, Clone)]
struct SavedFilter {
    client: &'static str,
    id: String,
    name: String,
}

/// Create, update, read, and delete named rendition filters.
#[derive(Debug, Default)]
pub struct FilterSuite {
    hive: Option<SavedFilter>,
    utah: Option<SavedFilter>,
    dc: Option<SavedFilter>,
}

#[async_trait]
impl TestModule for FilterSuite {
    async fn run(&mut self, ctx: &SuiteContext) -> Result<(), CheckError> {
        ctx.suite("Posting, putting, and getting filters");

        rejected_posts(ctx).await?;
        let hive = create(
            ctx,
            "hive",
            json!({ "client_id": 14, "name": "E2E Hive filter", "params": DEFAULT_PARAMS }),
            json!({
                "name": "E2E Hive filter",
                "params": DEFAULT_PARAMS,
                "auto_generate_on_upload": 0,
                "auto_generate_on_demand": 0,
                "ttl_days": 7
            }),
        )
        .await?;
        self.hive = Some(hive);
        let utah = create(
            ctx,
            "utah",
            json!({ "client_id": 15, "name": "E2E Utah.com filter", "params": DEFAULT_PARAMS }),
            json!({
                "name": "E2E Utah.com filter",
                "params": DEFAULT_PARAMS,
                "auto_generate_on_upload": 0,
                "auto_generate_on_demand": 0,
                "ttl_days": 7
            }),
        )
        .await?;
        self.utah = Some(utah);
        let dc_filter = json!({
            "name": "E2E DC filter",
            "params": "crop=top:0|left:0|width:500|height:10&resize=width:500&order=resize,crop",
            "auto_generate_on_upload": 1,
            "auto_generate_on_demand": 1,
            "ttl_days": 10
        });
        let dc = create(ctx, "dc", dc_filter.clone(), dc_filter).await?;
        self.dc = Some(dc);

        self.updates(ctx).await?;
        self.reads(ctx).await?;
        self.cleanup(ctx).await
    }
}

async fn rejected_posts(ctx: &SuiteContext) -> Result<(), CheckError> {
    let cases = [
        ("hive", json!({ "client_id": 14 }), "missing name"),
        (
            "hive",
            json!({ "client_id": 14, "name": "E2E Invalid filter" }),
            "missing params",
        ),
        (
            "utah",
            json!({
                "id": 15,
                "client_id": 1,
                "name": "E2E Hive filter",
                "params": DEFAULT_PARAMS
            }),
            "cannot post with ID",
        ),
    ];
    for (client, body, label) in cases {
        check(
            ctx,
            ctx.start(client)
                .post("/filter")
                .json(body)
                .expect_key("data")
                .expect(has_error(label))
                .expect_status(400),
        )
        .await?;
    }
    Ok(())
}

async fn create(
    ctx: &SuiteContext,
    client: &'static str,
    body: Value,
    saved: Value,
) -> Result<SavedFilter, CheckError> {
    let exchange = check(
        ctx,
        ctx.start(client)
            .post("/filter")
            .json(body)
            .expect_key("data")
            .expect(move |exchange: &Exchange| {
                let id = exchange
                    .data()
                    .and_then(|data| data.get("id"))
                    .cloned()
                    .ok_or_else(|| {
                        CheckError::message(format!(
                            "POST ({}): Expected an ID, but none returned.",
                            client
                        ))
                    })?;
                matches_saved(exchange, &with_id(&saved, id), client)
            })
            .expect_status(200),
    )
    .await?;
    let field = |name: &str| {
        data_field(&exchange, name).ok_or_else(|| {
            CheckError::message(format!("POST ({}): saved filter has no {}", client, name))
        })
    };
    Ok(SavedFilter {
        client,
        id: field("id")?,
        name: field("name")?,
    })
}

impl FilterSuite {
    async fn updates(&self, ctx: &SuiteContext) -> Result<(), CheckError> {
        check(
            ctx,
            ctx.start("hive")
                .put("/filter")
                .json(json!({ "client_id": 14 }))
                .expect_key("data")
                .expect(error_contains("ID".to_owned()))
                .expect_status(400),
        )
        .await?;

        if let Some(hive) = &self.hive {
            check(
                ctx,
                ctx.start("hive")
                    .put(&format!("/filter/{}", hive.id))
                    .json(json!({
                        "client_id": 14,
                        "name": hive.name,
                        "params": "crop=invalid"
                    }))
                    .expect_key("data")
                    .expect(error_contains("Invalid value".to_owned()))
                    .expect_status(500),
            )
            .await?;
        }

        let Some(dc) = &self.dc else {
            return Ok(());
        };
        let renamed = format!("{}!", dc.name);
        let partial_params = "crop=&resize=width:&order=resize,crop";

        check(
            ctx,
            ctx.start("hive")
                .put(&format!("/filter/{}", dc.id))
                .json(json!({ "client_id": 14, "name": renamed, "params": partial_params }))
                .expect_key("data")
                .expect(error_contains(PERMISSION_DENIED.to_owned()))
                .expect_status(401),
        )
        .await?;

        if let Some(hive) = &self.hive {
            check(
                ctx,
                ctx.start("dc")
                    .put(&format!("/filter/{}", hive.id))
                    .json(json!({
                        "client_id": 6,
                        "name": format!("{}!", hive.name),
                        "params": partial_params
                    }))
                    .expect_key("data")
                    .expect(error_contains(PERMISSION_DENIED.to_owned()))
                    .expect_status(401),
            )
            .await?;
        }

        let partial = json!({
            "id": dc.id,
            "name": renamed,
            "params": partial_params,
            "auto_generate_on_upload": 1,
            "auto_generate_on_demand": 1,
            "ttl_days": 10
        });
        check(
            ctx,
            ctx.start("dc")
                .put(&format!("/filter/{}", dc.id))
                .json(json!({ "client_id": 6, "name": renamed, "params": partial_params }))
                .expect_key("data")
                .expect(move |exchange: &Exchange| matches_saved(exchange, &partial, "dc"))
                .expect_status(200),
        )
        .await?;

        let full = json!({
            "id": dc.id,
            "name": dc.name,
            "params": DEFAULT_PARAMS,
            "auto_generate_on_upload": 0,
            "auto_generate_on_demand": 0,
            "ttl_days": 5
        });
        check(
            ctx,
            ctx.start("dc")
                .put(&format!("/filter/{}", dc.id))
                .json(json!({
                    "client_id": 6,
                    "name": dc.name,
                    "params": DEFAULT_PARAMS,
                    "auto_generate_on_upload": 0,
                    "auto_generate_on_demand": 0,
                    "ttl_days": 5
                }))
                .expect_key("data")
                .expect(move |exchange: &Exchange| matches_saved(exchange, &full, "dc"))
                .expect_status(200),
        )
        .await?;
        Ok(())
    }

    async fn reads(&self, ctx: &SuiteContext) -> Result<(), CheckError> {
        if let Some(hive) = &self.hive {
            check(
                ctx,
                ctx.start("hive")
                    .get(&format!("/filter/{}", hive.id))
                    .expect_key("data")
                    .expect(|exchange: &Exchange| match exchange.data() {
                        Some(Value::Object(_)) => Ok(()),
                        other => Err(CheckError::message(format!(
                            "GET by ID (HIVE): Expected a single object, received {:?}",
                            other
                        ))),
                    })
                    .expect_status(200),
            )
            .await?;
        }

        for (fields, allowed) in [("id", ID_FIELDS), ("id,name", ID_NAME_FIELDS)] {
            check(
                ctx,
                ctx.start("hive")
                    .get("/filter")
                    .query("fields", fields)
                    .expect_key("data")
                    .soft_expect(move |exchange: &Exchange| only_fields(exchange, allowed))
                    .expect_status(200),
            )
            .await?;
        }
        Ok(())
    }

    async fn cleanup(&self, ctx: &SuiteContext) -> Result<(), CheckError> {
        for saved in [&self.hive, &self.utah, &self.dc].into_iter().flatten() {
            ctx.reporter()
                .line(&format!("Deleting filter with ID: {}", saved.id));
            check(
                ctx,
                ctx.start(saved.client)
                    .delete(&format!("/filter/{}", saved.id))
                    .json(json!({ "id": saved.id, "deleteKey": DELETE_KEY }))
                    .expect_key("data")
                    .expect(|exchange: &Exchange| {
                        exchange.error_message().map_or(Ok(()), |error| {
                            Err(CheckError::message(format!(
                                "DELETE: Error deleting filter: {}",
                                error
                            )))
                        })
                    })
                    .expect_status(200),
            )
            .await?;
        }
        Ok(())
    }
}

fn with_id(saved: &Value, id: Value) -> Value {
    let mut object = Map::new();
    object.insert("id".to_owned(), id);
    if let Some(fields) = saved.as_object() {
        for (key, value) in fields {
            object.insert(key.clone(), value.clone());
        }
    }
    Value::Object(object)
}

fn matches_saved(exchange: &Exchange, expected: &Value, client: &str) -> Result<(), CheckError> {
    match exchange.data() {
        Some(data) if data == expected => Ok(()),
        other => Err(CheckError::message(format!(
            "{}: saved filter did not match. Expected {}, received {}",
            client,
            expected,
            other.map_or_else(|| "nothing".to_owned(), Value::to_string)
        ))),
    }
}

/// Every listed item carries each allowed field and nothing else.
fn only_fields(exchange: &Exchange, allowed: &[&str]) -> Result<(), CheckError> {
    let Some(items) = exchange.data().and_then(Value::as_array) else {
        return Err(CheckError::message("GET fields: Expected results to be an array."));
    };
    let conforming = items.iter().all(|item| {
        item.as_object().is_some_and(|object| {
            allowed.iter().all(|field| object.contains_key(*field))
                && object.keys().all(|key| allowed.contains(&key.as_str()))
        })
    });
    if conforming {
        Ok(())
    } else {
        Err(CheckError::message(format!(
            "GET fields: items did not match the requested fields {:?}",
            allowed
        )))
    }
}
