use async_trait::async_trait;
use base64::Engine as _;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

use crate::error::{CheckError, HttpError};
use crate::harness::{SuiteContext, TestModule};
use crate::http::Exchange;

use super::{check, data_field, has_error};

/// 1x1 transparent GIF used as upload payload.
const SAMPLE_IMAGE: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];
const SAMPLE_NAME: &str = "flowers.gif";
const RENAMED: &str = "flowers-are-neat.gif";

const REQUIRED_FIELDS: [&str; 10] = [
    "id",
    "id_hash",
    "name",
    "type",
    "size",
    "date_created",
    "url",
    "pretty_name",
    "file_hash",
    "metadata",
];

/// Upload, read, update, and delete a media document.
#[derive(Debug, Default)]
pub struct DocSuite {
    id: Option<String>,
    download_url: Option<String>,
}

#[async_trait]
impl TestModule for DocSuite {
    async fn run(&mut self, ctx: &SuiteContext) -> Result<(), CheckError> {
        ctx.suite("Pulling, uploading, updating, and deleting media");
        self.upload(ctx).await?;
        self.read(ctx).await?;
        self.update(ctx).await?;
        self.delete(ctx).await?;
        s3_errors(ctx).await
    }
}

impl DocSuite {
    async fn upload(&mut self, ctx: &SuiteContext) -> Result<(), CheckError> {
        let contents = base64::engine::general_purpose::STANDARD.encode(SAMPLE_IMAGE);

        check(
            ctx,
            ctx.start("hive")
                .post("/doc")
                .json(json!({ "contents": contents }))
                .expect_key("error")
                .expect(has_error("name"))
                .expect_status(400),
        )
        .await?;

        let created = check(
            ctx,
            ctx.start("hive")
                .post("/doc")
                .json(json!({ "contents": contents, "name": SAMPLE_NAME }))
                .expect(valid_media_response)
                .expect_status(201),
        )
        .await?;
        self.id = data_field(&created, "id");
        self.download_url = data_field(&created, "url");
        let Some(id) = self.id.clone() else {
            return Err(CheckError::message(
                "Upload did not return an id; skipping the rest of the document checks",
            ));
        };

        check(
            ctx,
            ctx.start("utah")
                .post("/doc")
                .json(json!({ "contents": contents, "name": SAMPLE_NAME }))
                .expect(has_error("permissions"))
                .expect_status(401),
        )
        .await?;

        check(
            ctx,
            ctx.start("hive")
                .post("/doc")
                .json(json!({ "download_url": "fake.com" }))
                .expect_key("error")
                .expect(has_error("url"))
                .expect_status(400),
        )
        .await?;

        if let Some(download_url) = self.download_url.clone() {
            check(
                ctx,
                ctx.start("hive")
                    .post("/doc")
                    .json(json!({ "download_url": download_url }))
                    .expect(valid_media_response)
                    .expect(same_id(&id))
                    .expect_status(201),
            )
            .await?;
        }

        check(
            ctx,
            ctx.start("hive")
                .post("/doc")
                .json(json!({ "foo": "bar" }))
                .expect(has_error("unknown method"))
                .expect_status(400),
        )
        .await?;

        let part = Part::bytes(SAMPLE_IMAGE.to_vec())
            .file_name(SAMPLE_NAME)
            .mime_str("image/gif")
            .map_err(|err| HttpError::BuildRequestFailed { source: err })?;
        check(
            ctx,
            ctx.start_with("hive", None, true, true)
                .post("/doc")
                .form(Form::new().part("file", part))
                .expect(valid_media_response)
                .expect(same_id(&id))
                .expect_status(201),
        )
        .await?;
        Ok(())
    }

    async fn read(&self, ctx: &SuiteContext) -> Result<(), CheckError> {
        check(
            ctx,
            ctx.start("hive")
                .get("/doc/fakeid")
                .expect_key("data")
                .expect(has_error("missing asset"))
                .expect_status(404),
        )
        .await?;

        if let Some(id) = self.id.as_deref() {
            check(
                ctx,
                ctx.start("hive")
                    .get(&format!("/doc/{}", id))
                    .expect_key("data")
                    .expect(valid_media_response)
                    .expect_status(200),
            )
            .await?;
        }
        Ok(())
    }

    async fn update(&self, ctx: &SuiteContext) -> Result<(), CheckError> {
        let Some(id) = self.id.as_deref() else {
            return Ok(());
        };
        let path = format!("/doc/{}", id);

        check(
            ctx,
            ctx.start("hive")
                .put(&path)
                .json(json!({
                    "name": RENAMED,
                    "pools": [10, 14],
                    "metadata": {
                        "caption": [
                            { "value": "I want to ride my bicycle", "_is_canonical": 1 },
                            { "value": "I don't want to ride my bicycle", "_is_canonical": 0 }
                        ],
                        "foo": [{ "value": "bar", "_is_canonical": 0 }]
                    }
                }))
                .expect(valid_media_response)
                .expect(same_id(id))
                .expect(updated_document)
                .expect_status(200),
        )
        .await?;

        check(
            ctx,
            ctx.start("ksl")
                .put(&path)
                .json(json!({
                    "name": RENAMED,
                    "metadata": {
                        "caption": [
                            {
                                "value": "HIVE - I don't want to ride my bicycle",
                                "_is_canonical": 0
                            }
                        ]
                    }
                }))
                .expect(valid_media_response)
                .expect_status(200),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, ctx: &SuiteContext) -> Result<(), CheckError> {
        let Some(id) = self.id.as_deref() else {
            return Ok(());
        };
        let path = format!("/doc/{}", id);

        check(
            ctx,
            ctx.start("utah")
                .delete(&path)
                .expect(|exchange: &Exchange| {
                    deleted_count(exchange, 0, "Should have failed to delete")
                }),
        )
        .await?;

        check(
            ctx,
            ctx.start("hive")
                .get(&path)
                .expect_key("data")
                .expect(valid_media_response)
                .expect_status(200),
        )
        .await?;

        check(
            ctx,
            ctx.start("hive")
                .delete(&path)
                .expect(|exchange: &Exchange| deleted_count(exchange, 1, "Failed to delete")),
        )
        .await?;

        check(
            ctx,
            ctx.start("hive")
                .get(&path)
                .expect_key("error")
                .expect(has_error("missing asset"))
                .expect_status(404),
        )
        .await?;
        Ok(())
    }
}

async fn s3_errors(ctx: &SuiteContext) -> Result<(), CheckError> {
    check(
        ctx,
        ctx.start("hive")
            .post("/doc")
            .json(json!({ "s3_location": "doesntmatter" }))
            .expect(has_error("name"))
            .expect_status(400),
    )
    .await?;

    check(
        ctx,
        ctx.start("hive")
            .post("/doc")
            .json(json!({
                "s3_location": "doesntmatter",
                "name": "doesntmatter",
                "pools": [10, 14]
            }))
            .expect(has_error("pools"))
            .expect_status(400),
    )
    .await?;
    Ok(())
}

/// A well-formed media payload: `error` is null and every required field of
/// `data` is present, with `pools` an array and `metadata` an object.
fn valid_media_response(exchange: &Exchange) -> Result<(), CheckError> {
    let body = exchange.json()?;
    let error_is_null = body.get("error").is_some_and(Value::is_null);
    let data = body.get("data").filter(|data| data.is_object());
    let missing: Vec<&str> = data.map_or_else(
        || vec!["data"],
        |data| {
            REQUIRED_FIELDS
                .iter()
                .copied()
                .filter(|field| data.get(*field).is_none_or(is_blank))
                .collect()
        },
    );
    let pools_ok = data
        .and_then(|data| data.get("pools"))
        .is_some_and(Value::is_array);
    let metadata_ok = data
        .and_then(|data| data.get("metadata"))
        .is_some_and(Value::is_object);

    if error_is_null && missing.is_empty() && pools_ok && metadata_ok {
        return Ok(());
    }
    Err(CheckError::message(format!(
        "Response not formatted correctly: error null = {}, missing fields {:?}, pools array = {}, metadata object = {}",
        error_is_null, missing, pools_ok, metadata_ok
    )))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(text) => text.is_empty(),
        Value::Bool(true) | Value::Number(_) | Value::Array(_) | Value::Object(_) => false,
    }
}

fn same_id(id: &str) -> impl Fn(&Exchange) -> Result<(), CheckError> + Send + Sync + '_ {
    move |exchange| {
        let returned = data_field(exchange, "id");
        CheckError::assert_eq(&returned.as_deref(), &Some(id), "Expected ids to be the same")
    }
}

fn updated_document(exchange: &Exchange) -> Result<(), CheckError> {
    let Some(data) = exchange.data() else {
        return Err(CheckError::message("Update returned no data"));
    };
    let mut problems = Vec::new();
    if data.get("name").and_then(Value::as_str) != Some(RENAMED) {
        problems.push("Name was not updated correctly");
    }
    let pools = data.get("pools").and_then(Value::as_array);
    let has_pool = |pool: u64| {
        pools.is_some_and(|pools| pools.iter().any(|value| value.as_u64() == Some(pool)))
    };
    if !has_pool(10) || !has_pool(14) {
        problems.push("Pools were not updated correctly");
    }
    let metadata = data.get("metadata");
    if metadata.and_then(|metadata| metadata.get("width")).is_none() {
        problems.push("Existing metadata was overwritten and should not have been");
    }
    let entries = |key: &str| {
        metadata
            .and_then(|metadata| metadata.get(key))
            .and_then(Value::as_array)
            .map(Vec::len)
    };
    if entries("caption") != Some(2) {
        problems.push("Caption did not update correctly");
    }
    if entries("foo") != Some(1) {
        problems.push("Custom metadata did not update correctly");
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(CheckError::message(problems.join("; ")))
    }
}

fn deleted_count(exchange: &Exchange, expected: u64, message: &str) -> Result<(), CheckError> {
    match exchange.data().and_then(Value::as_u64) {
        Some(count) if count == expected => Ok(()),
        Some(_) | None => Err(CheckError::message(message.to_owned())),
    }
}
