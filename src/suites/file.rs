use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::CheckError;
use crate::harness::{SuiteContext, TestModule};
use crate::http::Exchange;

use super::{check, error_contains, image_content_type, no_data};

const ID_HASH: &str = "21ec527041";
const OVERLAY_HASH: &str = "58dbec2886";
const NOT_FOUND_HASH: &str = "2343384832";
const INVALID_HASH: &str = "12345";
const NAMED_FILTER: &str = "utah-hero-image-desktop";
const CROP: &str = "top:0|left:0|width:100|height:100";
const UNCONSTRAINED: &str = "height:20|width:25|constrain:false";

/// File retrieval and on-the-fly transformations.
#[derive(Debug, Default)]
pub struct FileSuite;

#[async_trait]
impl TestModule for FileSuite {
    async fn run(&mut self, ctx: &SuiteContext) -> Result<(), CheckError> {
        ctx.suite("File endpoint");

        for hash in [NOT_FOUND_HASH, INVALID_HASH] {
            check(
                ctx,
                ctx.start("hive")
                    .get(&format!("/file/{}", hash))
                    .expect_key("data")
                    .soft_expect(no_data)
                    .expect_key("error")
                    .soft_expect(error_contains(format!("Invalid file ID '{}'", hash)))
                    .expect_status(404),
            )
            .await?;
        }

        check(
            ctx,
            ctx.start("hive")
                .get("/file")
                .expect_key("data")
                .soft_expect(no_data)
                .expect_key("error")
                .soft_expect(error_contains("Error: Missing ID".to_owned()))
                .expect_status(404),
        )
        .await?;

        image(ctx, &format!("/file/{}", ID_HASH)).await?;

        let transformations = [
            format!("crop={}", CROP),
            "resize=height:25".to_owned(),
            "resize=width:25".to_owned(),
            format!("resize={}", UNCONSTRAINED),
            format!("overlay=img:{}|height:20|width:25", OVERLAY_HASH),
            "grayscale=true".to_owned(),
            "quality=1".to_owned(),
            "interlace=partition".to_owned(),
            format!("order=crop,resize&crop={}&resize={}", CROP, UNCONSTRAINED),
        ];
        for fragment in transformations {
            let signed = ctx.sign(&fragment)?;
            image(ctx, &format!("/file/{}?{}", ID_HASH, signed)).await?;
        }

        let client_id = ctx
            .settings()
            .client_id()
            .ok_or_else(|| CheckError::message("No client_id configured for filter URLs"))?
            .to_owned();
        image(
            ctx,
            &format!("/file/{}?filter={}&c={}", ID_HASH, NAMED_FILTER, client_id),
        )
        .await?;
        let signed = ctx.sign("resize=width:28|height:28|constrain:false")?;
        image(
            ctx,
            &format!("/file/{}?filter={}&{}", ID_HASH, NAMED_FILTER, signed),
        )
        .await?;

        check(
            ctx,
            ctx.start("hive")
                .post("/file")
                .json(json!({
                    "clientId": client_id,
                    "id_hash": ID_HASH,
                    "post_action": "auto_generate_on_demand"
                }))
                .soft_expect(renditions_requested)
                .expect_status(200),
        )
        .await?;
        Ok(())
    }
}

async fn image(ctx: &SuiteContext, target: &str) -> Result<Exchange, CheckError> {
    check(
        ctx,
        ctx.start_with("hive", None, false, false)
            .get(target)
            .discard_body()
            .soft_expect(image_content_type)
            .expect_status(200),
    )
    .await
}

fn renditions_requested(exchange: &Exchange) -> Result<(), CheckError> {
    if let Some(error) = exchange.error_message() {
        return Err(CheckError::message(format!(
            "Post action returned {}",
            error
        )));
    }
    let message = exchange
        .data()
        .and_then(|data| data.get("message"))
        .and_then(Value::as_str)
        .ok_or_else(|| CheckError::message("Post action returned no message"))?;
    if message.contains("Successfully requested renditions") {
        Ok(())
    } else {
        Err(CheckError::message(format!(
            "Post action did not return success message, returned {}",
            message
        )))
    }
}
