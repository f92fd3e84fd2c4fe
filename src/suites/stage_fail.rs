use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::CheckError;
use crate::harness::{SuiteContext, TestModule};
use crate::http::{Exchange, PendingRequest};
use crate::retry::retry;

use super::{check, check_with, length_note};

const STAGED_IMAGE: &str = "/file/a937415581/hive/apthumbnail/image";
const FAIL_HEADER: &str = "x-fail-please";
const WARM_REQUESTS: usize = 10;

/// Forced-failure behavior of the stage origin and its cache.
#[derive(Debug, Default)]
pub struct StageFailSuite;

#[async_trait]
impl TestModule for StageFailSuite {
    async fn run(&mut self, ctx: &SuiteContext) -> Result<(), CheckError> {
        ctx.suite("Retrieve from stage");

        let stage = ctx.endpoint("stage")?.to_owned();
        let cache = ctx.endpoint("stagevarnish")?.to_owned();

        check_with(
            ctx,
            ctx.start_with("hive", Some(&cache), false, false)
                .method("PURGE", STAGED_IMAGE)?
                .discard_body(),
            |exchange: &Exchange| {
                format!(
                    "| STATUS: {} | HEADERS: {}",
                    exchange.status().as_u16(),
                    exchange.headers().len()
                )
            },
        )
        .await?;

        check_with(
            ctx,
            image(ctx, &cache)
                .header(FAIL_HEADER, "true")
                .expect_status(503),
            length_note,
        )
        .await?;

        check_with(
            ctx,
            image(ctx, &cache)
                .expect_status(200)
                .expect_header("Content-Type", "image/jpeg"),
            length_note,
        )
        .await?;

        let attempts = AtomicUsize::new(0);
        let failure: Mutex<Option<CheckError>> = Mutex::new(None);
        retry(
            || {
                let attempt = attempts.fetch_add(1, Ordering::Relaxed);
                let cache = cache.as_str();
                let failure = &failure;
                async move {
                    if failure
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .is_some()
                    {
                        return;
                    }
                    let outcome = check_with(
                        ctx,
                        image(ctx, cache)
                            .expect_status(200)
                            .expect_header("Content-Type", "image/jpeg"),
                        |exchange: &Exchange| format!("| {} {}", attempt, length_note(exchange)),
                    )
                    .await;
                    if let Err(err) = outcome {
                        *failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
                    }
                }
            },
            WARM_REQUESTS,
        )
        .await;
        if let Some(err) = failure.into_inner().unwrap_or_else(PoisonError::into_inner) {
            return Err(err);
        }

        check_with(
            ctx,
            image(ctx, &stage)
                .header(FAIL_HEADER, "true")
                .expect_status(500)
                .expect_header("Content-Type", "application/json"),
            length_note,
        )
        .await?;

        check(
            ctx,
            image(ctx, &stage)
                .expect_status(200)
                .expect_header("Content-Type", "image/jpeg"),
        )
        .await?;
        Ok(())
    }
}

fn image<'check>(ctx: &SuiteContext, server: &str) -> PendingRequest<'check> {
    ctx.start_with("hive", Some(server), false, false)
        .get(STAGED_IMAGE)
        .discard_body()
}
