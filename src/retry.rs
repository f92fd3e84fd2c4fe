//! Fixed-count repetition of an async operation.
//!
//! Despite the name, [`retry`] does not stop on success or inspect results:
//! it always performs every attempt and always reports `true`. Callers that
//! need retry-until-success semantics must not rely on it.

use std::future::Future;

pub const DEFAULT_ATTEMPTS: usize = 5;

/// Position within one [`retry`] invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttemptState {
    pub attempt_index: usize,
    pub max_attempts: usize,
}

/// Awaits `operation` exactly `attempts` times in sequence and returns
/// `true`, whatever each invocation produced.
pub async fn retry<F, Fut>(mut operation: F, attempts: usize) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future,
{
    for attempt_index in 0..attempts {
        let state = RetryAttemptState {
            attempt_index,
            max_attempts: attempts,
        };
        tracing::trace!(?state, "retry attempt");
        drop(operation().await);
    }
    true
}
