//! Bounded retry of timeout-class failures
//!
//! Only [`SqlErrorKind::TransientTimeout`](crate::SqlErrorKind) is retried.
//! Every other failure is returned on the spot. Running out of attempts is
//! reported as [`RetryOutcome::Exhausted`] rather than as an error so callers
//! can tell it apart from success and from fatal failures. No attempt starts
//! once cancellation has been requested.

use std::future::Future;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{CoreError, SqlError};

/// Result of a retried operation that did not fail fatally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum RetryOutcome {
    /// Succeeded on attempt number `attempts`
    Succeeded { attempts: u32 },
    /// Every attempt timed out
    Exhausted { attempts: u32 },
}

impl RetryOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts } | RetryOutcome::Exhausted { attempts } => {
                *attempts
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded { .. })
    }
}

/// Retries an operation while it keeps timing out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryController {
    max_tries: u32,
}

impl RetryController {
    /// `max_tries` must be at least one
    pub fn new(max_tries: u32) -> Result<Self, CoreError> {
        if max_tries == 0 {
            return Err(CoreError::Validation(
                "max tries must be at least 1".to_string(),
            ));
        }
        Ok(Self { max_tries })
    }

    /// Run `operation` until it succeeds, fails with a non-timeout error, or
    /// the attempt budget is spent. `label` identifies the target in logs.
    ///
    /// Returns [`SqlError::cancelled`] instead of starting another attempt
    /// once `cancel` has fired.
    pub async fn run<F, Fut>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<RetryOutcome, SqlError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<(), SqlError>>,
    {
        for attempt in 1..=self.max_tries {
            if cancel.is_cancelled() {
                return Err(SqlError::cancelled());
            }
            match operation(attempt).await {
                Ok(()) => return Ok(RetryOutcome::Succeeded { attempts: attempt }),
                Err(e) if e.is_retryable() => {
                    warn!(
                        "One or more operations in '{}' timed out (attempt {}/{}).",
                        label, attempt, self.max_tries
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(RetryOutcome::Exhausted {
            attempts: self.max_tries,
        })
    }
}
