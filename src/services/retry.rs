use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::error::{GenerationError, RemoteError};
use crate::utils::time::sleep;

/// Bounded retry with exponential backoff for transient remote failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: usize,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
        }
    }

    /// Runs `operation` until it succeeds, fails permanently, or runs out of
    /// retries. The delay doubles after every retry. Errors come back wrapped
    /// with `label`.
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        cancel: Option<&CancellationToken>,
        mut operation: F,
    ) -> Result<T, GenerationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut retries = 0;
        let mut delay = self.initial_delay;

        loop {
            check_cancelled(cancel, label)?;

            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && retries < self.max_retries => {
                    retries += 1;
                    log::warn!(
                        "Model overloaded for \"{}\". Retrying in {:.1}s... (Attempt {})",
                        label,
                        delay.as_secs_f64(),
                        retries + 1
                    );
                    check_cancelled(cancel, label)?;
                    sleep(delay).await;
                    delay *= 2;
                }
                Err(err) => return Err(GenerationError::remote(label, err)),
            }
        }
    }
}

fn check_cancelled(cancel: Option<&CancellationToken>, label: &str) -> Result<(), GenerationError> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(GenerationError::Cancelled {
            context: label.to_string(),
        }),
        _ => Ok(()),
    }
}
