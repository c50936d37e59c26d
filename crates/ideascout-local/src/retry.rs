use ideascout_core::{ChatMessage, CompletionProvider, Error, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub trait RetryPolicy: Send + Sync {
    /// Total attempts, including the first one.
    fn max_attempts(&self) -> u32;
    /// Wait after failed attempt number `attempt` (1-based).
    fn delay(&self, attempt: u32) -> Duration;
}

/// Attempt `i` waits `i * step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    pub max_attempts: u32,
    pub step: Duration,
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            step: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy for LinearBackoff {
    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt)
    }
}

/// Run `op` until it succeeds, fails with something other than [`Error::RateLimited`], or
/// the policy's attempts run out.
///
/// `op` receives the 1-based attempt number. There is no sleep after the final attempt.
pub async fn retry_with<P, F, Fut, T>(policy: &P, mut op: F) -> Result<T>
where
    P: RetryPolicy + ?Sized,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts().max(1);
    for attempt in 1..=attempts {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(Error::RateLimited(msg)) => {
                if attempt == attempts {
                    warn!(attempt, error = %msg, "rate/quota error on final attempt");
                    break;
                }
                let delay = policy.delay(attempt);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %msg,
                    "rate/quota error; retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
    Err(Error::RetriesExhausted { attempts })
}

/// A completion provider bound to one model and one retry policy.
#[derive(Clone)]
pub struct CompletionCaller {
    provider: Arc<dyn CompletionProvider>,
    model: String,
    policy: LinearBackoff,
}

impl CompletionCaller {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        model: impl Into<String>,
        policy: LinearBackoff,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            policy,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn call(&self, messages: &[ChatMessage]) -> Result<String> {
        let provider = self.provider.as_ref();
        let model = self.model.as_str();
        retry_with(&self.policy, |_attempt| provider.complete(messages, model)).await
    }
}
