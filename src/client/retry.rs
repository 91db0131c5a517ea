//! Retry policy: how many attempts, which outcomes are retryable, and how
//! long to back off between them. Spec §4.5 / §8 property 5.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::client::response::ClientResponse;
use crate::error::Error;

pub type RetryCondition = Arc<dyn Fn(Option<&ClientResponse>, Option<&Error>) -> bool + Send + Sync>;
pub type BackoffFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

#[derive(Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub conditions: Vec<RetryCondition>,
    pub backoff: BackoffFn,
    pub max_retry_time: Option<Duration>,
}

impl RetryPolicy {
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::new()
    }

    pub fn none() -> Self {
        Self { max_retries: 0, conditions: Vec::new(), backoff: Arc::new(|_| Duration::ZERO), max_retry_time: None }
    }

    /// `should_retry` in the spec: falsy if retries are disabled, the
    /// attempt budget is exhausted, or the time budget is exhausted;
    /// otherwise truthy iff any registered condition says so.
    pub(crate) fn should_retry(
        &self,
        response: Option<&ClientResponse>,
        error: Option<&Error>,
        attempt: u32,
        elapsed: Duration,
    ) -> bool {
        if self.max_retries == 0 || attempt >= self.max_retries {
            return false;
        }
        if let Some(max_time) = self.max_retry_time {
            if elapsed >= max_time {
                return false;
            }
        }
        self.conditions.iter().any(|cond| cond(response, error))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicyBuilder::new()
            .max_retries(0)
            .condition(default_retry_condition)
            .backoff(exponential_backoff_with_jitter)
            .build()
    }
}

/// Built-in default: retry on any transport error, any 5xx, or 429.
pub fn default_retry_condition(response: Option<&ClientResponse>, error: Option<&Error>) -> bool {
    if let Some(err) = error {
        return err.is_retryable_transport_error();
    }
    match response {
        Some(resp) => resp.status().is_server_error() || resp.status().as_u16() == 429,
        None => false,
    }
}

const BASE_BACKOFF: Duration = Duration::from_millis(100);

/// `delay = base * 2^attempt + uniform[0, delay/2)`.
pub fn exponential_backoff_with_jitter(attempt: u32) -> Duration {
    let exp = BASE_BACKOFF.saturating_mul(1u32 << attempt.min(16));
    let jitter_upper = exp.as_secs_f64() / 2.0;
    let jitter = rand::thread_rng().gen_range(0.0..jitter_upper.max(f64::MIN_POSITIVE));
    exp + Duration::from_secs_f64(jitter)
}

pub struct RetryPolicyBuilder {
    max_retries: u32,
    conditions: Vec<RetryCondition>,
    backoff: BackoffFn,
    max_retry_time: Option<Duration>,
}

impl RetryPolicyBuilder {
    pub fn new() -> Self {
        Self {
            max_retries: 0,
            conditions: Vec::new(),
            backoff: Arc::new(exponential_backoff_with_jitter),
            max_retry_time: None,
        }
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn condition(mut self, f: impl Fn(Option<&ClientResponse>, Option<&Error>) -> bool + Send + Sync + 'static) -> Self {
        self.conditions.push(Arc::new(f));
        self
    }

    pub fn backoff(mut self, f: impl Fn(u32) -> Duration + Send + Sync + 'static) -> Self {
        self.backoff = Arc::new(f);
        self
    }

    pub fn max_retry_time(mut self, d: Duration) -> Self {
        self.max_retry_time = Some(d);
        self
    }

    pub fn build(self) -> RetryPolicy {
        let conditions = if self.conditions.is_empty() {
            vec![Arc::new(default_retry_condition) as RetryCondition]
        } else {
            self.conditions
        };
        RetryPolicy { max_retries: self.max_retries, conditions, backoff: self.backoff, max_retry_time: self.max_retry_time }
    }
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
