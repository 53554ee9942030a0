//! Outbound HTTP for providers.
//!
//! One GET per call. A 429 is retried after the server's `Retry-After` (or a
//! random delay when absent) plus jitter, up to the retry budget. Every other
//! non-success status fails at once with [`LookupError::Upstream`].

use std::time::Duration;

use rand::Rng;
use reqwest::{Client, StatusCode, Url, header::HeaderMap};
use tracing::{info, warn};

use crate::error::LookupError;

pub const DEFAULT_RETRY_LIMIT: u32 = 2;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Longest server-requested wait honoured before a retry.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt; only 429 responses consume it.
    pub max_retries: u32,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
    /// Upper bound applied to `Retry-After`.
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_RETRY_LIMIT,
            jitter_min: Duration::from_millis(500),
            jitter_max: Duration::from_millis(1500),
            max_retry_after: MAX_RETRY_AFTER,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self { max_retries, ..Self::default() }
    }

    /// Uniform sample from `jitter_min..=jitter_max`.
    pub fn random_delay(&self) -> Duration {
        let min = self.jitter_min.as_secs_f64();
        let max = self.jitter_max.as_secs_f64().max(min);
        let secs = rand::thread_rng().gen_range(min..=max);
        Duration::from_secs_f64(secs)
    }
}

#[derive(Debug, Clone)]
pub struct RequestExecutor {
    http: Client,
    policy: RetryPolicy,
}

impl RequestExecutor {
    pub fn new(policy: RetryPolicy, timeout: Duration) -> Result<Self, LookupError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, policy })
    }

    pub fn with_client(http: Client, policy: RetryPolicy) -> Self {
        Self { http, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url` with the executor's default retry budget.
    pub async fn execute(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> Result<String, LookupError> {
        self.execute_with_retries(url, query, headers, self.policy.max_retries).await
    }

    pub async fn execute_with_retries(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &[(&str, &str)],
        max_retries: u32,
    ) -> Result<String, LookupError> {
        let mut target: Url = self.http.get(url).query(query).build()?.url().clone();
        let mut retries_left = max_retries;

        loop {
            let mut request = self.http.get(target.clone());
            for (name, value) in headers {
                request = request.header(*name, *value);
            }

            let res = request.send().await?;
            let status = res.status();

            if status.is_success() {
                return Ok(res.text().await?);
            }

            if status != StatusCode::TOO_MANY_REQUESTS {
                let body = res.text().await.unwrap_or_default();
                return Err(LookupError::Upstream(format!(
                    "{} responded with status {}: {}",
                    target.host_str().unwrap_or("upstream"),
                    status,
                    truncate_body(&body),
                )));
            }

            let retry_after = retry_after_from(res.headers())
                .map(|requested| requested.min(self.policy.max_retry_after))
                .unwrap_or_else(|| self.policy.random_delay());

            if retries_left == 0 {
                warn!(
                    url = %target.path(),
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Rate limited, retry budget exhausted"
                );
                return Err(LookupError::RateLimited { retry_after });
            }

            // Follow whatever URL the response ended up at.
            target = res.url().clone();
            let wait = retry_after.saturating_add(self.policy.random_delay());
            info!(
                url = %target.path(),
                attempt = max_retries - retries_left + 1,
                max_retries,
                wait_ms = wait.as_millis() as u64,
                "Rate limited, retrying"
            );
            tokio::time::sleep(wait).await;
            retries_left -= 1;
        }
    }
}

/// `Retry-After` as whole seconds. HTTP-date values are ignored.
fn retry_after_from(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
