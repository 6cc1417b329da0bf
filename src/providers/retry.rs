use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use thiserror::Error;
use tokio::time::Instant;
use tracing::warn;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// Exponential backoff bounded by a total time budget.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total time spent retrying one request before giving up.
    pub timeout: Duration,
    /// Limit on a single attempt, kept below `timeout` so a hung
    /// attempt still leaves room to retry.
    pub attempt_timeout: Duration,
    pub initial_wait: Duration,
    pub max_wait: Duration,
}

impl RetryPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            attempt_timeout: (timeout / 3).max(Duration::from_secs(1)),
            initial_wait: Duration::from_millis(500),
            max_wait: Duration::from_secs(30),
        }
    }

    fn wait_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
        self.initial_wait.saturating_mul(factor).min(self.max_wait)
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Send the request built by `build`, retrying connection failures,
/// timeouts, 429 and 5xx responses. Other 4xx responses fail at once.
pub async fn send_with_retry<F>(policy: &RetryPolicy, build: F) -> Result<Response, HttpError>
where
    F: Fn() -> RequestBuilder,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let mut wait = policy.wait_for(attempt - 1);

        let last_error = match build().timeout(policy.attempt_timeout).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                if status == StatusCode::TOO_MANY_REQUESTS {
                    if let Some(after) = retry_after(&response) {
                        wait = after.min(policy.max_wait);
                    }
                    "429 Too Many Requests".to_string()
                } else if status.is_server_error() {
                    let body = response.text().await.unwrap_or_default();
                    format!("{status}: {body}")
                } else {
                    let body = response.text().await.unwrap_or_default();
                    return Err(HttpError::Status { status, body });
                }
            }
            Err(e) if e.is_timeout() || e.is_connect() => e.to_string(),
            Err(e) => return Err(HttpError::Request(e)),
        };

        if started.elapsed() + wait > policy.timeout {
            return Err(HttpError::RetriesExhausted {
                attempts: attempt,
                last_error,
            });
        }

        warn!(attempt, wait_ms = wait.as_millis() as u64, error = %last_error, "request failed; retrying");
        tokio::time::sleep(wait).await;
    }
}
