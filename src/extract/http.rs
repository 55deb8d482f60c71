//! Blocking JSON POST with retry and exponential backoff.
//!
//! Transient failures are retried:
//! - HTTP 429 (rate limited) and 5xx (server error)
//! - network errors
//!
//! Other 4xx responses fail immediately. A cancelled token stops the loop
//! before the next attempt and interrupts the backoff sleep.

use reqwest::blocking::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::ExtractError;

const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Retry schedule for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each further attempt.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries, base_delay: Duration::from_secs(1) }
    }

    /// Delay before `attempt` (1-based retry number): 1s, 2s, 4s, ... capped at 32x.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * (1u32 << (attempt.saturating_sub(1)).min(5))
    }
}

pub fn build_client(timeout_secs: u64) -> Result<Client, ExtractError> {
    Ok(Client::builder().timeout(Duration::from_secs(timeout_secs)).build()?)
}

/// POST `body` as JSON to `url` and return the parsed JSON response.
pub fn post_json(
    client: &Client,
    url: &str,
    headers: &[(&str, &str)],
    body: &Value,
    policy: &RetryPolicy,
    cancel: &CancelToken,
) -> Result<Value, ExtractError> {
    let mut last_err = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            debug!("Retrying {} in {:?} (attempt {})", url, delay, attempt);
            sleep_unless_cancelled(delay, cancel);
        }
        if cancel.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }

        let mut request = client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        match request.send() {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json::<Value>()?);
                }

                let body_text = response.text().unwrap_or_default();
                let err = ExtractError::Http { status: status.as_u16(), body: body_text };
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(err);
                    continue;
                }
                return Err(err);
            }
            Err(e) => {
                last_err = Some(ExtractError::Transport(e));
                continue;
            }
        }
    }

    Err(last_err
        .unwrap_or_else(|| ExtractError::InvalidResponse("request failed after retries".into())))
}

/// Sleep for `delay`, waking early once `cancel` is set.
fn sleep_unless_cancelled(delay: Duration, cancel: &CancelToken) {
    let deadline = Instant::now() + delay;
    while !cancel.is_cancelled() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep(CANCEL_POLL.min(deadline - now));
    }
}
