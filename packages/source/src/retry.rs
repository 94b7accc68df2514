//! HTTP retry helpers for transient errors.
//!
//! Every request the HTTP source makes goes through [`send_json`], which
//! retries connection failures, timeouts, HTTP 429 and HTTP 5xx with
//! exponential backoff. Other 4xx responses and undecodable bodies are
//! permanent failures.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::SourceError;

/// Retry limits for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Backoff before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Sends the request built by `build_request` and decodes the JSON body.
///
/// `build_request` is called once per attempt since request builders are
/// consumed by `send()`. `timeout` is the per-request timeout configured on
/// the client and is only used to label timeout errors.
///
/// # Errors
///
/// * If the request still fails after `policy.max_retries` retries
/// * If the server answers with a non-retryable status
/// * If the body is not valid JSON for `T`
#[allow(clippy::future_not_send)]
pub async fn send_json<T, F>(
    build_request: F,
    policy: &RetryPolicy,
    timeout: Duration,
) -> Result<T, SourceError>
where
    T: DeserializeOwned,
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, policy, timeout).await?;
    let text = response.text().await.map_err(|e| classify(e, timeout))?;
    Ok(serde_json::from_str(&text)?)
}

#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    build_request: &F,
    policy: &RetryPolicy,
    timeout: Duration,
) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            log::warn!("  retry {attempt}/{} in {delay:?}...", policy.max_retries);
            tokio::time::sleep(delay).await;
        }

        let error = match build_request().send().await {
            Err(e) => classify(e, timeout),
            Ok(response) => {
                let status = response.status();
                if status.is_success() || status.is_redirection() {
                    return Ok(response);
                }
                SourceError::Status {
                    status,
                    url: response.url().to_string(),
                }
            }
        };

        if !error.is_retryable() || attempt >= policy.max_retries {
            return Err(error);
        }

        log::warn!("  transient error: {error}");
        attempt += 1;
    }
}

fn classify(e: reqwest::Error, timeout: Duration) -> SourceError {
    if e.is_timeout() {
        SourceError::Timeout(timeout)
    } else {
        SourceError::Http(e)
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
pub(crate) fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

/// Returns `true` for HTTP 429 and 5xx.
pub(crate) fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
