/// Bounded retry with exponential backoff for provider HTTP calls.
///
/// Both Ollama providers send through [`send_with_retry`]. Connection
/// failures and overload statuses (429, 500, 502, 503, 504) are retried;
/// timeouts and every other status are returned immediately.
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Response;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How many times, and how patiently, a request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    #[serde(with = "millis")]
    pub base_delay: Duration,
    #[serde(with = "millis")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (0-based), capped at `max_delay`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Why a provider request ultimately failed.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("request timed out")]
    Timeout,

    /// Transient failures persisted past the retry budget.
    #[error("provider unavailable after {attempts} attempts: {last}")]
    Unavailable { attempts: u32, last: String },

    /// The provider answered with a status that retrying will not fix.
    #[error("provider rejected request with {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Honor a `Retry-After: <seconds>` header, otherwise fall back to the policy.
fn retry_delay(response: &Response, policy: &RetryPolicy, attempt: u32) -> Duration {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .map_or_else(|| policy.delay(attempt), |d| d.min(policy.max_delay))
}

/// Why the body of a successful response could not be read.
#[derive(Error, Debug)]
pub enum BodyError {
    #[error("response body timed out")]
    Timeout,

    #[error("{0}")]
    Invalid(String),
}

impl From<reqwest::Error> for BodyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Invalid(err.to_string())
        }
    }
}

/// Read and decode a JSON body. The client timeout also bounds this read.
pub(crate) fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, BodyError> {
    Ok(resp.json()?)
}

/// Send a request built by `f`, retrying transient failures per `policy`.
///
/// Returns the first successful (2xx) response.
pub(crate) fn send_with_retry<F>(
    provider_name: &str,
    policy: &RetryPolicy,
    mut f: F,
) -> Result<Response, SendError>
where
    F: FnMut() -> reqwest::Result<Response>,
{
    let mut attempt = 0;
    loop {
        let (last, delay) = match f() {
            Ok(resp) if resp.status().is_success() => return Ok(resp),
            Ok(resp) if is_transient_status(resp.status()) => {
                let delay = retry_delay(&resp, policy, attempt);
                (format!("status {}", resp.status()), delay)
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().unwrap_or_default();
                return Err(SendError::Rejected { status, body });
            }
            Err(e) if e.is_timeout() => return Err(SendError::Timeout),
            Err(e) if e.is_connect() || e.is_request() => (e.to_string(), policy.delay(attempt)),
            Err(e) => {
                return Err(SendError::Unavailable {
                    attempts: attempt + 1,
                    last: e.to_string(),
                });
            }
        };

        if attempt >= policy.max_retries {
            return Err(SendError::Unavailable {
                attempts: attempt + 1,
                last,
            });
        }

        tracing::warn!(
            "{provider_name} request failed ({last}), retrying in {}ms ({}/{})",
            delay.as_millis(),
            attempt + 1,
            policy.max_retries
        );
        std::thread::sleep(delay);
        attempt += 1;
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
