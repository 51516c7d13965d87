//! HTTP retry helper for transient errors.
//!
//! Statistics requests go through [`send_json`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so timeouts, connection
//! resets, rate limiting and server errors are retried with exponential
//! backoff before the request cycle is failed.
//!
//! ```ignore
//! let body = retry::send_json(|| client.get(&url).query(&params)).await?;
//! ```

use std::time::Duration;

use crate::SourceError;

/// Maximum number of retry attempts for transient HTTP errors.
///
/// With exponential backoff (2s, 4s, 8s, 16s, 32s) the total wait before
/// giving up is 62 seconds, on top of the per-request timeout.
pub const MAX_RETRIES: u32 = 5;

/// Maximum number of full re-fetches when the body cannot be decoded
/// (truncated JSON, garbled response).
pub const MAX_BODY_RETRIES: u32 = 2;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// Sends an HTTP request and parses the response body as JSON.
///
/// `build_request` is called on each attempt since builders are consumed
/// by `.send()`.
///
/// Connection-level failures (timeouts, connect errors, HTTP 429, HTTP
/// 5xx) are retried up to [`MAX_RETRIES`] times. A response whose body
/// cannot be parsed is re-fetched up to [`MAX_BODY_RETRIES`] times. HTTP
/// 4xx other than 429 is permanent.
///
/// # Errors
///
/// Returns [`SourceError::UpstreamUnavailable`] once retries are
/// exhausted or the server answers with a permanent error status, and
/// [`SourceError::Json`] if the body never parses.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut body_attempt = 0;
    loop {
        let response = send_inner(&build_request, MAX_RETRIES).await?;
        let url = response.url().to_string();
        let status = response.status();

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) if body_attempt < MAX_BODY_RETRIES => {
                body_attempt += 1;
                let delay = backoff(body_attempt);
                log::warn!(
                    "Body read failed for {url} (body retry {body_attempt}/{MAX_BODY_RETRIES}) \
                     in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
                continue;
            }
            Err(e) => return Err(SourceError::Http(e)),
        };

        match serde_json::from_str(&text) {
            Ok(value) => return Ok(value),
            Err(e) if body_attempt < MAX_BODY_RETRIES => {
                body_attempt += 1;
                let delay = backoff(body_attempt);
                log::warn!(
                    "JSON parse failed for {url} (body retry {body_attempt}/{MAX_BODY_RETRIES}) \
                     in {delay:?}\n  status: {status}\n  received: {} bytes\n  \
                     parse error: {e}\n  body preview: {}",
                    text.len(),
                    preview(&text),
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                log::error!(
                    "JSON parse failed for {url} after {MAX_BODY_RETRIES} retries, giving up.\n  \
                     body preview: {}",
                    preview(&text)
                );
                return Err(SourceError::Json(e));
            }
        }
    }
}

/// Retry loop for one logical request. Returns the first response with a
/// 2xx or 3xx status.
#[allow(clippy::future_not_send)]
async fn send_inner<F>(build_request: &F, max_retries: u32) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        let failure = match build_request().send().await {
            Err(e) if is_transient(&e) => e.to_string(),
            Err(e) => return Err(SourceError::Http(e)),
            Ok(response) => {
                let status = response.status();
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    format!("HTTP {status}")
                } else if status.is_client_error() {
                    return Err(SourceError::UpstreamUnavailable {
                        message: format!("HTTP {status}"),
                    });
                } else {
                    return Ok(response);
                }
            }
        };

        if attempt >= max_retries {
            return Err(SourceError::UpstreamUnavailable {
                message: format!("{failure} after {max_retries} retries"),
            });
        }
        attempt += 1;
        let delay = backoff(attempt);
        log::warn!("  {failure}; retry {attempt}/{max_retries} in {delay:?}...");
        tokio::time::sleep(delay).await;
    }
}

/// Exponential backoff: 2s, 4s, 8s, ...
const fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt)
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
}

fn preview(text: &str) -> &str {
    if text.len() <= BODY_PREVIEW_LEN {
        return text;
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
