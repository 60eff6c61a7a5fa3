//! HTTP client for upstream listing sites.
//!
//! All adapters fetch through this client, so rate limiting and the retry
//! policy apply uniformly at the adapter boundary.

use super::{RateLimiter, RetryPolicy};
use crate::error::{ApiError, ApiResult};
use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use shared::config::RateLimitConfig;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Listing sites serve different markup to obvious bot user agents.
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:97.0) Gecko/20100101 Firefox/97.0";

/// Rate-limited, retrying page fetcher
pub struct PageClient {
    /// HTTP client
    client: Client,
    /// Pacing for upstream requests
    limiter: Mutex<RateLimiter>,
    /// Retry policy applied to every request
    retry: RetryPolicy,
}

impl PageClient {
    /// Create a new page client
    pub fn new(timeout: Duration, rate_limit: &RateLimitConfig, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            limiter: Mutex::new(RateLimiter::new(
                rate_limit.requests_per_second,
                rate_limit.requests_per_minute,
            )),
            retry,
        })
    }

    /// Fetch a page and return its HTML body
    pub async fn get_html(&self, url: &str) -> ApiResult<String> {
        let response = self.get(url).await?;
        Ok(response.text().await?)
    }

    /// Fetch a URL and parse its body as JSON
    pub async fn get_json(&self, url: &str) -> ApiResult<Value> {
        let response = self.get(url).await?;
        Ok(response.json().await?)
    }

    /// Make a GET request with rate limiting and retry
    async fn get(&self, url: &str) -> ApiResult<reqwest::Response> {
        for attempt in 0..self.retry.attempts() {
            self.limiter.lock().await.acquire().await;

            debug!(url = %url, attempt = attempt + 1, "Fetching upstream page");

            match self
                .client
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
            {
                Ok(response) => {
                    debug!(url = %url, "Upstream request successful");
                    return Ok(response);
                }
                // A 404 is a stable answer for a bad identifier; retrying
                // won't change it
                Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => {
                    debug!(url = %url, "Upstream page not found");
                    return Err(ApiError::NotFound(format!("upstream page not found: {url}")));
                }
                // The upstream told us to slow down. Always wait before
                // the next attempt, with a longer backoff than for plain
                // failures.
                Err(e) if e.status() == Some(StatusCode::TOO_MANY_REQUESTS) => {
                    let delay = self.retry.backoff(attempt) * 2;
                    warn!(
                        url = %url,
                        delay_ms = delay.as_millis() as u64,
                        "Upstream rate limited, backing off"
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    if self.retry.should_retry(attempt) {
                        let delay = self.retry.backoff(attempt);
                        warn!(
                            url = %url,
                            error = %e,
                            delay_ms = delay.as_millis() as u64,
                            "Upstream request failed, retrying"
                        );
                        sleep(delay).await;
                    } else {
                        warn!(url = %url, error = %e, "Upstream request failed");
                        return Err(ApiError::Upstream(e));
                    }
                }
            }
        }

        Err(ApiError::Internal(anyhow!(
            "request to {url} failed after {} attempts",
            self.retry.attempts()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves each canned response to one connection, in order
    async fn canned_server(responses: Vec<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                socket.write_all(response.as_bytes()).await.unwrap();
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_client_creation() {
        let rate_limit = RateLimitConfig {
            requests_per_second: 2.0,
            requests_per_minute: 50,
        };
        let client = PageClient::new(
            Duration::from_secs(10),
            &rate_limit,
            RetryPolicy::new(3, 1000),
        );
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_reports_upstream_error() {
        let rate_limit = RateLimitConfig {
            requests_per_second: 100.0,
            requests_per_minute: 1000,
        };
        // No retries so the test stays fast
        let client = PageClient::new(
            Duration::from_secs(1),
            &rate_limit,
            RetryPolicy::new(0, 10),
        )
        .unwrap();

        let err = client
            .get_html("http://127.0.0.1:1/none")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_rate_limited_response_is_retried() {
        let base = canned_server(vec![
            "HTTP/1.1 429 Too Many Requests\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
            "HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok",
        ])
        .await;

        let rate_limit = RateLimitConfig {
            requests_per_second: 100.0,
            requests_per_minute: 1000,
        };
        let client = PageClient::new(
            Duration::from_secs(2),
            &rate_limit,
            RetryPolicy::new(2, 10),
        )
        .unwrap();

        let body = client.get_html(&format!("{base}/page")).await.unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_persistent_rate_limiting_exhausts_attempts() {
        let base = canned_server(vec![
            "HTTP/1.1 429 Too Many Requests\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
            "HTTP/1.1 429 Too Many Requests\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        ])
        .await;

        let rate_limit = RateLimitConfig {
            requests_per_second: 100.0,
            requests_per_minute: 1000,
        };
        let client = PageClient::new(
            Duration::from_secs(2),
            &rate_limit,
            RetryPolicy::new(1, 10),
        )
        .unwrap();

        let err = client.get_html(&format!("{base}/page")).await.unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
