//! HTTP plumbing shared by every check.
//!
//! Wraps a pooled [`reqwest::Client`] with the fetch shapes the probes
//! need: JSON and text GETs, a timed GET for latency measurements, and a
//! GraphQL POST. Connection failures and 429 responses are retried a
//! bounded number of times; timeouts are not retried, so a slow service
//! costs a cycle at most one timeout window.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::time::Instant;
use tracing::warn;

/// Default timeout for ordinary page and API fetches.
pub const GENERIC_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for chain RPC and reachability calls.
pub const RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for IPFS gateway artifact fetches.
pub const GATEWAY_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = concat!("teia-status/", env!("CARGO_PKG_VERSION"));

/// Why a single outbound check failed.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The service could not be reached, timed out, or answered with an
    /// error status.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// A response arrived but did not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// No fresh reference head is available, so drift cannot be judged.
    #[error("reference head unavailable")]
    NoReference,
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProbeError::MalformedResponse(err.to_string())
        } else {
            ProbeError::Unreachable(err.to_string())
        }
    }
}

/// Bounded retry for outbound requests.
///
/// `attempts` counts the first try, so `attempts == 1` disables retries.
/// The delay grows linearly: the wait before attempt `n + 1` is
/// `base_delay * n`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Single attempt, no waiting. Used by tests and one-shot runs.
    pub const fn none() -> Self {
        Self {
            attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

/// Shared HTTP client handed to every probe through the check context.
///
/// Cloning is cheap and clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Http {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl Http {
    pub fn new() -> Self {
        Self::with_retry(RetryPolicy::default())
    }

    pub fn with_retry(retry: RetryPolicy) -> Self {
        let client = reqwest::Client::builder()
            .timeout(GENERIC_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to build HTTP client");
        Self { client, retry }
    }

    /// GET a JSON document with the default timeout.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProbeError> {
        let response = self.send(self.client.get(url)).await?;
        Ok(response.json().await?)
    }

    /// GET a JSON document with an explicit timeout.
    pub async fn get_json_timeout<T: DeserializeOwned>(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<T, ProbeError> {
        let response = self.send(self.client.get(url).timeout(timeout)).await?;
        Ok(response.json().await?)
    }

    /// GET a JSON document, attaching a bearer token when one is set.
    pub async fn get_json_bearer<T: DeserializeOwned>(
        &self,
        url: &str,
        token: Option<&str>,
    ) -> Result<T, ProbeError> {
        let mut request = self.client.get(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// GET a page body as text.
    pub async fn get_text(&self, url: &str) -> Result<String, ProbeError> {
        let response = self.send(self.client.get(url)).await?;
        Ok(response.text().await?)
    }

    /// Plain reachability check: any success status counts.
    pub async fn get_ok(&self, url: &str, timeout: Duration) -> Result<(), ProbeError> {
        self.send(self.client.get(url).timeout(timeout)).await?;
        Ok(())
    }

    /// HEAD request returning one response header, when present.
    pub async fn head_header(
        &self,
        url: &str,
        name: &str,
    ) -> Result<Option<String>, ProbeError> {
        let response = self.send(self.client.head(url)).await?;
        Ok(response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned))
    }

    /// GET raw bytes and measure the full round trip, body included.
    pub async fn timed_get(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<(Vec<u8>, Duration), ProbeError> {
        let started = Instant::now();
        let response = self.send(self.client.get(url).timeout(timeout)).await?;
        let body = response.bytes().await?;
        Ok((body.to_vec(), started.elapsed()))
    }

    /// POST a GraphQL document and return its `data` object.
    ///
    /// A response carrying an `errors` array, or one with no `data`, is
    /// reported as malformed.
    pub async fn graphql(
        &self,
        endpoint: &str,
        query: &str,
        operation: Option<&str>,
        variables: Value,
    ) -> Result<Value, ProbeError> {
        let body = json!({
            "query": query,
            "variables": variables,
            "operationName": operation,
        });
        let response = self.send(self.client.post(endpoint).json(&body)).await?;
        let payload: Value = response.json().await?;
        if !payload["errors"].is_null() {
            return Err(ProbeError::MalformedResponse(format!(
                "graphql errors: {}",
                payload["errors"]
            )));
        }
        match payload.get("data") {
            Some(data) if !data.is_null() => Ok(data.clone()),
            _ => Err(ProbeError::MalformedResponse(
                "graphql response has no data".into(),
            )),
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ProbeError> {
        let mut attempt: u32 = 1;
        loop {
            let this_try = request.try_clone().ok_or_else(|| {
                ProbeError::Unreachable("request body is not retryable".into())
            })?;
            match this_try.send().await {
                Ok(response)
                    if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS
                        && attempt < self.retry.attempts =>
                {
                    warn!(url = %response.url(), attempt, "rate limited, retrying");
                }
                Ok(response) => return response.error_for_status().map_err(ProbeError::from),
                Err(err) if err.is_connect() && attempt < self.retry.attempts => {
                    warn!(error = %err, attempt, "connection failed, retrying");
                }
                Err(err) => return Err(err.into()),
            }
            tokio::time::sleep(self.retry.delay(attempt)).await;
            attempt += 1;
        }
    }
}

impl Default for Http {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Head {
        level: i64,
    }

    fn quick_retry(attempts: u32) -> Http {
        Http::with_retry(RetryPolicy {
            attempts,
            base_delay: Duration::ZERO,
        })
    }

    #[tokio::test]
    async fn get_json_deserializes_the_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/head")
            .with_status(200)
            .with_body(r#"{"level": 3123456}"#)
            .create_async()
            .await;

        let head: Head = quick_retry(1)
            .get_json(&format!("{}/v1/head", server.url()))
            .await
            .unwrap();
        assert_eq!(head.level, 3_123_456);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn malformed_json_is_classified_as_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/head")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = quick_retry(1)
            .get_json::<Head>(&format!("{}/v1/head", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn error_status_is_classified_as_unreachable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ping")
            .with_status(503)
            .create_async()
            .await;

        let err = quick_retry(1)
            .get_ok(&format!("{}/ping", server.url()), RPC_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Unreachable(_)));
    }

    #[tokio::test]
    async fn rate_limited_requests_are_retried_up_to_the_attempt_budget() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/busy")
            .with_status(429)
            .expect(3)
            .create_async()
            .await;

        let err = quick_retry(3)
            .get_ok(&format!("{}/busy", server.url()), RPC_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Unreachable(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn graphql_returns_the_data_object() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/graphql")
            .with_status(200)
            .with_body(r#"{"data": {"dipdup_head": [{"level": 7}]}}"#)
            .create_async()
            .await;

        let data = quick_retry(1)
            .graphql(
                &format!("{}/v1/graphql", server.url()),
                "query { dipdup_head { level } }",
                None,
                Value::Null,
            )
            .await
            .unwrap();
        assert_eq!(data["dipdup_head"][0]["level"], 7);
    }

    #[tokio::test]
    async fn graphql_errors_are_malformed_responses() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/graphql")
            .with_status(200)
            .with_body(r#"{"errors": [{"message": "field not found"}]}"#)
            .create_async()
            .await;

        let err = quick_retry(1)
            .graphql(
                &format!("{}/v1/graphql", server.url()),
                "query { nope }",
                None,
                Value::Null,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn head_header_reads_one_header() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/")
            .with_status(200)
            .with_header("x-teia-commit-hash", "abc123")
            .create_async()
            .await;

        let http = quick_retry(1);
        let value = http
            .head_header(&server.url(), "x-teia-commit-hash")
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("abc123"));

        let missing = http.head_header(&server.url(), "x-absent").await.unwrap();
        assert!(missing.is_none());
    }
}
