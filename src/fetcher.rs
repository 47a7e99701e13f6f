use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    pub attempts: u32,
    /// Constant pause between attempts.
    pub delay: Duration,
    /// Deadline for each attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(1_000),
            timeout: Duration::from_millis(30_000),
        }
    }
}

/// Shared HTTP client with per-attempt deadline and bounded constant-delay retry.
///
/// Every aggregator reaches its upstream through one of these. Nothing is cached
/// between calls.
#[derive(Clone)]
pub struct RetryableFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl RetryableFetcher {
    pub fn new(policy: RetryPolicy) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("token-scanner/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, policy))
    }

    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// GET `url` and decode the body as JSON, retrying on any failure.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<T, FetchError> {
        self.retry(url, cancel, || self.get_json_once(url)).await
    }

    /// POST a JSON body to `url` and decode the JSON reply, retrying on any failure.
    pub async fn post_json<B, T>(
        &self,
        url: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<T, FetchError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.retry(url, cancel, || self.post_json_once(url, body)).await
    }

    /// Single GET attempt without deadline or retry.
    pub async fn get_json_once<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let resp = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;
        decode_response(resp).await
    }

    /// Single POST attempt without deadline or retry.
    pub async fn post_json_once<B, T>(&self, url: &str, body: &B) -> Result<T, FetchError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let resp = self.client.post(url).json(body).send().await?;
        decode_response(resp).await
    }

    /// Run `op` under the policy: each attempt is raced against the timeout and
    /// the cancellation token; failures wait `delay` before the next attempt.
    /// The last error is returned once attempts are exhausted.
    pub async fn retry<F, Fut, T>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        op: F,
    ) -> Result<T, FetchError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                res = timeout(self.policy.timeout, op()) => match res {
                    Ok(inner) => inner,
                    Err(_) => Err(FetchError::Timeout(self.policy.timeout)),
                },
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            if attempt >= attempts {
                tracing::warn!("{} failed after {} attempts: {}", label, attempts, err);
                return Err(err);
            }

            tracing::debug!(
                "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                label,
                attempt,
                attempts,
                err,
                self.policy.delay
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = sleep(self.policy.delay) => {}
            }
        }
    }
}

async fn decode_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, FetchError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status { status: status.as_u16() });
    }
    let body = resp.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
