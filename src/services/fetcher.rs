// src/services/fetcher.rs

//! Page retrieval with bounded retries and a fallback path.
//!
//! Direct requests are retried according to the configured [`RetryPolicy`].
//! When every direct attempt was blocked or hit a network error, a single
//! request goes through the read-through text proxy, if one is configured
//! and the target allows it.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};

use crate::error::{FetchFailure, Result};
use crate::models::{FetchConfig, Target};
use crate::utils::http::{apply_policy, create_async_client, is_textual_content_type};
use crate::utils::retry::RetryPolicy;

/// Raw content retrieved for a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub body: String,
    /// The body came from the fallback proxy
    pub via_fallback: bool,
}

/// Outcome of a fetch.
pub type FetchResult = std::result::Result<FetchedPage, FetchFailure>;

/// Anything that can produce page content for a target.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, target: &Target) -> FetchResult;
}

/// HTTP page source.
pub struct Fetcher {
    client: Client,
    insecure_client: Client,
    retry: RetryPolicy,
    fallback_proxy: Option<String>,
}

impl Fetcher {
    /// Create a fetcher from the fetch settings.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config, false)?,
            insecure_client: create_async_client(config, true)?,
            retry: config.retry_policy(),
            fallback_proxy: config.fallback_proxy.clone(),
        })
    }

    fn client_for(&self, target: &Target) -> &Client {
        if target.policy.insecure_tls {
            &self.insecure_client
        } else {
            &self.client
        }
    }

    async fn fetch_direct(&self, target: &Target) -> FetchResult {
        let request = apply_policy(self.client_for(target).get(&target.url), &target.policy);
        let response = request
            .send()
            .await
            .map_err(|e| FetchFailure::from_reqwest(&e))?;
        let body = read_body(response).await?;
        Ok(FetchedPage {
            body,
            via_fallback: false,
        })
    }

    async fn fetch_fallback(&self, target: &Target, proxy: &str) -> FetchResult {
        let url = fallback_url(proxy, &target.url);
        log::info!("Trying fallback for {} via {}", target.url, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchFailure::from_reqwest(&e))?;
        let body = read_body(response).await?;
        Ok(FetchedPage {
            body,
            via_fallback: true,
        })
    }
}

#[async_trait]
impl PageSource for Fetcher {
    async fn fetch(&self, target: &Target) -> FetchResult {
        let direct = self
            .retry
            .run(
                |attempt| {
                    log::debug!(
                        "Fetching {} (attempt {}/{})",
                        target.url,
                        attempt,
                        self.retry.max_attempts()
                    );
                    self.fetch_direct(target)
                },
                FetchFailure::is_retryable,
            )
            .await;

        let failure = match direct {
            Ok(page) => return Ok(page),
            Err(failure) => failure,
        };
        log::warn!(
            "Direct fetch of {} failed after retries: {}",
            target.url,
            failure
        );

        let proxy = match &self.fallback_proxy {
            Some(proxy) if target.policy.fallback && failure.kind.allows_fallback() => proxy,
            _ => return Err(failure),
        };

        match self.fetch_fallback(target, proxy).await {
            Ok(page) => {
                log::info!("Fallback succeeded for {}", target.url);
                Ok(page)
            }
            Err(fallback_failure) => Err(FetchFailure {
                reason: format!(
                    "{}; fallback failed: {}",
                    failure.reason, fallback_failure
                ),
                ..failure
            }),
        }
    }
}

/// Proxy URL for a target: the target URL appended to the proxy prefix.
pub fn fallback_url(proxy: &str, target_url: &str) -> String {
    format!("{proxy}{target_url}")
}

/// Classify the status and content type, then decode the body as text.
async fn read_body(response: Response) -> std::result::Result<String, FetchFailure> {
    let status = response.status();
    if matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
    ) {
        return Err(FetchFailure::blocked(format!("HTTP {status}")));
    }
    if !status.is_success() {
        return Err(FetchFailure::status(status.as_u16(), format!("HTTP {status}")));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if !is_textual_content_type(content_type.as_deref()) {
        return Err(FetchFailure::malformed(format!(
            "unexpected content type {}",
            content_type.unwrap_or_default()
        )));
    }

    response
        .text()
        .await
        .map_err(|e| FetchFailure::from_reqwest(&e))
}
