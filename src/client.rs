//! SonarCloud API client.
//!
//! Low-level HTTP client that handles authentication, retries and raw requests.
//! Higher-level operations are implemented via traits on model types.

use std::env;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use backoff::future::retry_notify;
use backoff::{Error as BackoffError, ExponentialBackoff, ExponentialBackoffBuilder};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use url::Url;

use crate::error::{Result, SonarError};

const DEFAULT_API_URL: &str = "https://sonarcloud.io/";
const USER_AGENT: &str = concat!("sonarmine/", env!("CARGO_PKG_VERSION"));

/// Retry behaviour for transient API failures.
///
/// Failed attempts are retried with exponential backoff when the response
/// status is in `retry_statuses` or the connection could not be established.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on every subsequent retry.
    pub initial_interval: Duration,
    /// Upper bound for a single delay.
    pub max_interval: Duration,
    /// Status codes considered transient.
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(60),
            retry_statuses: vec![502, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_interval(self.max_interval)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Decide whether the outcome of attempt number `attempt` (0-based) is final.
    fn classify(
        &self,
        outcome: reqwest::Result<Response>,
        attempt: u32,
    ) -> core::result::Result<Response, BackoffError<SonarError>> {
        let can_retry = attempt < self.max_retries;
        match outcome {
            Ok(response)
                if can_retry && self.retry_statuses.contains(&response.status().as_u16()) =>
            {
                let status = response.status();
                Err(BackoffError::transient(SonarError::ApiError {
                    message: format!("HTTP {status} from {}", response.url()),
                    status_code: Some(status.as_u16()),
                }))
            }
            Ok(response) => Ok(response),
            Err(err) if can_retry && (err.is_connect() || err.is_timeout()) => {
                Err(BackoffError::transient(SonarError::HttpError(err)))
            }
            Err(err) => Err(BackoffError::permanent(SonarError::HttpError(err))),
        }
    }
}

/// Low-level SonarCloud API client.
///
/// Handles authentication and HTTP requests. Entity-specific operations
/// are implemented via the `Get` and `List` traits on model types.
///
/// This struct is cheaply cloneable; clones reference the same underlying
/// connection pool.
///
/// # Example
///
/// ```no_run
/// use sonarmine::SonarClient;
///
/// # fn example() -> sonarmine::Result<()> {
/// // Create from environment variables
/// let client = SonarClient::from_env()?;
///
/// // Or configure manually (the public API needs no token)
/// let client = SonarClient::new("https://sonarcloud.io", None)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SonarClient {
    http: Client,
    base_url: Arc<Url>,
    token: Option<String>,
    retry: Arc<RetryPolicy>,
}

impl std::fmt::Debug for SonarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SonarClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl SonarClient {
    /// Create a client from environment variables.
    ///
    /// Uses `SONAR_TOKEN` for authentication when set and `SONAR_URL`
    /// for the base URL (defaults to `https://sonarcloud.io/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid.
    pub fn from_env() -> Result<Self> {
        let token = env::var("SONAR_TOKEN").ok().filter(|t| !t.is_empty());
        let base_url = env::var("SONAR_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        Self::new(&base_url, token.as_deref())
    }

    /// Create a new client with the provided base URL and optional token.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        // Ensure base URL ends with /
        let base_url_str = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };

        let base_url = Url::parse(&base_url_str)?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(SonarError::HttpError)?;

        Ok(Self {
            http,
            base_url: Arc::new(base_url),
            token: token.map(str::to_string),
            retry: Arc::new(RetryPolicy::default()),
        })
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Arc::new(policy);
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a GET request with query parameters against an API path.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_with_query<Q: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<Response> {
        let url = self.base_url.join(path)?;

        let response = self
            .send_with_retry(|| self.authorized(self.http.get(url.clone())).query(query))
            .await?;

        Self::check_response(response).await
    }

    /// Fetch an absolute URL without authentication and report its status code.
    ///
    /// The status is returned as-is; non-success codes are not errors.
    #[tracing::instrument(skip(self), fields(url = %url))]
    pub async fn probe(&self, url: &Url) -> Result<StatusCode> {
        let response = self.send_with_retry(|| self.http.get(url.clone())).await?;
        Ok(response.status())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_with_retry<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder + Sync,
    {
        let policy: &RetryPolicy = &self.retry;
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;
        let build = &build;

        retry_notify(
            policy.backoff(),
            move || async move {
                let attempt = attempts.fetch_add(1, Ordering::Relaxed);
                policy.classify(build().send().await, attempt)
            },
            |err: SonarError, wait: Duration| {
                tracing::warn!(error = %err, wait_ms = wait.as_millis() as u64, "retrying request");
            },
        )
        .await
    }

    /// Check response status and convert errors.
    async fn check_response(response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        // Handle rate limiting
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(SonarError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let message = Self::extract_error_message(response, status).await;
        Err(SonarError::ApiError {
            message,
            status_code: Some(status.as_u16()),
        })
    }

    /// Extract error message from a failed response.
    async fn extract_error_message(response: Response, status: StatusCode) -> String {
        let body = match response.text().await {
            Ok(b) => b,
            Err(_) => return format!("HTTP {status}"),
        };

        error_message_from_body(&body).unwrap_or_else(|| {
            if body.is_empty() {
                format!("HTTP {status}")
            } else {
                body
            }
        })
    }
}

/// Pull a human-readable message out of a SonarQube error body.
///
/// SonarQube wraps errors as `{"errors":[{"msg":"..."}]}`; other gateways
/// use a flat `message` or `error` field.
fn error_message_from_body(body: &str) -> Option<String> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;

    if let Some(errors) = json.get("errors").and_then(|e| e.as_array()) {
        let msgs: Vec<&str> = errors
            .iter()
            .filter_map(|e| e.get("msg").and_then(|m| m.as_str()))
            .collect();
        if !msgs.is_empty() {
            return Some(msgs.join("; "));
        }
    }
    if let Some(msg) = json.get("message").and_then(|m| m.as_str()) {
        return Some(msg.to_string());
    }
    json.get("error")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}
