use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Classification of errors for retry strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryableError {
    /// 429 or an application-level rate-limit message - retry
    RateLimit,
    /// Network failure, timeout or 5xx - retry
    Transient,
    /// Other errors - don't retry
    Other,
}

/// Shared backoff policy for every external call site.
///
/// Delay grows as `base_delay_ms * 2^attempt` with `attempt` starting at 0,
/// so the defaults wait 1s before the first retry and 2s before the second.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not including the initial attempt)
    pub max_retries: u32,
    /// Base delay in milliseconds for the exponential schedule
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
        }
    }

    /// Delay before the retry following `attempt` (0-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // Capped shift keeps the multiplier from overflowing on absurd configs.
        let factor = 1u64 << attempt.min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Retry an async operation with exponential backoff
///
/// # Arguments
/// * `operation` - The async operation to retry (a closure that returns a Future)
/// * `policy` - Backoff policy
/// * `classify_error` - Function to classify errors for retry strategy
///
/// # Returns
/// * `Ok(T)` - Operation succeeded (either on first attempt or after retries)
/// * `Err(E)` - Operation failed after all retries exhausted, or failed with a
///   non-retryable error
pub async fn retry_with_backoff<F, Fut, T, E>(
    mut operation: F,
    policy: &RetryPolicy,
    classify_error: impl Fn(&E) -> RetryableError,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("✅ Operation succeeded after {} retry attempts", attempt);
                }
                return Ok(result);
            }
            Err(e) => {
                let error_type = classify_error(&e);

                if error_type == RetryableError::Other {
                    error!("❌ Operation failed with non-retryable error: {}", e);
                    return Err(e);
                }

                if attempt >= policy.max_retries {
                    error!(
                        "❌ Operation failed after {} attempts (max retries exhausted): {}",
                        attempt + 1,
                        e
                    );
                    return Err(e);
                }

                let delay = policy.delay_for(attempt);
                warn!(
                    "⚠️  Operation failed (attempt {}/{}): {} - Retrying in {}ms (error type: {:?})",
                    attempt + 1,
                    policy.max_retries + 1,
                    e,
                    delay.as_millis(),
                    error_type
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Errors surfaced by [`HttpCaller::call`] after the retry policy is spent.
#[derive(Error, Debug)]
pub enum CallError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rate limited by provider")]
    RateLimited,
    #[error("provider error: {message}")]
    Provider {
        status: Option<u16>,
        message: String,
    },
}

/// Classify a [`CallError`] for [`retry_with_backoff`].
///
/// 429s and rate-limit messages retry on the rate-limit schedule, network
/// failures and 5xx responses retry as transient, everything else fails fast.
pub fn classify_call_error(error: &CallError) -> RetryableError {
    match error {
        CallError::RateLimited => RetryableError::RateLimit,
        CallError::Transport(_) => RetryableError::Transient,
        CallError::Provider {
            status: Some(status),
            ..
        } if *status >= 500 => RetryableError::Transient,
        CallError::Provider { .. } => RetryableError::Other,
    }
}

/// Description of a single JSON HTTP request, rebuilt on every retry attempt.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    json_body: Option<Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            json_body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.json_body = Some(body);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// HTTP executor shared by all provider clients.
///
/// Issues a request, parses the JSON body, and retries per [`RetryPolicy`] on
/// transport failures, 429s, 5xx responses and application-level rate-limit
/// messages. Expected provider failures come back as [`CallError`] values,
/// never panics, so one bad call can be dropped without aborting a scan.
#[derive(Debug, Clone)]
pub struct HttpCaller {
    client: Client,
    policy: RetryPolicy,
}

impl HttpCaller {
    pub fn new(timeout: Duration, policy: RetryPolicy) -> Result<Self, CallError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `request` with retries, returning the parsed JSON body.
    pub async fn call(&self, request: &HttpRequest) -> Result<Value, CallError> {
        retry_with_backoff(|| self.execute(request), &self.policy, classify_call_error).await
    }

    async fn execute(&self, request: &HttpRequest) -> Result<Value, CallError> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.json_body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CallError::RateLimited);
        }
        if !status.is_success() {
            return Err(CallError::Provider {
                status: Some(status.as_u16()),
                message: status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            });
        }

        let body: Value = response.json().await?;

        if let Some(message) = app_error_message(&body) {
            if message.to_lowercase().contains("rate limit") {
                return Err(CallError::RateLimited);
            }
            return Err(CallError::Provider {
                status: None,
                message,
            });
        }

        Ok(body)
    }
}

/// Extract an application-level error message from a parsed body.
///
/// Understands both the JSON-RPC shape `{"error": {"message": ...}}` and the
/// plain `{"error": "..."}` shape some REST providers return.
fn app_error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    match error {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        other => Some(
            other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct TestError {
        kind: &'static str,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "TestError: {}", self.kind)
        }
    }

    fn classify_test_error(e: &TestError) -> RetryableError {
        match e.kind {
            "rate_limit" => RetryableError::RateLimit,
            "transient" => RetryableError::Transient,
            _ => RetryableError::Other,
        }
    }

    #[tokio::test]
    async fn test_immediate_success() {
        let result = retry_with_backoff(
            || async { Ok::<_, TestError>(42) },
            &RetryPolicy::default(),
            classify_test_error,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_non_retryable_error() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>(TestError { kind: "fatal" })
                }
            },
            &RetryPolicy::default(),
            classify_test_error,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1); // Should not retry
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(TestError { kind: "rate_limit" })
                    } else {
                        Ok(42)
                    }
                }
            },
            &RetryPolicy::new(3, 10),
            classify_test_error,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>(TestError { kind: "rate_limit" })
                }
            },
            &RetryPolicy::new(2, 10),
            classify_test_error,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3); // Initial + 2 retries
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_at_least_one_second() {
        let started = tokio::time::Instant::now();
        let attempts = Arc::new(AtomicUsize::new(0));

        let result = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        Err(CallError::RateLimited)
                    } else {
                        Ok(7)
                    }
                }
            },
            &RetryPolicy::default(),
            classify_call_error,
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        // 2^0 seconds before the second attempt
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_per_attempt() {
        let started = tokio::time::Instant::now();
        let result = retry_with_backoff(
            || async { Err::<i32, _>(TestError { kind: "transient" }) },
            &RetryPolicy::default(),
            classify_test_error,
        )
        .await;

        assert!(result.is_err());
        // 1s after the first failure plus 2s after the second
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_classify_call_error() {
        assert_eq!(
            classify_call_error(&CallError::RateLimited),
            RetryableError::RateLimit
        );
        assert_eq!(
            classify_call_error(&CallError::Provider {
                status: Some(503),
                message: "Service Unavailable".to_string(),
            }),
            RetryableError::Transient
        );
        assert_eq!(
            classify_call_error(&CallError::Provider {
                status: Some(404),
                message: "Not Found".to_string(),
            }),
            RetryableError::Other
        );
        assert_eq!(
            classify_call_error(&CallError::Provider {
                status: None,
                message: "invalid params".to_string(),
            }),
            RetryableError::Other
        );
    }

    #[test]
    fn test_app_error_message_shapes() {
        assert_eq!(
            app_error_message(&json!({"error": {"message": "rate limit exceeded"}})),
            Some("rate limit exceeded".to_string())
        );
        assert_eq!(
            app_error_message(&json!({"error": "coin not found"})),
            Some("coin not found".to_string())
        );
        assert_eq!(app_error_message(&json!({"error": null})), None);
        assert_eq!(app_error_message(&json!({"result": []})), None);
    }

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::post("https://example.com/rpc")
            .header("Accept", "application/json")
            .json(json!({"id": 1}));
        assert_eq!(request.url(), "https://example.com/rpc");
    }
}
