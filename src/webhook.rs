//! Webhook dispatch with bounded retry.

use crate::RetryPolicy;
use crate::error::{RedeployError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{info, warn};

pub const USER_AGENT: &str = concat!("compose_redeploy/", env!("CARGO_PKG_VERSION"));

/// Optional pass-through access-gateway credentials, sent verbatim when the
/// corresponding environment variable is set.
pub const CF_ACCESS_ID_VAR: &str = "CF_ACCESS_CLIENT_ID";
pub const CF_ACCESS_SECRET_VAR: &str = "CF_ACCESS_CLIENT_SECRET";

const CF_ACCESS_ID_HEADER: &str = "CF-Access-Client-Id";
const CF_ACCESS_SECRET_HEADER: &str = "CF-Access-Client-Secret";

#[async_trait]
pub trait WebhookDispatcher {
    /// Trigger the redeploy webhook at `url` for `service`, retrying on
    /// failure. Returns the last error once attempts are exhausted.
    async fn trigger(&self, url: &str, service: &str) -> Result<()>;
}

/// Real dispatcher issuing HTTPS POSTs via reqwest.
pub struct HttpDispatcher {
    client: Client,
    retry: RetryPolicy,
    append_action: bool,
    access_client_id: Option<String>,
    access_client_secret: Option<String>,
}

impl HttpDispatcher {
    pub fn new(retry: RetryPolicy, append_action: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(retry.request_timeout())
            .build()
            .map_err(|e| RedeployError::NetworkError(e.to_string()))?;
        Ok(Self {
            client,
            retry,
            append_action,
            access_client_id: std::env::var(CF_ACCESS_ID_VAR).ok(),
            access_client_secret: std::env::var(CF_ACCESS_SECRET_VAR).ok(),
        })
    }

    /// One POST attempt. The response body is never read; only the status
    /// code is inspected, so upstream details cannot leak into errors.
    async fn attempt(&self, url: &str) -> Result<()> {
        let mut request = self.client.post(url);
        if self.append_action {
            request = request.query(&[("action", "redeploy")]);
        }
        if let Some(id) = &self.access_client_id {
            request = request.header(CF_ACCESS_ID_HEADER, id);
        }
        if let Some(secret) = &self.access_client_secret {
            request = request.header(CF_ACCESS_SECRET_HEADER, secret);
        }

        // reqwest embeds the request URL in its error Display, and the URL
        // is the webhook secret. Strip it before the error becomes visible.
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RedeployError::Timeout
            } else {
                RedeployError::NetworkError(e.without_url().to_string())
            }
        })?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            status => Err(RedeployError::HttpFailure {
                status: status.as_u16(),
            }),
        }
    }
}

#[async_trait]
impl WebhookDispatcher for HttpDispatcher {
    async fn trigger(&self, url: &str, service: &str) -> Result<()> {
        let max = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.attempt(url).await {
                Ok(()) => {
                    info!(
                        "Redeploy webhook for '{}' accepted (attempt {}/{})",
                        service, attempt, max
                    );
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Redeploy webhook for '{}' failed (attempt {}/{}): {}",
                        service, attempt, max, e
                    );
                    if attempt >= max {
                        return Err(e);
                    }
                    attempt += 1;
                    tokio::time::sleep(self.retry.retry_delay()).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            retry_delay_ms: 10,
            request_timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt_after_two_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = HttpDispatcher::new(test_retry(), true).unwrap();
        let url = format!("{}/hook", server.uri());
        dispatcher.trigger(&url, "flaky").await.unwrap();

        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn exhausts_attempts_without_leaking_the_response_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500).set_body_string("internal portainer stack trace"),
            )
            .expect(3)
            .mount(&server)
            .await;

        let dispatcher = HttpDispatcher::new(test_retry(), true).unwrap();
        let url = format!("{}/hook", server.uri());
        let err = dispatcher.trigger(&url, "broken").await.unwrap_err();

        assert!(matches!(err, RedeployError::HttpFailure { status: 500 }));
        assert!(!err.to_string().contains("internal portainer stack trace"));
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn status_204_counts_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = HttpDispatcher::new(test_retry(), true).unwrap();
        let url = format!("{}/hook", server.uri());
        dispatcher.trigger(&url, "quiet").await.unwrap();
    }

    #[tokio::test]
    async fn appends_the_redeploy_action_parameter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("action", "redeploy"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = HttpDispatcher::new(test_retry(), true).unwrap();
        let url = format!("{}/hook", server.uri());
        dispatcher.trigger(&url, "svc").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let ua = requests[0]
            .headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(ua.starts_with("compose_redeploy/"));
    }

    #[tokio::test]
    async fn omits_the_action_parameter_when_disabled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = HttpDispatcher::new(test_retry(), false).unwrap();
        let url = format!("{}/hook", server.uri());
        dispatcher.trigger(&url, "svc").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.query(), None);
    }

    #[tokio::test]
    async fn connection_failure_does_not_leak_the_webhook_url() {
        let retry = RetryPolicy {
            max_attempts: 1,
            retry_delay_ms: 10,
            request_timeout_secs: 1,
        };
        let dispatcher = HttpDispatcher::new(retry, true).unwrap();
        // Port 9 (discard) refuses connections; the path segment is the secret.
        let url = "https://127.0.0.1:9/api/webhooks/secret-token-abc123";
        let err = dispatcher.trigger(url, "unreachable").await.unwrap_err();

        assert!(matches!(err, RedeployError::NetworkError(_)));
        let text = err.to_string();
        assert!(!text.contains("secret-token-abc123"));
        assert!(!text.contains("127.0.0.1:9"));
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let retry = RetryPolicy {
            max_attempts: 1,
            retry_delay_ms: 10,
            request_timeout_secs: 1,
        };
        let dispatcher = HttpDispatcher::new(retry, true).unwrap();
        let url = format!("{}/hook", server.uri());
        let err = dispatcher.trigger(&url, "sluggish").await.unwrap_err();
        assert!(matches!(err, RedeployError::Timeout));
    }
}
