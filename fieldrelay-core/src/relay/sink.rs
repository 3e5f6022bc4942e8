//! Webhook sink for rendered reports
//!
//! The relay depends only on a boolean outcome: a report was accepted or it
//! was not. Anything vendor-specific about the receiving end stays behind
//! [`ReportSink`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;

use crate::config::RelayConfig;
use crate::error::{Error, Result};

/// Remote destination for rendered reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Submit one rendered report.
    ///
    /// `true` means the remote confirmed acceptance; anything else -
    /// non-2xx response, transport error, timeout - is `false`. Submission
    /// is a single attempt; retry policy belongs to the caller.
    async fn submit(&self, report_text: &str) -> bool;
}

/// HTTP implementation of [`ReportSink`]: one POST per report.
pub struct WebhookSink {
    http_client: reqwest::Client,
    endpoint_url: String,
}

/// Request body for the webhook POST
#[derive(Serialize)]
struct SubmitRequest<'a> {
    text: &'a str,
}

impl WebhookSink {
    /// Create a new sink from configuration.
    ///
    /// Returns an error if the configuration is invalid or missing the
    /// endpoint.
    pub fn new(config: &RelayConfig) -> Result<Self> {
        config.validate()?;

        let endpoint_url = config
            .endpoint_url
            .clone()
            .ok_or_else(|| Error::Config("relay.endpoint_url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();

        // Build default headers
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &config.auth_token {
            let auth_value = format!("Bearer {}", token);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid auth_token: {}", e)))?,
            );
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint_url,
        })
    }
}

#[async_trait]
impl ReportSink for WebhookSink {
    async fn submit(&self, report_text: &str) -> bool {
        let request_body = SubmitRequest { text: report_text };

        let response = self
            .http_client
            .post(&self.endpoint_url)
            .json(&request_body)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(status = %response.status(), "Report accepted");
                true
            }
            Ok(response) => {
                tracing::warn!(status = %response.status(), "Report rejected");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Report submission failed");
                false
            }
        }
    }
}
