//! Render service client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::RenderConfig;
use crate::error::{RenderError, RenderResult};
use crate::timeline::RenderRequest;

/// State of a submitted render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderStatus {
    /// Not finished; carries the service's status label
    Pending(String),
    Ready(String),
    Failed(String),
}

/// Submits timelines and reports render progress.
#[async_trait]
pub trait VideoComposer: Send + Sync {
    /// Queue a render. Returns the render id.
    async fn submit(&self, request: &RenderRequest) -> RenderResult<String>;

    async fn poll(&self, render_id: &str) -> RenderResult<RenderStatus>;

    /// Poll at a fixed interval until the URL is ready or the render fails.
    ///
    /// Transient poll errors are logged and retried; there is no overall
    /// deadline.
    async fn wait_for_url(&self, render_id: &str, interval: Duration) -> RenderResult<String> {
        loop {
            match self.poll(render_id).await {
                Ok(RenderStatus::Ready(url)) => return Ok(url),
                Ok(RenderStatus::Failed(reason)) => return Err(RenderError::RenderFailed(reason)),
                Ok(RenderStatus::Pending(status)) => {
                    debug!(render_id = %render_id, status = %status, "Render not ready");
                }
                Err(e) => {
                    warn!(render_id = %render_id, "Render status check failed: {}", e);
                }
            }
            tokio::time::sleep(interval).await;
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    response: Option<T>,
}

#[derive(Debug, Deserialize)]
struct QueuedRender {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RenderState {
    #[serde(default)]
    status: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Shotstack edit API client.
#[derive(Clone)]
pub struct ShotstackClient {
    client: Client,
    config: RenderConfig,
}

impl ShotstackClient {
    pub fn new(config: RenderConfig) -> RenderResult<Self> {
        if !config.is_configured() {
            return Err(RenderError::config_error("SHOTSTACK_API_KEY not set"));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RenderError::config_error(format!("failed to build client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl VideoComposer for ShotstackClient {
    async fn submit(&self, request: &RenderRequest) -> RenderResult<String> {
        let response = self
            .client
            .post(self.url("/render"))
            .header("x-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let envelope: Envelope<QueuedRender> = serde_json::from_str(&text).map_err(|_| {
            RenderError::Api {
                status: status.as_u16(),
                body: text.clone(),
            }
        })?;

        if !envelope.success {
            return Err(RenderError::Rejected(
                envelope.message.unwrap_or_else(|| status.to_string()),
            ));
        }

        let queued = envelope
            .response
            .ok_or_else(|| RenderError::invalid_response("render id missing"))?;

        info!(render_id = %queued.id, "Render queued");
        Ok(queued.id)
    }

    async fn poll(&self, render_id: &str) -> RenderResult<RenderStatus> {
        let response = self
            .client
            .get(self.url(&format!("/render/{}", render_id)))
            .header("x-api-key", &self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let envelope: Envelope<RenderState> = serde_json::from_str(&text).map_err(|_| {
            RenderError::Api {
                status: status.as_u16(),
                body: text.clone(),
            }
        })?;

        let state = match envelope.response {
            Some(state) if envelope.success => state,
            _ => {
                return Ok(RenderStatus::Pending(
                    envelope.message.unwrap_or_else(|| "unknown".to_string()),
                ))
            }
        };

        if state.status == "failed" {
            return Ok(RenderStatus::Failed(
                state.error.unwrap_or_else(|| "render failed".to_string()),
            ));
        }

        match state.url {
            Some(url) if !url.is_empty() => Ok(RenderStatus::Ready(url)),
            _ => Ok(RenderStatus::Pending(state.status)),
        }
    }
}
