//! Content gateway client.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use recap_models::SubjectFeed;

use crate::config::SourceConfig;
use crate::error::{SourceError, SourceResult};
use crate::session::Session;

/// Header carrying the session token on feed requests.
const SESSION_HEADER: &str = "x-session-token";

/// Where subject profiles and stories come from.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Log in with credentials.
    async fn authenticate(&self, login: &str, password: &str) -> SourceResult<Session>;

    /// Resume a previously exported session, validating it with the gateway.
    async fn resume(&self, blob: &str) -> SourceResult<Session>;

    /// Fetch a subject's profile flags and current story items.
    async fn fetch_feed(&self, session: &Session, subject: &str) -> SourceResult<SubjectFeed>;
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    login: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct ResumeRequest<'a> {
    login: &'a str,
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    token: String,
}

/// HTTP client for the content gateway.
#[derive(Clone)]
pub struct HttpContentSource {
    client: Client,
    config: SourceConfig,
}

impl HttpContentSource {
    pub fn new(config: SourceConfig) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::config_error(format!("failed to build client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> SourceResult<Self> {
        Self::new(SourceConfig::from_env())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn error_body(response: Response) -> (u16, String) {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        (status, body)
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn authenticate(&self, login: &str, password: &str) -> SourceResult<Session> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginRequest { login, password })
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let (_, body) = Self::error_body(response).await;
                return Err(SourceError::authentication_failed(body));
            }
            _ => {
                let (status, body) = Self::error_body(response).await;
                return Err(SourceError::Status { status, body });
            }
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| SourceError::invalid_response(format!("login response: {}", e)))?;

        info!(login = %login, "Authenticated with content gateway");
        Ok(Session::new(login, session.token))
    }

    async fn resume(&self, blob: &str) -> SourceResult<Session> {
        let stored = Session::import(blob)?;

        let response = self
            .client
            .post(self.url("/auth/resume"))
            .json(&ResumeRequest {
                login: &stored.login,
                token: &stored.token,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = Self::error_body(response).await;
            return Err(SourceError::SessionRejected(format!("{}: {}", status, body)));
        }

        // The gateway may rotate the token on resume
        let refreshed: SessionResponse = response
            .json()
            .await
            .map_err(|e| SourceError::invalid_response(format!("resume response: {}", e)))?;

        debug!(login = %stored.login, "Resumed content gateway session");
        Ok(Session::new(stored.login, refreshed.token))
    }

    async fn fetch_feed(&self, session: &Session, subject: &str) -> SourceResult<SubjectFeed> {
        let path = format!("/users/{}/stories", urlencoding::encode(subject));
        debug!(subject = %subject, "Fetching subject feed");

        let response = self
            .client
            .get(self.url(&path))
            .header(SESSION_HEADER, &session.token)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => return Err(SourceError::SubjectNotFound(subject.to_string())),
            _ => {
                let (status, body) = Self::error_body(response).await;
                return Err(SourceError::Status { status, body });
            }
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::invalid_response(format!("feed for {}: {}", subject, e)))
    }
}
