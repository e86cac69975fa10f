//! Gemini client for video summaries.
//!
//! Videos go through the file API: the media is downloaded, uploaded raw,
//! polled until Gemini finishes processing it, then referenced from a
//! `generateContent` call. Generation walks the configured model list until
//! one succeeds.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{MediaSummarizer, MediaSummary};
use crate::config::AiConfig;
use crate::error::{AiError, AiResult};
use crate::response::decode_media_summary;

const VIDEO_MIME_TYPE: &str = "video/mp4";

/// Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    config: AiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    File {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
struct FileData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    #[serde(rename = "fileUri")]
    file_uri: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

#[derive(Debug, Clone, Deserialize)]
struct UploadedFile {
    name: String,
    uri: String,
    #[serde(default)]
    state: String,
}

impl UploadedFile {
    fn is_processing(&self) -> bool {
        self.state == "PROCESSING"
    }

    fn is_active(&self) -> bool {
        self.state == "ACTIVE"
    }
}

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new(config: AiConfig) -> AiResult<Self> {
        if config.gemini_api_key.is_empty() {
            return Err(AiError::config_error("GEMINI_API_KEY not set"));
        }
        if config.gemini_models.is_empty() {
            return Err(AiError::config_error("no Gemini models configured"));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AiError::config_error(format!("failed to build client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.gemini_base_url.trim_end_matches('/')
    }

    async fn download(&self, url: &str) -> AiResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AiError::download_failed(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }
        let bytes = response.bytes().await?;
        debug!(url = %url, bytes = bytes.len(), "Downloaded media");
        Ok(bytes.to_vec())
    }

    async fn upload(&self, bytes: Vec<u8>) -> AiResult<UploadedFile> {
        let url = format!("{}/upload/v1beta/files?uploadType=media", self.base_url());
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.gemini_api_key.as_str())])
            .header(reqwest::header::CONTENT_TYPE, VIDEO_MIME_TYPE)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                backend: "gemini",
                status,
                body,
            });
        }

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| AiError::invalid_response(format!("upload response: {}", e)))?;
        Ok(upload.file)
    }

    async fn get_file(&self, name: &str) -> AiResult<UploadedFile> {
        let url = format!("{}/v1beta/{}", self.base_url(), name);
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.config.gemini_api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                backend: "gemini",
                status,
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| AiError::invalid_response(format!("file response: {}", e)))
    }

    /// Upload a video and wait until Gemini can reference it.
    async fn upload_and_wait(&self, url: &str) -> AiResult<UploadedFile> {
        let bytes = self.download(url).await?;
        let mut file = self.upload(bytes).await?;

        while file.is_processing() {
            tokio::time::sleep(self.config.file_poll_interval).await;
            file = self.get_file(&file.name).await?;
        }

        if !file.is_active() {
            return Err(AiError::FileNotActive(file.state));
        }

        debug!(name = %file.name, "Uploaded file is active");
        Ok(file)
    }

    async fn generate(&self, model: &str, file: &UploadedFile, prompt: &str) -> AiResult<MediaSummary> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url(), model);

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::File {
                        file_data: FileData {
                            mime_type: VIDEO_MIME_TYPE.to_string(),
                            file_uri: file.uri.clone(),
                        },
                    },
                    Part::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.gemini_api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                backend: "gemini",
                status,
                body,
            });
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AiError::invalid_response(format!("Gemini response: {}", e)))?;

        let text = gemini_response
            .candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .filter_map(|c| c.parts.first())
            .map(|p| p.text.as_str())
            .next()
            .ok_or_else(|| AiError::invalid_response("no content in Gemini response"))?;

        decode_media_summary(text)
    }
}

#[async_trait]
impl MediaSummarizer for GeminiClient {
    async fn summarize(&self, url: &str, prompt: &str) -> AiResult<MediaSummary> {
        let file = self.upload_and_wait(url).await?;

        let mut last_error = None;
        for model in &self.config.gemini_models {
            debug!(model = %model, "Attempting Gemini generation");
            match self.generate(model, &file, prompt).await {
                Ok(summary) => {
                    info!(model = %model, url = %url, "Video summarized");
                    return Ok(summary);
                }
                Err(e) => {
                    warn!(model = %model, "Gemini generation failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AiError::invalid_response("all Gemini models failed")))
    }
}
