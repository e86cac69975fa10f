//! OpenAI chat-completions client for image summaries and folding.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::{FoldRequest, MediaSummarizer, MediaSummary, SummaryFolder};
use crate::config::AiConfig;
use crate::error::{AiError, AiResult};
use crate::response::decode_media_summary;

const IMAGE_MAX_TOKENS: u32 = 75;
const FOLD_MAX_TOKENS: u32 = 100;

const FOLD_PROMPT: &str = "You are given an array of story summaries. I am very busy, so keep \
only the most interesting ones and make them shorter without losing the idea. Maximum 100 \
characters, no markup symbols. Respond with one plain text, not a list. If it is empty or \
nothing is interesting or related to someone's life, return 'Nothing interesting'. Also suggest \
how I could start a conversation with them or an action to take. Write simply. User's \
preferences: ";

const FOLD_PROMPT_BUSINESS: &str = "You are given an array of story summaries from a business \
account. I am very busy, so keep only the most interesting ones and make them shorter without \
losing the idea. Maximum 100 characters, no markup symbols. Respond with one plain text, not a \
list. If it is empty or there is no interesting information, news or information useful to \
competitors, return 'Nothing interesting'. Write simply. User's preferences: ";

/// OpenAI API client.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    config: AiConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    /// Create a new OpenAI client.
    pub fn new(config: AiConfig) -> AiResult<Self> {
        if config.openai_api_key.is_empty() {
            return Err(AiError::config_error("OPENAI_API_KEY not set"));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AiError::config_error(format!("failed to build client: {}", e)))?;

        Ok(Self { client, config })
    }

    async fn complete(&self, request: &ChatRequest<'_>) -> AiResult<String> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.openai_base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.openai_api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                backend: "openai",
                status,
                body,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiError::invalid_response(format!("OpenAI response: {}", e)))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AiError::invalid_response("no choices in OpenAI response"))
    }
}

fn fold_system_prompt(request: &FoldRequest) -> String {
    let framing = if request.is_business {
        FOLD_PROMPT_BUSINESS
    } else {
        FOLD_PROMPT
    };
    format!("{}{}", framing, request.preferences)
}

#[async_trait]
impl MediaSummarizer for OpenAiClient {
    async fn summarize(&self, url: &str, prompt: &str) -> AiResult<MediaSummary> {
        let request = ChatRequest {
            model: &self.config.openai_model,
            messages: vec![ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: prompt.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: url.to_string(),
                        },
                    },
                ]),
            }],
            max_tokens: IMAGE_MAX_TOKENS,
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let text = self.complete(&request).await?;
        let summary = decode_media_summary(&text)?;
        debug!(url = %url, add_it = summary.add_it, "Image summarized");
        Ok(summary)
    }
}

#[async_trait]
impl SummaryFolder for OpenAiClient {
    async fn fold(&self, request: &FoldRequest) -> AiResult<String> {
        let summaries = serde_json::to_string(&request.summaries)
            .map_err(|e| AiError::invalid_response(format!("encode summaries: {}", e)))?;

        let chat = ChatRequest {
            model: &self.config.openai_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(fold_system_prompt(request)),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Text(summaries),
                },
            ],
            max_tokens: FOLD_MAX_TOKENS,
            response_format: None,
        };

        let folded = self.complete(&chat).await?;
        info!(
            inputs = request.summaries.len(),
            business = request.is_business,
            "Summaries folded"
        );
        Ok(folded.trim().to_string())
    }
}
