//! Vision service client.
//!
//! The pipeline only needs one capability from the service: "here is an
//! instruction and an image, give me text back". `VisionService` is that
//! seam; `OpenAiVisionClient` implements it against a chat-completions
//! endpoint with a blocking HTTP client.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::encode::EncodedImage;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};

/// Longest slice of an error body kept in a failure message.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// An external image-understanding service.
pub trait VisionService {
    /// Sends one instruction + image and returns the reply text.
    fn describe(&self, prompt: &str, image: &EncodedImage) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Chat-completions client for vision-capable models.
pub struct OpenAiVisionClient {
    client: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiVisionClient {
    /// Builds a client from config. The API key is read from the environment
    /// variable named by `api_key_env`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                PipelineError::config(format!(
                    "{} is not set (environment or .env file)",
                    config.api_key_env
                ))
            })?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PipelineError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

impl VisionService for OpenAiVisionClient {
    fn describe(&self, prompt: &str, image: &EncodedImage) -> Result<String> {
        let body = build_request(&self.model, self.max_tokens, prompt, image);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| PipelineError::service(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(PipelineError::service(format!(
                "HTTP {}: {}",
                status,
                truncate(&text, MAX_ERROR_BODY_CHARS)
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| PipelineError::service(format!("Unreadable response body: {}", e)))?;

        reply_text(parsed)
    }
}

fn build_request<'a>(
    model: &'a str,
    max_tokens: u32,
    prompt: &'a str,
    image: &EncodedImage,
) -> ChatRequest<'a> {
    ChatRequest {
        model,
        max_tokens,
        messages: vec![ChatMessage {
            role: "user",
            content: vec![
                ContentPart::Text { text: prompt },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.data_url(),
                    },
                },
            ],
        }],
    }
}

/// Pulls the first choice's text out of a response.
fn reply_text(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| PipelineError::service("Response contained no message content"))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}
