//! YandexGPT adapter (text processing).
//!
//! Talks to the Foundation Models `completion` endpoint and implements the core
//! [`TextGateway`] port. One HTTP request per operation, no retries.

use std::time::Duration;

use async_trait::async_trait;
use rtext_core::{
    config::Config,
    domain::{OperationKind, ProcessOptions},
    errors::Error,
    gateway::{finish_output, system_prompt, user_prompt, GatewayError, TextGateway},
    Result,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug)]
pub struct YandexGptClient {
    api_key: String,
    folder_id: String,
    model: String,
    url: String,
    temperature: f32,
    max_tokens: u32,
    http: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest<'a> {
    model_uri: String,
    completion_options: CompletionOptions,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionOptions {
    stream: bool,
    temperature: f32,
    // The API takes the token budget as a string.
    max_tokens: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    text: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    result: CompletionResult,
}

#[derive(Deserialize)]
struct CompletionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Deserialize)]
struct Alternative {
    message: AlternativeMessage,
}

#[derive(Deserialize)]
struct AlternativeMessage {
    #[serde(default)]
    text: String,
}

impl YandexGptClient {
    pub fn new(
        api_key: impl Into<String>,
        folder_id: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("yandex http client build error: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            folder_id: folder_id.into(),
            model: model.into(),
            url: rtext_core::config::DEFAULT_YANDEX_API_URL.to_string(),
            temperature: 0.3,
            max_tokens: 2000,
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self::new(
            cfg.yandex_api_key.clone(),
            cfg.yandex_folder_id.clone(),
            cfg.yandex_model.clone(),
            cfg.gateway_timeout,
        )?
        .with_url(cfg.yandex_api_url.clone())
        .with_sampling(cfg.yandex_temperature, cfg.yandex_max_tokens))
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    fn model_uri(&self) -> String {
        format!("gpt://{}/{}", self.folder_id, self.model)
    }

    async fn complete(&self, system: &str, user: &str) -> std::result::Result<String, GatewayError> {
        let body = CompletionRequest {
            model_uri: self.model_uri(),
            completion_options: CompletionOptions {
                stream: false,
                temperature: self.temperature,
                max_tokens: self.max_tokens.to_string(),
            },
            messages: [
                ChatMessage {
                    role: "system",
                    text: system,
                },
                ChatMessage {
                    role: "user",
                    text: user,
                },
            ],
        };

        let resp = self
            .http
            .post(&self.url)
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .header("x-folder-id", &self.folder_id)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::upstream(status.as_u16(), &body));
        }

        let raw = resp.text().await.map_err(map_reqwest_error)?;
        extract_text(&raw)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Network(e.to_string())
    }
}

fn extract_text(raw: &str) -> std::result::Result<String, GatewayError> {
    let parsed: CompletionResponse = serde_json::from_str(raw)
        .map_err(|e| GatewayError::MalformedResponse(format!("invalid json: {e}")))?;

    let text = parsed
        .result
        .alternatives
        .into_iter()
        .next()
        .map(|a| a.message.text)
        .ok_or_else(|| GatewayError::MalformedResponse("no alternatives".to_string()))?;

    if text.trim().is_empty() {
        return Err(GatewayError::MalformedResponse("empty text".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl TextGateway for YandexGptClient {
    async fn process(
        &self,
        text: &str,
        operation: OperationKind,
        options: ProcessOptions,
    ) -> std::result::Result<String, GatewayError> {
        let system = system_prompt(operation, options);
        let user = user_prompt(text);
        tracing::debug!(
            operation = %operation,
            model = %self.model,
            chars = text.chars().count(),
            "yandexgpt request"
        );

        let raw = self.complete(&system, &user).await?;
        Ok(finish_output(&raw, options))
    }
}
