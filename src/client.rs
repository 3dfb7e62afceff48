use crate::{
    config::{ApiKind, GenerateConfig},
    credentials::ApiKey,
    error::{Error, Result},
    prompt::Prompt,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

/// A text-generation backend.
///
/// [`OpenAiClient`] talks to an OpenAI-compatible HTTP API; tests and
/// alternative backends implement this trait directly.
pub trait CompletionClient {
    /// Sends the prompt and returns the generated text.
    ///
    /// # Errors
    ///
    /// Returns a remote error if the request fails or the response holds no text.
    fn complete(&self, prompt: &Prompt) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: String,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for OpenAI-compatible completion APIs.
pub struct OpenAiClient {
    http: reqwest::blocking::Client,
    api_key: ApiKey,
    url: String,
    model: String,
    api_kind: ApiKind,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &GenerateConfig, api_key: ApiKey) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_key,
            url: config.endpoint_url(),
            model: config.model.clone(),
            api_kind: config.api_kind,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn request_body(&self, prompt: &Prompt) -> Result<Value> {
        let body = match self.api_kind {
            ApiKind::Chat => serde_json::to_value(ChatRequest {
                model: &self.model,
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: &prompt.system,
                    },
                    ChatMessage {
                        role: "user",
                        content: &prompt.user,
                    },
                ],
                temperature: self.temperature,
            })?,
            ApiKind::Completions => serde_json::to_value(CompletionRequest {
                model: &self.model,
                prompt: prompt.combined(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                top_p: 1.0,
                frequency_penalty: 0.0,
                presence_penalty: 1.0,
            })?,
        };
        Ok(body)
    }
}

impl CompletionClient for OpenAiClient {
    #[instrument(skip_all, fields(url = %self.url, model = %self.model))]
    fn complete(&self, prompt: &Prompt) -> Result<String> {
        let body = self.request_body(prompt)?;

        debug!("Sending request ({} prompt bytes)", prompt.size());

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .map_err(|e| Error::remote(None, e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| Error::remote(Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            return Err(Error::remote(Some(status.as_u16()), api_error_message(&text)));
        }

        extract_text(&text, self.api_kind)
    }
}

/// Pulls `error.message` out of an API error body, falling back to the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Reads the generated text from a successful response body.
fn extract_text(body: &str, api_kind: ApiKind) -> Result<String> {
    let response: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| Error::remote(None, format!("malformed response: {e}")))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::remote(None, "response contained no choices"))?;

    let content = match api_kind {
        ApiKind::Chat => choice.message.and_then(|m| m.content),
        ApiKind::Completions => choice.text,
    };

    content.ok_or_else(|| Error::remote(None, "response contained no text"))
}
