use async_openai::{
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::{ProviderKind, ProviderSettings};
use crate::error::UpstreamError;
use crate::prompt::GenerationRequest;
use crate::retry::{self, Failure, RetryError};

/// Replies with this many characters or fewer (after trimming) are unusable.
pub const MIN_REPLY_CHARS: usize = 10;

/// Anything that can turn a prompt into text. The orchestrator only sees this.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, request: &GenerationRequest) -> Result<String, UpstreamError>;

    /// False when a required credential is missing.
    fn is_configured(&self) -> bool;
}

/// A provider body after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderReply {
    LegacyGeneration(String),
    ChatCompletion(String),
    Malformed,
}

// The three body shapes providers send back.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawReply {
    Chat(ChatBody),
    LegacyList(Vec<LegacyItem>),
    LegacyOne(LegacyItem),
}

#[derive(Deserialize)]
struct ChatBody {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct LegacyItem {
    generated_text: String,
}

impl ProviderReply {
    pub fn decode(body: &[u8]) -> Self {
        match serde_json::from_slice::<RawReply>(body) {
            Ok(RawReply::Chat(chat)) => chat
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .map(ProviderReply::ChatCompletion)
                .unwrap_or(ProviderReply::Malformed),
            Ok(RawReply::LegacyList(items)) => items
                .into_iter()
                .next()
                .map(|item| ProviderReply::LegacyGeneration(item.generated_text))
                .unwrap_or(ProviderReply::Malformed),
            Ok(RawReply::LegacyOne(item)) => ProviderReply::LegacyGeneration(item.generated_text),
            Err(_) => ProviderReply::Malformed,
        }
    }

    /// The trimmed text, if there is enough of it.
    pub fn into_text(self) -> Option<String> {
        let text = match self {
            ProviderReply::LegacyGeneration(text) | ProviderReply::ChatCompletion(text) => text,
            ProviderReply::Malformed => return None,
        };
        let trimmed = text.trim();
        (trimmed.chars().count() > MIN_REPLY_CHARS).then(|| trimmed.to_string())
    }
}

#[derive(Serialize)]
struct LegacyRequest<'a> {
    inputs: &'a str,
    parameters: LegacyParameters,
}

#[derive(Serialize)]
struct LegacyParameters {
    max_new_tokens: u32,
    temperature: f32,
    return_full_text: bool,
}

/// HTTP client for the upstream text-generation provider.
///
/// Holds one `reqwest::Client` for the lifetime of the process; its
/// connection pool is shared by every tool call.
pub struct UpstreamClient {
    http: reqwest::Client,
    settings: ProviderSettings,
}

impl UpstreamClient {
    pub fn new(settings: ProviderSettings) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| UpstreamError::Request(e.to_string()))?;

        info!(
            "Upstream client ready. Provider: {}, model: {}, endpoint: {}",
            settings.kind, settings.model, settings.url
        );
        if settings.api_key.is_none() {
            warn!("No upstream API credential configured; poem tools will refuse to run");
        }
        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Sends the prompt, retrying per the configured policy. Returns the
    /// provider's trimmed text on the first usable reply.
    pub async fn query(&self, request: &GenerationRequest) -> Result<String, UpstreamError> {
        let Some(api_key) = self.settings.api_key.as_deref() else {
            return Err(UpstreamError::MissingCredential);
        };
        let body = self.request_body(&request.prompt)?;
        let body = &body;

        let outcome = retry::execute(&self.settings.retry, request.max_retries, move |attempt| {
            self.attempt(api_key, body, attempt)
        })
        .await;

        match outcome {
            Ok(text) => {
                info!("Upstream provider returned {} characters", text.len());
                Ok(text)
            }
            Err(RetryError::Aborted {
                failure: Failure::Status(401),
                ..
            }) => {
                error!("Upstream provider rejected the API credential");
                Err(UpstreamError::Unauthorized)
            }
            Err(RetryError::Aborted {
                failure: Failure::Malformed,
                ..
            }) => {
                warn!("Upstream provider returned no usable text");
                Err(UpstreamError::Malformed)
            }
            Err(RetryError::Aborted { attempt, failure }) => Err(UpstreamError::Exhausted {
                attempts: attempt,
                last: failure.to_string(),
            }),
            Err(RetryError::Exhausted { attempts, last }) => {
                warn!("Giving up on upstream provider after {attempts} attempts: {last}");
                Err(UpstreamError::Exhausted {
                    attempts,
                    last: last.to_string(),
                })
            }
        }
    }

    async fn attempt(&self, api_key: &str, body: &Value, attempt: u32) -> Result<String, Failure> {
        tracing::debug!(attempt, "POST {}", self.settings.url);
        let response = self
            .http
            .post(&self.settings.url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Failure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Failure::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Failure::Transport(e.to_string()))?;
        ProviderReply::decode(&bytes)
            .into_text()
            .ok_or(Failure::Malformed)
    }

    fn request_body(&self, prompt: &str) -> Result<Value, UpstreamError> {
        let body = match self.settings.kind {
            ProviderKind::ChatCompletion => serde_json::to_value(
                self.chat_request(prompt)
                    .map_err(|e| UpstreamError::Request(e.to_string()))?,
            ),
            ProviderKind::LegacyGeneration => serde_json::to_value(LegacyRequest {
                inputs: prompt,
                parameters: LegacyParameters {
                    max_new_tokens: 200,
                    temperature: 0.8,
                    return_full_text: false,
                },
            }),
        };
        body.map_err(|e| UpstreamError::Request(e.to_string()))
    }

    fn chat_request(&self, prompt: &str) -> Result<CreateChatCompletionRequest, OpenAIError> {
        CreateChatCompletionRequestArgs::default()
            .model(&self.settings.model)
            .messages([ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?,
            )])
            .temperature(0.8_f32)
            .stream(false)
            .build()
    }
}

#[async_trait]
impl TextGenerator for UpstreamClient {
    async fn generate_text(&self, request: &GenerationRequest) -> Result<String, UpstreamError> {
        self.query(request).await
    }

    fn is_configured(&self) -> bool {
        self.settings.api_key.is_some()
    }
}
