use action_flow::{OracleError, PlanningOracle, RepairOracle, RepairRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::OracleConfig;
use crate::llm::prompt::PromptBuilder;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_keys: Vec<String>,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Settings from the `oracle` config section; `None` without an API key
    pub fn from_oracle_config(config: &OracleConfig) -> Option<Self> {
        let api_keys = config.api_keys();
        if api_keys.is_empty() {
            return None;
        }
        Some(Self {
            api_keys,
            model: config.model.clone(),
            api_base: config.api_base.clone(),
            temperature: config.temperature,
            timeout: config.timeout(),
        })
    }
}

/// Planning and repair oracle over an OpenAI-compatible chat completions API
pub struct OpenAiOracle {
    client: Client,
    prompt: PromptBuilder,
    config: OpenAiConfig,
}

impl OpenAiOracle {
    pub fn new(config: OpenAiConfig) -> Result<Self, OracleError> {
        if config.api_keys.is_empty() {
            return Err(OracleError::Unavailable(
                "missing OpenAI API key for planner".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| OracleError::Request(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            prompt: PromptBuilder::new(),
            config,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn invoke(&self, user_prompt: String) -> Result<String, OracleError> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );

        let mut last_error: Option<OracleError> = None;
        for (index, key) in self.config.api_keys.iter().enumerate() {
            let body = ChatCompletionRequest {
                model: self.config.model.clone(),
                temperature: self.config.temperature,
                messages: vec![
                    ChatMessage {
                        role: "system".to_string(),
                        content: self.prompt.system_prompt().to_string(),
                    },
                    ChatMessage {
                        role: "user".to_string(),
                        content: user_prompt.clone(),
                    },
                ],
            };

            let response = self
                .client
                .post(&url)
                .bearer_auth(key)
                .json(&body)
                .send()
                .await;

            let response = match response {
                Ok(resp) => resp,
                Err(err) if err.is_timeout() => {
                    return Err(OracleError::Timeout(self.config.timeout.as_millis() as u64));
                }
                Err(err) => {
                    last_error = Some(OracleError::Request(format!("openai request failed: {err}")));
                    continue;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<response unavailable>".to_string());
                if status.as_u16() == 429 && index + 1 < self.config.api_keys.len() {
                    let friendly = openai_rate_limit_message(&text);
                    warn!(
                        target: "openai",
                        message = %friendly,
                        attempt = index + 1,
                        remaining = self.config.api_keys.len() - index - 1,
                        "OpenAI rate limited request; switching API key"
                    );
                    last_error = Some(OracleError::Request(friendly));
                    continue;
                }
                return Err(OracleError::Request(format!(
                    "openai returned {}: {}",
                    status, text
                )));
            }

            let response: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|err| OracleError::Malformed(format!("openai response invalid: {err}")))?;

            if let Some(usage) = &response.usage {
                debug!(
                    target: "openai",
                    input_tokens = usage.prompt_tokens,
                    output_tokens = usage.completion_tokens,
                    "chat completion usage"
                );
            }

            let content = response
                .choices
                .first()
                .and_then(|choice| choice.message.content.as_ref())
                .and_then(ChatCompletionContent::as_text)
                .unwrap_or_default();
            if content.trim().is_empty() {
                return Err(OracleError::EmptyResponse);
            }
            return Ok(content);
        }

        Err(last_error.unwrap_or_else(|| {
            OracleError::Request("OpenAI request exhausted all API keys".to_string())
        }))
    }
}

#[async_trait]
impl PlanningOracle for OpenAiOracle {
    async fn generate_plan(&self, task: &str, context: &str) -> Result<String, OracleError> {
        self.invoke(self.prompt.build_plan_prompt(task, context))
            .await
    }
}

#[async_trait]
impl RepairOracle for OpenAiOracle {
    async fn repair(&self, request: &RepairRequest) -> Result<String, OracleError> {
        self.invoke(self.prompt.build_repair_prompt(request)).await
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<ChatCompletionContent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatCompletionContent {
    Text(String),
    Parts(Vec<ChatCompletionPart>),
}

impl ChatCompletionContent {
    fn as_text(&self) -> Option<String> {
        match self {
            ChatCompletionContent::Text(value) => Some(value.clone()),
            ChatCompletionContent::Parts(parts) => {
                let text = parts
                    .iter()
                    .filter_map(|part| part.text.as_ref())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n");
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorEnvelope {
    error: OpenAiErrorMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorMessage {
    message: Option<String>,
}

fn openai_rate_limit_message(raw: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<OpenAiErrorEnvelope>(raw) {
        if let Some(message) = envelope.error.message {
            return format!(
                "OpenAI rate limit exceeded: {}. Please retry later or configure a higher tier.",
                message.trim()
            );
        }
    }
    "OpenAI rate limit exceeded; please retry later or reduce usage.".to_string()
}
