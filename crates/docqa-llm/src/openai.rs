//! OpenAI-compatible `/chat/completions` client. Also talks to local servers
//! exposing the same API (llama.cpp, vLLM, LM Studio).

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{truncate_body, LlmError, Result};
use crate::http::default_client;
use crate::provider::{GenerationParams, Prompt, TextGenerator};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const PROVIDER: &str = "openai";

#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    /// Name of the variable the key should have come from, for error messages.
    api_key_var: Option<String>,
    model: String,
    params: GenerationParams,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiGenerator {
    pub fn new(base_url: Option<String>, api_key: Option<String>, model: String, params: GenerationParams) -> Result<Self> {
        Ok(Self {
            client: default_client(params.timeout_secs)?,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()).trim_end_matches('/').to_string(),
            api_key,
            api_key_var: None,
            model,
            params,
        })
    }

    /// Require a key: generation fails with [`LlmError::MissingApiKey`] naming `var` when none was found.
    #[must_use]
    pub fn requiring_key(mut self, var: impl Into<String>) -> Self {
        self.api_key_var = Some(var.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TextGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        if self.api_key.is_none() {
            if let Some(var) = &self.api_key_var {
                return Err(LlmError::MissingApiKey { var: var.clone() });
            }
        }
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: &prompt.system },
                ChatMessage { role: "user", content: &prompt.user },
            ],
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
            stream: false,
        };
        let mut request = self.client.post(format!("{}/chat/completions", self.base_url)).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        debug!(model = %self.model, "sending chat completion");
        let response = request.send().await.map_err(|e| crate::map_send_error(e, self.params.timeout_secs))?;

        let status = response.status();
        let text = response.text().await?;
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited { provider: PROVIDER });
        }
        if !status.is_success() {
            error!("OpenAI-compatible API error {status}: {text}");
            return Err(LlmError::Status { provider: PROVIDER, status: status.as_u16(), body: truncate_body(&text) });
        }

        let resp: ChatResponse = serde_json::from_str(&text)?;
        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(LlmError::EmptyResponse { provider: PROVIDER })
    }
}
