//! Google Gemini `generateContent` REST client.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{truncate_body, LlmError, Result};
use crate::http::default_client;
use crate::provider::{GenerationParams, Prompt, TextGenerator};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const PROVIDER: &str = "gemini";

#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    api_key_var: String,
    model: String,
    params: GenerationParams,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GeminiGenerator {
    pub fn new(
        base_url: Option<String>,
        api_key: Option<String>,
        api_key_var: impl Into<String>,
        model: String,
        params: GenerationParams,
    ) -> Result<Self> {
        Ok(Self {
            client: default_client(params.timeout_secs)?,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()).trim_end_matches('/').to_string(),
            api_key,
            api_key_var: api_key_var.into(),
            model,
            params,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TextGenerator for GeminiGenerator {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::MissingApiKey { var: self.api_key_var.clone() })?;
        let body = GenerateRequest {
            system_instruction: Content { role: None, parts: [Part { text: &prompt.system }] },
            contents: [Content { role: Some("user"), parts: [Part { text: &prompt.user }] }],
            generation_config: GenerationConfig {
                temperature: self.params.temperature,
                max_output_tokens: self.params.max_tokens,
            },
        };
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        debug!(model = %self.model, "sending generateContent");
        let response = self
            .client
            .post(url)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| crate::map_send_error(e, self.params.timeout_secs))?;

        let status = response.status();
        let text = response.text().await?;
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited { provider: PROVIDER });
        }
        if !status.is_success() {
            error!("Gemini API error {status}: {}", truncate_body(&text));
            return Err(LlmError::Status { provider: PROVIDER, status: status.as_u16(), body: truncate_body(&text) });
        }

        let resp: GenerateResponse = serde_json::from_str(&text)?;
        if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(LlmError::Other(format!("Gemini blocked the prompt: {reason}")));
        }
        let answer: String = resp
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(LlmError::EmptyResponse { provider: PROVIDER });
        }
        Ok(answer.to_string())
    }
}
