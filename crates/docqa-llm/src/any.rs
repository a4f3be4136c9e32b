use tracing::info;

use docqa_core::config::{LlmProvider, LlmSettings};

use crate::error::Result;
use crate::gemini::GeminiGenerator;
use crate::mock::MockGenerator;
use crate::openai::OpenAiGenerator;
use crate::provider::{GenerationParams, Prompt, TextGenerator};

/// Generates a match over all `AnyGenerator` variants, binding the inner
/// generator and evaluating the given expression for each arm.
macro_rules! delegate_generator {
    ($self:expr, |$g:ident| $expr:expr) => {
        match $self {
            AnyGenerator::OpenAi($g) => $expr,
            AnyGenerator::Gemini($g) => $expr,
            AnyGenerator::Mock($g) => $expr,
        }
    };
}

#[derive(Debug, Clone)]
pub enum AnyGenerator {
    OpenAi(OpenAiGenerator),
    Gemini(GeminiGenerator),
    Mock(MockGenerator),
}

impl AnyGenerator {
    /// Builds the configured generator. A missing API key is not an error
    /// here; it surfaces when `generate` is called.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let params = GenerationParams {
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            timeout_secs: settings.timeout_secs,
        };
        let key_var = settings.api_key_var();
        let api_key = std::env::var(key_var).ok().filter(|k| !k.trim().is_empty());
        info!(provider = ?settings.provider, model = %settings.model, "configuring text generator");
        Ok(match settings.provider {
            LlmProvider::OpenAi => {
                let generator = OpenAiGenerator::new(settings.base_url.clone(), api_key, settings.model.clone(), params)?;
                // Local OpenAI-compatible servers usually run without a key.
                if settings.base_url.is_none() {
                    Self::OpenAi(generator.requiring_key(key_var))
                } else {
                    Self::OpenAi(generator)
                }
            }
            LlmProvider::Gemini => Self::Gemini(GeminiGenerator::new(
                settings.base_url.clone(),
                api_key,
                key_var,
                settings.model.clone(),
                params,
            )?),
            LlmProvider::Mock => Self::Mock(MockGenerator::default()),
        })
    }
}

impl TextGenerator for AnyGenerator {
    fn name(&self) -> &str {
        delegate_generator!(self, |g| g.name())
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        delegate_generator!(self, |g| g.generate(prompt).await)
    }
}

impl From<MockGenerator> for AnyGenerator {
    fn from(g: MockGenerator) -> Self {
        Self::Mock(g)
    }
}
