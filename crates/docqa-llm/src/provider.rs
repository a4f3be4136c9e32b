use crate::error::Result;

/// A system instruction plus one user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self { system: system.into(), user: user.into() }
    }
}

/// Sampling parameters shared by the HTTP generators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self { temperature: 0.2, max_tokens: 1024, timeout_secs: 60 }
    }
}

#[allow(async_fn_in_trait)]
pub trait TextGenerator {
    fn name(&self) -> &str;

    /// Single non-streaming completion. No retries.
    async fn generate(&self, prompt: &Prompt) -> Result<String>;
}

impl<T: TextGenerator> TextGenerator for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        (**self).generate(prompt).await
    }
}
