//! In-process generator for tests and offline runs.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{LlmError, Result};
use crate::provider::{Prompt, TextGenerator};

#[derive(Debug, Clone)]
pub struct MockGenerator {
    responses: Arc<Mutex<Vec<String>>>,
    prompts: Arc<Mutex<Vec<Prompt>>>,
    pub default_response: String,
    pub fail: bool,
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock response".into(),
            fail: false,
        }
    }
}

impl MockGenerator {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self { responses: Arc::new(Mutex::new(responses)), ..Self::default() }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    /// Every prompt received so far, oldest first.
    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl TextGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).push(prompt.clone());
        if self.fail {
            return Err(LlmError::Other("mock LLM error".into()));
        }
        let mut responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }
}
