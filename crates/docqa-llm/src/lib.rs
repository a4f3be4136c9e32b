//! Text-generation clients used to turn retrieved context into an answer.
mod any;
pub mod error;
pub mod gemini;
pub mod http;
pub mod mock;
pub mod openai;
pub mod provider;

pub use any::AnyGenerator;
pub use error::LlmError;
pub use gemini::GeminiGenerator;
pub use mock::MockGenerator;
pub use openai::OpenAiGenerator;
pub use provider::{GenerationParams, Prompt, TextGenerator};

pub(crate) fn map_send_error(e: reqwest::Error, timeout_secs: u64) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout(timeout_secs)
    } else {
        LlmError::Http(e)
    }
}
