use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use docqa_core::types::RetrievedPassage;
use docqa_llm::{Prompt, TextGenerator};

use crate::persona::{Persona, NOT_FOUND_ANSWER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Generated,
    /// Retrieval returned nothing, so no request was sent.
    NoContext,
    /// `text` holds the failure description.
    GenerationFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub text: String,
    pub status: AnswerStatus,
    /// Sorted unique document names of the passages given as context.
    pub citations: Vec<String>,
}

/// `[Source: <label>]\n<text>` entries separated by a blank line.
pub fn format_context(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .map(|p| format!("[Source: {}]\n{}", p.source_label, p.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_prompt(question: &str, passages: &[RetrievedPassage], persona: Persona) -> Prompt {
    let user = format!(
        "Question: {question}\n\nContext:\n{}\n\nProvide the answer with citations.",
        format_context(passages)
    );
    Prompt::new(persona.system_instruction(), user)
}

pub fn citations(passages: &[RetrievedPassage]) -> Vec<String> {
    passages
        .iter()
        .map(RetrievedPassage::doc_name)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Turns ranked passages into a cited answer through a text generator.
#[derive(Debug, Clone)]
pub struct AnswerComposer<G> {
    generator: G,
}

impl<G: TextGenerator> AnswerComposer<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Never fails: generation errors are reported in the returned [`Answer`].
    pub async fn compose(&self, question: &str, passages: &[RetrievedPassage], persona: Persona) -> Answer {
        if passages.is_empty() {
            debug!("no passages retrieved; skipping generation");
            return Answer { text: NOT_FOUND_ANSWER.to_string(), status: AnswerStatus::NoContext, citations: Vec::new() };
        }
        let prompt = build_prompt(question, passages, persona);
        let citations = citations(passages);
        debug!(generator = self.generator.name(), passages = passages.len(), %persona, "generating answer");
        match self.generator.generate(&prompt).await {
            Ok(text) => Answer { text, status: AnswerStatus::Generated, citations },
            Err(e) => {
                warn!(generator = self.generator.name(), error = %e, "answer generation failed");
                Answer {
                    text: format!("Answer generation failed ({}): {e}", self.generator.name()),
                    status: AnswerStatus::GenerationFailed,
                    citations,
                }
            }
        }
    }
}
