//! Question answering over the whole corpus.
//!
//! The context handed to the model is every document's title and content,
//! concatenated. There is no retrieval step, so prompt size grows linearly
//! with the corpus; callers with large corpora should expect provider-side
//! context-length failures, which surface as [`UNABLE_TO_ANSWER`].

use tracing::warn;

use crate::ai::AiClient;
use crate::models::Document;

/// Returned in place of an answer when the provider call fails.
pub const UNABLE_TO_ANSWER: &str = "Unable to answer.";

/// Concatenate `"{title}: {content}"` for every document, blank-line separated.
pub fn build_context(corpus: &[Document]) -> String {
    corpus
        .iter()
        .map(|d| format!("{}: {}", d.title, d.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Assemble the full prompt sent to the provider.
pub fn build_prompt(question: &str, corpus: &[Document]) -> String {
    format!(
        "Use the following documents as context:\n{}\n\nQuestion: {}",
        build_context(corpus),
        question
    )
}

/// Answer `question` using `corpus` as context.
///
/// Never fails: a provider error or a blank answer yields [`UNABLE_TO_ANSWER`].
pub async fn answer<A>(ai: &A, question: &str, corpus: &[Document]) -> String
where
    A: AiClient + ?Sized,
{
    let prompt = build_prompt(question, corpus);
    match ai.answer(&prompt).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            warn!(provider = ai.name(), "provider returned a blank answer");
            UNABLE_TO_ANSWER.to_string()
        }
        Err(e) => {
            warn!(
                provider = ai.name(),
                error = %e,
                documents = corpus.len(),
                "question answering failed"
            );
            UNABLE_TO_ANSWER.to_string()
        }
    }
}
