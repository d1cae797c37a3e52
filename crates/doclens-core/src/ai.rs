//! AI client abstraction.
//!
//! The [`AiClient`] trait is the seam between the core orchestration and a
//! text-generation provider. Every method is independently fallible;
//! callers in this crate treat an [`AiError`] as "no result" and fall back.
//!
//! Concrete clients (Gemini, disabled, timeout guard) live in the `doclens`
//! app crate.

use async_trait::async_trait;

use crate::error::AiError;

/// A text-generation provider.
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Short identifier used in log lines (e.g. `"gemini"`).
    fn name(&self) -> &str;

    /// Summarize `text` in a few sentences.
    async fn summarize(&self, text: &str) -> Result<String, AiError>;

    /// Extract keyword tags from `text`.
    async fn extract_tags(&self, text: &str) -> Result<Vec<String>, AiError>;

    /// Produce an embedding vector for `text`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError>;

    /// Answer a fully assembled prompt.
    async fn answer(&self, prompt: &str) -> Result<String, AiError>;
}

#[cfg(any(test, feature = "test-util"))]
pub mod fake {
    //! Scripted [`AiClient`] for unit tests.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::AiClient;
    use crate::error::AiError;

    /// Each field is the canned response; `None` makes the call fail.
    #[derive(Default)]
    pub struct ScriptedAi {
        pub summary: Option<String>,
        pub tags: Option<Vec<String>>,
        pub embedding: Option<Vec<f32>>,
        pub answer: Option<String>,
        pub calls: AtomicUsize,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedAi {
        pub fn failing() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn respond<T: Clone>(&self, value: &Option<T>) -> Result<T, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            value
                .clone()
                .ok_or_else(|| AiError::Transport("scripted failure".into()))
        }
    }

    #[async_trait]
    impl AiClient for ScriptedAi {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn summarize(&self, _text: &str) -> Result<String, AiError> {
            self.respond(&self.summary)
        }

        async fn extract_tags(&self, _text: &str) -> Result<Vec<String>, AiError> {
            self.respond(&self.tags)
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, AiError> {
            self.respond(&self.embedding)
        }

        async fn answer(&self, prompt: &str) -> Result<String, AiError> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            self.respond(&self.answer)
        }
    }
}
