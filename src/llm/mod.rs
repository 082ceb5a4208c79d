//! External language-model collaborators.
//!
//! The core only ever talks to these traits; `GeminiClient` is the production
//! implementation of both.

pub mod gemini;

use anyhow::Result;
use async_trait::async_trait;

use crate::network::Action;

pub use gemini::GeminiClient;

/// Carry-over from a failed scenario attempt, fed back into the next parse so
/// the interpreter can self-correct.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptFeedback {
    pub error: String,
    pub actions: Vec<Action>,
}

/// Free-text query service used by region analysts and the synthesis step.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn query(&self, system_instruction: &str, prompt: &str) -> Result<String>;
}

/// Converts a natural-language instruction (plus optional prior-error
/// feedback) into a structured action list.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionInterpreter: Send + Sync {
    async fn interpret(
        &self,
        instruction: &str,
        feedback: Option<AttemptFeedback>,
    ) -> Result<Vec<Action>>;
}
