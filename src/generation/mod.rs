pub mod openai;

use crate::error::Result;
use async_trait::async_trait;

pub use openai::OpenAIChat;

/// Returned whenever the profile does not contain an answer: by the model
/// (it is instructed to say exactly this), by a generator that got an empty
/// completion, and by the engine when retrieval finds nothing.
pub const NOT_FOUND_ANSWER: &str = "Not found in my profile information.";

/// Produces an answer to `question` grounded in `context` only
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, question: &str, context: &str) -> Result<String>;
}

/// System instruction constraining the model to the supplied context
pub fn system_prompt(owner_name: Option<&str>) -> String {
    let persona = match owner_name {
        Some(name) if !name.trim().is_empty() => {
            format!("You are {}'s portfolio assistant.", name.trim())
        }
        _ => "You are a portfolio assistant.".to_string(),
    };

    let refusal = format!("If the answer is not in the context, reply: \"{}\"", NOT_FOUND_ANSWER);

    [
        persona.as_str(),
        "Answer only using the provided context.",
        refusal.as_str(),
        "Do not guess or fabricate.",
        "Keep responses concise and professional.",
    ]
    .join(" ")
}

/// User turn carrying the question and the assembled context
pub fn user_message(question: &str, context: &str) -> String {
    format!("Question: {}\n\nContext:\n{}", question, context)
}

/// Trimmed completion text, or the not-found sentinel when there is none
pub fn finalize_answer(completion: Option<&str>) -> String {
    completion
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| NOT_FOUND_ANSWER.to_string())
}
