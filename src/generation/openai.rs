use crate::config::OpenAIConfig;
use crate::error::Result;
use crate::generation::{finalize_answer, system_prompt, user_message, AnswerGenerator};
use crate::openai::OpenAIClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Grounded answers from the chat completions endpoint
pub struct OpenAIChat {
    client: OpenAIClient,
    model: String,
    temperature: f32,
    max_tokens: u32,
    system: String,
}

impl OpenAIChat {
    pub fn new(client: OpenAIClient, config: &OpenAIConfig, owner_name: Option<&str>) -> Self {
        Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            system: system_prompt(owner_name),
        }
    }
}

#[async_trait]
impl AnswerGenerator for OpenAIChat {
    async fn generate(&self, question: &str, context: &str) -> Result<String> {
        let user = user_message(question, context);
        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage { role: "system", content: &self.system },
                ChatMessage { role: "user", content: &user },
            ],
        };

        let start = std::time::Instant::now();
        let response: ChatResponse = self.client.post_json("chat/completions", &request).await?;
        log::debug!("Chat completion took {:?}", start.elapsed());

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.as_ref())
            .and_then(|message| message.content.as_deref());

        Ok(finalize_answer(content))
    }
}
