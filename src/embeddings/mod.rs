pub mod openai;

use crate::error::Result;
use async_trait::async_trait;

pub use openai::OpenAIEmbedder;

/// Turns a question into a vector comparable with the precomputed store
#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    /// Model the query vectors come from
    fn model(&self) -> &str;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}
