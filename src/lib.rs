pub mod cache;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod generation;
pub mod knowledge;
pub mod openai;
pub mod search;
pub mod server;
pub mod store;

pub use config::Config;
pub use engine::{RagAnswer, RagEngine, SourceRef};
pub use error::{RagError, Result};
pub use generation::NOT_FOUND_ANSWER;
pub use knowledge::{EmbeddingStore, KnowledgeBase, KnowledgeChunk};
pub use store::ArtifactStore;
