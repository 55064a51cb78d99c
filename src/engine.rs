//! Query orchestration: configuration check, retrieval, context, answer.

use crate::cache::QueryEmbeddingCache;
use crate::config::Config;
use crate::context::build_context;
use crate::embeddings::{OpenAIEmbedder, QueryEmbedder};
use crate::error::Result;
use crate::generation::{AnswerGenerator, OpenAIChat, NOT_FOUND_ANSWER};
use crate::knowledge::{ChunkSource, ChunkType, EmbeddingStore, KnowledgeChunk};
use crate::openai::OpenAIClient;
use crate::search::{select_scorer, top_k};
use crate::store::ArtifactStore;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Citation for a chunk that was handed to the generator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub source: ChunkSource,
}

impl From<&KnowledgeChunk> for SourceRef {
    fn from(chunk: &KnowledgeChunk) -> Self {
        let title = [&chunk.title, &chunk.company, &chunk.role]
            .into_iter()
            .flatten()
            .find(|t| !t.is_empty())
            .cloned()
            .unwrap_or_else(|| "Source".to_string());

        Self {
            id: chunk.id.clone(),
            title,
            chunk_type: chunk.chunk_type,
            url: chunk.url.clone(),
            source: chunk.source,
        }
    }
}

/// Response body for one question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

impl RagAnswer {
    /// Answer with no citations (unconfigured and not-found outcomes)
    pub fn bare(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            sources: Vec::new(),
        }
    }

    pub fn not_found() -> Self {
        Self::bare(NOT_FOUND_ANSWER)
    }
}

/// Sentence returned when no API credential is configured
pub fn unconfigured_answer(api_key_env: &str) -> String {
    format!(
        "RAG backend is not configured. Please set {} on the server.",
        api_key_env
    )
}

/// Live collaborators; present only when a credential is configured
#[derive(Clone)]
pub struct Providers {
    pub embedder: Arc<dyn QueryEmbedder>,
    pub generator: Arc<dyn AnswerGenerator>,
}

/// Answers questions from the knowledge base.
///
/// Holds no per-request state; share it behind an `Arc` and call
/// [`RagEngine::answer`] concurrently.
pub struct RagEngine {
    store: Arc<ArtifactStore>,
    providers: Option<Providers>,
    max_chunks: usize,
    api_key_env: String,
    model_checked: AtomicBool,
}

impl RagEngine {
    pub fn new(store: Arc<ArtifactStore>, providers: Option<Providers>, max_chunks: usize) -> Self {
        Self {
            store,
            providers,
            max_chunks,
            api_key_env: "OPENAI_API_KEY".to_string(),
            model_checked: AtomicBool::new(false),
        }
    }

    /// Wire the engine from configuration.
    ///
    /// Without an API key the engine is still built and answers every
    /// question with the unconfigured sentence.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = Arc::new(ArtifactStore::new(
            config.knowledge_path(),
            config.embeddings_path(),
        ));

        let providers = match config.api_key() {
            Some(api_key) => {
                let client = OpenAIClient::from_config(&config.openai, api_key)?;
                let cache = (config.openai.query_cache_capacity > 0)
                    .then(|| Arc::new(QueryEmbeddingCache::new(config.openai.query_cache_capacity)));
                let embedder = OpenAIEmbedder::new(
                    client.clone(),
                    config.openai.embedding_model.clone(),
                    cache,
                );
                let generator = OpenAIChat::new(client, &config.openai, config.rag.owner_name.as_deref());
                Some(Providers {
                    embedder: Arc::new(embedder),
                    generator: Arc::new(generator),
                })
            }
            None => {
                log::warn!(
                    "{} is not set; answering with the unconfigured notice",
                    config.openai.api_key_env
                );
                None
            }
        };

        Ok(Self::new(store, providers, config.rag.max_chunks)
            .with_api_key_env(&config.openai.api_key_env))
    }

    /// Name of the credential variable quoted in the unconfigured sentence
    pub fn with_api_key_env(mut self, name: &str) -> Self {
        self.api_key_env = name.to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.providers.is_some()
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    /// Warn once per engine when the store and the query embedder disagree
    /// on the model. Returns whether this call logged the warning.
    fn check_embedding_model(&self, store: &EmbeddingStore, query_model: &str) -> bool {
        if store.model == query_model || self.model_checked.swap(true, Ordering::Relaxed) {
            return false;
        }
        log::warn!(
            "Embedding store was built with {} but queries are embedded with {}",
            store.model,
            query_model
        );
        true
    }

    /// Answer `question` from the knowledge base.
    ///
    /// Soft outcomes (unconfigured backend, empty knowledge base, nothing
    /// ranked) come back as `Ok` with no sources. Loader and provider
    /// failures are returned as errors for the caller to log and mask.
    pub async fn answer(&self, question: &str) -> Result<RagAnswer> {
        let providers = match &self.providers {
            Some(p) => p,
            None => return Ok(RagAnswer::bare(unconfigured_answer(&self.api_key_env))),
        };

        let knowledge = self.store.knowledge().await?;
        if knowledge.is_empty() {
            log::info!("Knowledge base has no chunks");
            return Ok(RagAnswer::not_found());
        }

        let embeddings = self.store.embeddings().await?;
        if let Some(store) = &embeddings {
            self.check_embedding_model(store, providers.embedder.model());
        }
        let scorer = select_scorer(embeddings, Arc::clone(&providers.embedder));

        let scored = scorer.score(question, &knowledge).await?;
        let candidates = scored.len();
        let top = top_k(scored, self.max_chunks);
        log::info!(
            "Retrieval ({}): {} of {} candidates selected",
            scorer.mode(),
            top.len(),
            candidates
        );

        if top.is_empty() {
            return Ok(RagAnswer::not_found());
        }

        let chunks: Vec<&KnowledgeChunk> = top.iter().map(|s| s.chunk).collect();
        let context = build_context(&chunks);
        let answer = providers.generator.generate(question, &context).await?;

        Ok(RagAnswer {
            answer,
            sources: chunks.into_iter().map(SourceRef::from).collect(),
        })
    }
}
