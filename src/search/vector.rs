use crate::embeddings::QueryEmbedder;
use crate::error::Result;
use crate::knowledge::{EmbeddingStore, KnowledgeBase};
use crate::search::{ChunkScorer, RetrievalMode, ScoredChunk};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Cosine similarity over the shared-length prefix of `a` and `b`.
///
/// Vectors of different lengths are truncated to the shorter one rather than
/// rejected, so a store built with another model degrades instead of failing.
/// Returns 0.0 when either prefix has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let (a, b) = (&a[..len], &b[..len]);

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

/// Cosine ranking against precomputed chunk embeddings.
///
/// Costs one query-embedding call per question. Only chunks that have a
/// vector are candidates; vectors whose id matches no chunk are skipped.
pub struct SemanticScorer {
    store: Arc<EmbeddingStore>,
    embedder: Arc<dyn QueryEmbedder>,
}

impl SemanticScorer {
    pub fn new(store: Arc<EmbeddingStore>, embedder: Arc<dyn QueryEmbedder>) -> Self {
        Self { store, embedder }
    }
}

#[async_trait]
impl ChunkScorer for SemanticScorer {
    fn mode(&self) -> RetrievalMode {
        RetrievalMode::Semantic
    }

    async fn score<'a>(
        &self,
        question: &str,
        knowledge: &'a KnowledgeBase,
    ) -> Result<Vec<ScoredChunk<'a>>> {
        let start = std::time::Instant::now();
        let query_vec = self.embedder.embed_query(question).await?;
        log::debug!("Query embedding took {:?}", start.elapsed());

        let by_id: HashMap<&str, _> = knowledge
            .chunks
            .iter()
            .map(|chunk| (chunk.id.as_str(), chunk))
            .collect();

        let mut orphans = 0usize;
        let scored: Vec<ScoredChunk<'a>> = self
            .store
            .vectors
            .iter()
            .filter_map(|vector| match by_id.get(vector.id.as_str()) {
                Some(&chunk) => Some(ScoredChunk {
                    chunk,
                    score: cosine_similarity(&query_vec, &vector.embedding),
                }),
                None => {
                    orphans += 1;
                    None
                }
            })
            .collect();

        if orphans > 0 {
            log::warn!("Skipped {} embedding vectors with no matching chunk", orphans);
        }

        Ok(scored)
    }
}
