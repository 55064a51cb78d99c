pub mod lexical;
pub mod vector;

use crate::embeddings::QueryEmbedder;
use crate::error::Result;
use crate::knowledge::{EmbeddingStore, KnowledgeBase, KnowledgeChunk};
use async_trait::async_trait;
use std::sync::Arc;

pub use lexical::{term_overlap_score, tokenize, LexicalScorer};
pub use vector::{cosine_similarity, SemanticScorer};

/// A candidate chunk and its relevance for one query
#[derive(Debug, Clone, Copy)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a KnowledgeChunk,
    pub score: f32,
}

/// Which scorer produced a ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMode {
    Semantic,
    Lexical,
}

impl std::fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalMode::Semantic => write!(f, "semantic"),
            RetrievalMode::Lexical => write!(f, "lexical"),
        }
    }
}

/// Scores the candidate chunks of a knowledge base against a question.
///
/// Implementations decide which chunks are candidates and must keep them in
/// a deterministic order, since ties are broken by that order.
#[async_trait]
pub trait ChunkScorer: Send + Sync {
    fn mode(&self) -> RetrievalMode;

    async fn score<'a>(
        &self,
        question: &str,
        knowledge: &'a KnowledgeBase,
    ) -> Result<Vec<ScoredChunk<'a>>>;
}

/// Semantic when the store has at least one vector, lexical otherwise
pub fn retrieval_mode(embeddings: Option<&EmbeddingStore>) -> RetrievalMode {
    match embeddings {
        Some(store) if store.has_vectors() => RetrievalMode::Semantic,
        _ => RetrievalMode::Lexical,
    }
}

/// Build the scorer for the mode [`retrieval_mode`] picks
pub fn select_scorer(
    embeddings: Option<Arc<EmbeddingStore>>,
    embedder: Arc<dyn QueryEmbedder>,
) -> Box<dyn ChunkScorer> {
    match (retrieval_mode(embeddings.as_deref()), embeddings) {
        (RetrievalMode::Semantic, Some(store)) => Box::new(SemanticScorer::new(store, embedder)),
        _ => Box::new(LexicalScorer),
    }
}

/// Sort by score descending, keeping original order among equal scores, and
/// keep at most `k`. Zero scores are not filtered out.
pub fn top_k(mut scored: Vec<ScoredChunk<'_>>, k: usize) -> Vec<ScoredChunk<'_>> {
    // sort_by is stable; total_cmp keeps the order total when a score is NaN
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{ChunkType, EmbeddingVector};

    struct NoopEmbedder;

    #[async_trait]
    impl QueryEmbedder for NoopEmbedder {
        fn model(&self) -> &str {
            "noop"
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![])
        }
    }

    fn chunks(n: usize) -> Vec<KnowledgeChunk> {
        (0..n)
            .map(|i| KnowledgeChunk::new(format!("c{}", i), "text", ChunkType::Skill))
            .collect()
    }

    #[test]
    fn test_top_k_sorts_descending_and_truncates() {
        let chunks = chunks(4);
        let scored = vec![
            ScoredChunk { chunk: &chunks[0], score: 0.1 },
            ScoredChunk { chunk: &chunks[1], score: 0.9 },
            ScoredChunk { chunk: &chunks[2], score: 0.5 },
            ScoredChunk { chunk: &chunks[3], score: 0.7 },
        ];
        let top = top_k(scored, 3);
        let ids: Vec<&str> = top.iter().map(|s| s.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3", "c2"]);
    }

    #[test]
    fn test_top_k_ties_keep_original_order() {
        let chunks = chunks(4);
        let scored = vec![
            ScoredChunk { chunk: &chunks[0], score: 0.5 },
            ScoredChunk { chunk: &chunks[1], score: 1.0 },
            ScoredChunk { chunk: &chunks[2], score: 0.5 },
            ScoredChunk { chunk: &chunks[3], score: 0.5 },
        ];
        let top = top_k(scored, 10);
        let ids: Vec<&str> = top.iter().map(|s| s.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c0", "c2", "c3"]);
    }

    #[test]
    fn test_top_k_never_exceeds_k_or_candidates() {
        let chunks = chunks(3);
        for k in 0..6 {
            let scored: Vec<ScoredChunk<'_>> = chunks
                .iter()
                .map(|chunk| ScoredChunk { chunk, score: 0.0 })
                .collect();
            assert_eq!(top_k(scored, k).len(), k.min(3));
        }
        assert!(top_k(Vec::new(), 5).is_empty());
    }

    #[test]
    fn test_top_k_keeps_zero_scores() {
        let chunks = chunks(2);
        let scored = vec![
            ScoredChunk { chunk: &chunks[0], score: 0.0 },
            ScoredChunk { chunk: &chunks[1], score: 0.0 },
        ];
        assert_eq!(top_k(scored, 5).len(), 2);
    }

    #[test]
    fn test_top_k_tolerates_nan_scores() {
        let chunks = chunks(4);
        let scored = vec![
            ScoredChunk { chunk: &chunks[0], score: 0.2 },
            ScoredChunk { chunk: &chunks[1], score: f32::NAN },
            ScoredChunk { chunk: &chunks[2], score: 0.8 },
            ScoredChunk { chunk: &chunks[3], score: 0.5 },
        ];
        let top = top_k(scored, 4);
        let finite: Vec<&str> = top
            .iter()
            .filter(|s| !s.score.is_nan())
            .map(|s| s.chunk.id.as_str())
            .collect();
        assert_eq!(top.len(), 4);
        assert_eq!(finite, vec!["c2", "c3", "c0"]);
    }

    #[test]
    fn test_retrieval_mode_predicate() {
        let empty = EmbeddingStore {
            model: "noop".to_string(),
            dimensions: None,
            vectors: vec![],
        };
        assert_eq!(retrieval_mode(None), RetrievalMode::Lexical);
        assert_eq!(retrieval_mode(Some(&empty)), RetrievalMode::Lexical);
    }

    #[test]
    fn test_select_scorer_by_store_contents() {
        let embedder: Arc<dyn QueryEmbedder> = Arc::new(NoopEmbedder);

        assert_eq!(select_scorer(None, embedder.clone()).mode(), RetrievalMode::Lexical);

        let empty = Arc::new(EmbeddingStore {
            model: "noop".to_string(),
            dimensions: None,
            vectors: vec![],
        });
        assert_eq!(select_scorer(Some(empty), embedder.clone()).mode(), RetrievalMode::Lexical);

        let populated = Arc::new(EmbeddingStore {
            model: "noop".to_string(),
            dimensions: Some(1),
            vectors: vec![EmbeddingVector { id: "c0".into(), embedding: vec![1.0] }],
        });
        assert_eq!(select_scorer(Some(populated), embedder).mode(), RetrievalMode::Semantic);
    }
}
