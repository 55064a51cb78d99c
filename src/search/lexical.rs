use crate::error::Result;
use crate::knowledge::KnowledgeBase;
use crate::search::{ChunkScorer, RetrievalMode, ScoredChunk};
use async_trait::async_trait;
use std::collections::HashSet;

/// Common words that carry no retrieval signal
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "for", "to", "of", "in", "on", "with", "by", "is", "are",
    "was", "were", "be", "as", "at", "from", "that", "this", "it", "your", "you", "me", "my",
    "their", "they",
];

/// Characters that survive normalization besides ASCII letters, digits and space
fn is_token_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '₹' | '$' | '+' | '-' | ' ')
}

/// Lowercase, blank out everything outside the token alphabet, split on
/// whitespace, and drop short tokens and stopwords.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .map(|c| if is_token_char(c) { c } else { ' ' })
        .collect();

    normalized
        .split_whitespace()
        .filter(|t| t.chars().count() > 2 && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Hits of the query's unique tokens in `text`, divided by the number of
/// unique query tokens.
///
/// Repeated hits all count, so the ratio can exceed 1.0 and a chunk that
/// keeps repeating a query term outranks one that mentions each term once.
/// Returns 0.0 when the query has no tokens left after filtering.
pub fn term_overlap_score(query: &str, text: &str) -> f32 {
    let query_tokens: HashSet<String> = tokenize(query).into_iter().collect();
    if query_tokens.is_empty() {
        return 0.0;
    }

    let hits = tokenize(text)
        .iter()
        .filter(|t| query_tokens.contains(t.as_str()))
        .count();

    hits as f32 / query_tokens.len() as f32
}

/// Term-overlap scoring over every chunk; no network calls.
pub struct LexicalScorer;

#[async_trait]
impl ChunkScorer for LexicalScorer {
    fn mode(&self) -> RetrievalMode {
        RetrievalMode::Lexical
    }

    async fn score<'a>(
        &self,
        question: &str,
        knowledge: &'a KnowledgeBase,
    ) -> Result<Vec<ScoredChunk<'a>>> {
        Ok(knowledge
            .chunks
            .iter()
            .map(|chunk| ScoredChunk {
                chunk,
                score: term_overlap_score(question, &chunk.text),
            })
            .collect())
    }
}
