//! Knowledge and embedding artifacts as written by the offline build.
//!
//! Both documents are read-only once loaded. Field names follow the JSON the
//! builder emits (camelCase keys, kebab-case enum values).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Where a chunk was extracted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkSource {
    Website,
    Resume,
}

impl ChunkSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkSource::Website => "website",
            ChunkSource::Resume => "resume",
        }
    }
}

/// Kind of content a chunk carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkType {
    Hero,
    About,
    Metric,
    Skill,
    Work,
    CaseStudy,
    Project,
    Thread,
    Contact,
    Resume,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Hero => "hero",
            ChunkType::About => "about",
            ChunkType::Metric => "metric",
            ChunkType::Skill => "skill",
            ChunkType::Work => "work",
            ChunkType::CaseStudy => "case-study",
            ChunkType::Project => "project",
            ChunkType::Thread => "thread",
            ChunkType::Contact => "contact",
            ChunkType::Resume => "resume",
        }
    }
}

/// Unit of retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeChunk {
    pub id: String,
    pub text: String,
    pub source: ChunkSource,
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl KnowledgeChunk {
    /// Minimal website chunk; metadata is filled in with struct update syntax
    pub fn new(id: impl Into<String>, text: impl Into<String>, chunk_type: ChunkType) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source: ChunkSource::Website,
            chunk_type,
            title: None,
            company: None,
            role: None,
            dates: None,
            tags: None,
            url: None,
        }
    }
}

/// Versioned set of chunks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBase {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub chunks: Vec<KnowledgeChunk>,
}

impl KnowledgeBase {
    pub fn get(&self, id: &str) -> Option<&KnowledgeChunk> {
        self.chunks.iter().find(|c| c.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// First duplicated chunk id, if any
    pub fn duplicate_id(&self) -> Option<&str> {
        let mut seen = HashSet::with_capacity(self.chunks.len());
        self.chunks
            .iter()
            .find(|c| !seen.insert(c.id.as_str()))
            .map(|c| c.id.as_str())
    }
}

/// Precomputed embedding for one chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingVector {
    pub id: String,
    pub embedding: Vec<f32>,
}

/// Precomputed vector index keyed by chunk id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingStore {
    pub model: String,
    #[serde(default)]
    pub dimensions: Option<usize>,
    #[serde(default)]
    pub vectors: Vec<EmbeddingVector>,
}

impl EmbeddingStore {
    /// Semantic retrieval is used only when this holds
    pub fn has_vectors(&self) -> bool {
        !self.vectors.is_empty()
    }

    /// Vectors whose id does not resolve to a chunk in `knowledge`
    pub fn orphan_count(&self, knowledge: &KnowledgeBase) -> usize {
        let ids: HashSet<&str> = knowledge.chunks.iter().map(|c| c.id.as_str()).collect();
        self.vectors
            .iter()
            .filter(|v| !ids.contains(v.id.as_str()))
            .count()
    }

    /// Vectors whose length disagrees with the declared dimensions
    pub fn mismatched_dimensions(&self) -> usize {
        match self.dimensions {
            Some(dims) => self.vectors.iter().filter(|v| v.embedding.len() != dims).count(),
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "version": 1,
        "createdAt": "2025-01-12T09:30:00.000Z",
        "chunks": [
            {
                "id": "work:acme:0",
                "text": "Led the lending platform launch.",
                "source": "website",
                "type": "case-study",
                "title": "Lending Platform",
                "company": "Acme",
                "tags": ["fintech", "launch"]
            },
            {
                "id": "resume:0",
                "text": "Resume summary.",
                "source": "resume",
                "type": "resume"
            }
        ]
    }"#;

    #[test]
    fn test_parse_builder_output() {
        let kb: KnowledgeBase = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(kb.version, 1);
        assert_eq!(kb.chunks.len(), 2);

        let first = &kb.chunks[0];
        assert_eq!(first.chunk_type, ChunkType::CaseStudy);
        assert_eq!(first.source, ChunkSource::Website);
        assert_eq!(first.company.as_deref(), Some("Acme"));
        assert_eq!(first.tags.as_ref().map(|t| t.len()), Some(2));

        let second = &kb.chunks[1];
        assert_eq!(second.source, ChunkSource::Resume);
        assert!(second.title.is_none());
        assert!(kb.duplicate_id().is_none());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let json = r#"{"version":1,"createdAt":"2025-01-12T09:30:00Z","chunks":[
            {"id":"x","text":"t","source":"website","type":"podcast"}]}"#;
        assert!(serde_json::from_str::<KnowledgeBase>(json).is_err());
    }

    #[test]
    fn test_duplicate_id_detected() {
        let kb = KnowledgeBase {
            version: 1,
            created_at: Utc::now(),
            chunks: vec![
                KnowledgeChunk::new("a", "one", ChunkType::About),
                KnowledgeChunk::new("b", "two", ChunkType::About),
                KnowledgeChunk::new("a", "three", ChunkType::About),
            ],
        };
        assert_eq!(kb.duplicate_id(), Some("a"));
        assert_eq!(kb.get("b").map(|c| c.text.as_str()), Some("two"));
    }

    #[test]
    fn test_chunk_type_str_matches_serde() {
        for ty in [ChunkType::CaseStudy, ChunkType::Hero, ChunkType::Resume] {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
        }
    }

    #[test]
    fn test_embedding_store_null_dimensions() {
        let json = r#"{"model":"text-embedding-3-small","dimensions":null,"vectors":[
            {"id":"a","embedding":[0.1,0.2]},
            {"id":"ghost","embedding":[0.3,0.4,0.5]}]}"#;
        let store: EmbeddingStore = serde_json::from_str(json).unwrap();
        assert!(store.dimensions.is_none());
        assert!(store.has_vectors());
        assert_eq!(store.mismatched_dimensions(), 0);

        let kb = KnowledgeBase {
            version: 1,
            created_at: Utc::now(),
            chunks: vec![KnowledgeChunk::new("a", "text", ChunkType::Skill)],
        };
        assert_eq!(store.orphan_count(&kb), 1);
    }

    #[test]
    fn test_mismatched_dimensions() {
        let store = EmbeddingStore {
            model: "m".to_string(),
            dimensions: Some(3),
            vectors: vec![
                EmbeddingVector { id: "a".into(), embedding: vec![0.0; 3] },
                EmbeddingVector { id: "b".into(), embedding: vec![0.0; 2] },
            ],
        };
        assert_eq!(store.mismatched_dimensions(), 1);
    }
}
