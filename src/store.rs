//! Process-lifetime cache of the knowledge and embedding artifacts.
//!
//! Each artifact is read at most once. Concurrent first callers wait on the
//! same initialization instead of racing separate reads; afterwards every
//! caller gets a clone of the same `Arc`. There is no reload path short of
//! restarting the process.

use crate::error::{RagError, Result};
use crate::knowledge::{EmbeddingStore, KnowledgeBase};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

pub struct ArtifactStore {
    knowledge_path: PathBuf,
    embeddings_path: PathBuf,
    knowledge: OnceCell<Arc<KnowledgeBase>>,
    /// Inner None = artifact absent (lexical mode), cached like a hit
    embeddings: OnceCell<Option<Arc<EmbeddingStore>>>,
    reads: AtomicUsize,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(knowledge_path: P, embeddings_path: Q) -> Self {
        Self {
            knowledge_path: knowledge_path.as_ref().to_path_buf(),
            embeddings_path: embeddings_path.as_ref().to_path_buf(),
            knowledge: OnceCell::new(),
            embeddings: OnceCell::new(),
            reads: AtomicUsize::new(0),
        }
    }

    /// Store whose artifacts are already in memory; no file is ever read.
    pub fn preloaded(knowledge: KnowledgeBase, embeddings: Option<EmbeddingStore>) -> Self {
        Self {
            knowledge_path: PathBuf::new(),
            embeddings_path: PathBuf::new(),
            knowledge: OnceCell::new_with(Some(Arc::new(knowledge))),
            embeddings: OnceCell::new_with(Some(embeddings.map(Arc::new))),
            reads: AtomicUsize::new(0),
        }
    }

    /// Load the knowledge base, reading the artifact on first call only.
    ///
    /// Fails with `KnowledgeNotFound` when the artifact is missing and `Parse`
    /// when it is malformed or contains duplicate chunk ids. Failures are not
    /// cached, so a later call retries.
    pub async fn knowledge(&self) -> Result<Arc<KnowledgeBase>> {
        self.knowledge
            .get_or_try_init(|| async {
                if !tokio::fs::try_exists(&self.knowledge_path).await? {
                    return Err(RagError::KnowledgeNotFound(self.knowledge_path.clone()));
                }

                let knowledge: KnowledgeBase = self.read_json(&self.knowledge_path).await?;
                if let Some(id) = knowledge.duplicate_id() {
                    return Err(RagError::Parse(format!(
                        "duplicate chunk id {:?} in {}",
                        id,
                        self.knowledge_path.display()
                    )));
                }

                log::info!(
                    "Knowledge base loaded: version {}, {} chunks (created {})",
                    knowledge.version,
                    knowledge.chunks.len(),
                    knowledge.created_at
                );
                Ok::<_, RagError>(Arc::new(knowledge))
            })
            .await
            .map(Arc::clone)
    }

    /// Load the optional embedding store. `Ok(None)` when the artifact is absent.
    pub async fn embeddings(&self) -> Result<Option<Arc<EmbeddingStore>>> {
        self.embeddings
            .get_or_try_init(|| async {
                if !tokio::fs::try_exists(&self.embeddings_path).await? {
                    log::info!(
                        "No embedding store at {}, retrieval will use term overlap",
                        self.embeddings_path.display()
                    );
                    return Ok(None);
                }

                let store: EmbeddingStore = self.read_json(&self.embeddings_path).await?;
                let mismatched = store.mismatched_dimensions();
                if mismatched > 0 {
                    log::warn!(
                        "{} of {} vectors disagree with declared dimensions {:?}",
                        mismatched,
                        store.vectors.len(),
                        store.dimensions
                    );
                }

                log::info!(
                    "Embedding store loaded: model {}, {} vectors",
                    store.model,
                    store.vectors.len()
                );
                Ok::<_, RagError>(Some(Arc::new(store)))
            })
            .await
            .map(Clone::clone)
    }

    /// Number of artifact reads performed so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn knowledge_path(&self) -> &Path {
        &self.knowledge_path
    }

    pub fn embeddings_path(&self) -> &Path {
        &self.embeddings_path
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let raw = tokio::fs::read_to_string(path).await?;
        serde_json::from_str(&raw)
            .map_err(|e| RagError::Parse(format!("{}: {}", path.display(), e)))
    }
}
