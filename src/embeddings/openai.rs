use crate::cache::QueryEmbeddingCache;
use crate::embeddings::QueryEmbedder;
use crate::error::Result;
use crate::openai::OpenAIClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request structure for OpenAI embeddings API
#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Response structure from OpenAI embeddings API
#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

/// Individual embedding data in API response
#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    embedding: Vec<f32>,
}

/// OpenAI query embedder
///
/// One request per question, no retries. Optionally backed by an LRU cache
/// so repeated questions skip the call.
pub struct OpenAIEmbedder {
    client: OpenAIClient,
    model: String,
    cache: Option<Arc<QueryEmbeddingCache>>,
}

impl OpenAIEmbedder {
    /// Create a new embedder
    ///
    /// # Arguments
    ///
    /// * `client` - Transport for the OpenAI-compatible API
    /// * `model` - Model name (e.g., "text-embedding-3-small")
    /// * `cache` - Optional query embedding cache
    pub fn new(client: OpenAIClient, model: String, cache: Option<Arc<QueryEmbeddingCache>>) -> Self {
        Self { client, model, cache }
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response: EmbeddingResponse = self.client.post_json("embeddings", &request).await?;

        // An empty vector scores 0 against every chunk
        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .unwrap_or_default();
        if embedding.is_empty() {
            log::warn!("Embeddings API returned no vector for the query");
        }

        Ok(embedding)
    }
}

#[async_trait]
impl QueryEmbedder for OpenAIEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(text) {
                log::debug!("Cache hit for query: {}", text);
                return Ok(cached);
            }
        }

        let embedding = self.request_embedding(text).await?;

        if let Some(cache) = &self.cache {
            cache.put(text, embedding.clone());
        }

        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;
    use crate::openai::test_server;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn embedder_against(router: Router, cache: Option<Arc<QueryEmbeddingCache>>) -> OpenAIEmbedder {
        let base = test_server::spawn(router).await;
        let client = OpenAIClient::new(&base, "sk-test".to_string(), Duration::from_secs(5)).unwrap();
        OpenAIEmbedder::new(client, "text-embedding-3-small".to_string(), cache)
    }

    #[tokio::test]
    async fn test_embed_query_sends_model_and_input() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["model"], "text-embedding-3-small");
                assert_eq!(body["input"], "lending platform");
                Json(serde_json::json!({"data": [{"embedding": [0.25, 0.5]}]}))
            }),
        );
        let embedder = embedder_against(router, None).await;

        let vector = embedder.embed_query("lending platform").await.unwrap();
        assert_eq!(vector, vec![0.25, 0.5]);
        assert_eq!(embedder.model(), "text-embedding-3-small");
    }

    #[tokio::test]
    async fn test_embed_query_empty_data_is_empty_vector() {
        let router = Router::new()
            .route("/v1/embeddings", post(|| async { Json(serde_json::json!({"data": []})) }));
        let embedder = embedder_against(router, None).await;
        assert!(embedder.embed_query("anything").await.unwrap().is_empty());

        let router = Router::new().route(
            "/v1/embeddings",
            post(|| async { Json(serde_json::json!({"data": [{"embedding": []}]})) }),
        );
        let embedder = embedder_against(router, None).await;
        assert!(embedder.embed_query("anything").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_embed_query_propagates_status() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let embedder = embedder_against(router, None).await;

        let err = embedder.embed_query("anything").await.unwrap_err();
        assert!(matches!(err, RagError::Provider { status: Some(401), .. }));
    }

    #[tokio::test]
    async fn test_cache_skips_repeat_calls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/v1/embeddings",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(serde_json::json!({"data": [{"embedding": [1.0]}]}))
                }
            }),
        );
        let cache = Arc::new(QueryEmbeddingCache::new(8));
        let embedder = embedder_against(router, Some(cache.clone())).await;

        embedder.embed_query("where did you work?").await.unwrap();
        embedder.embed_query("where did you work?").await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }
}
