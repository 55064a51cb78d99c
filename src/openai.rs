//! Minimal transport for OpenAI-compatible endpoints.
//!
//! Shared by the query embedder and the chat generator. Every call carries
//! the client timeout; non-success statuses keep their status code and body
//! in the returned `RagError::Provider` so operators can see them in logs.

use crate::config::OpenAIConfig;
use crate::error::{RagError, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAIClient {
    /// Build a client for `base_url` (e.g. "https://api.openai.com/v1")
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &OpenAIConfig, api_key: String) -> Result<Self> {
        Self::new(
            &config.base_url,
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST `body` as JSON to `path` and decode the JSON response
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RagError::provider(format!("Request to {} timed out", url))
                } else {
                    RagError::provider(format!("Network error: {}", e))
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(RagError::Provider {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RagError::provider(format!("Failed to parse response: {}", e)))
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    //! Throwaway OpenAI-compatible server on an ephemeral port.

    use axum::Router;

    /// Serve `router` on 127.0.0.1 and return its base URL
    pub async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Echo {
        ok: bool,
    }

    #[test]
    fn test_endpoint_joins_cleanly() {
        let client = OpenAIClient::new(
            "https://api.openai.com/v1/",
            "k".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            client.endpoint("/chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(client.endpoint("embeddings"), "https://api.openai.com/v1/embeddings");
    }

    #[tokio::test]
    async fn test_success_decodes_body() {
        let router = Router::new().route(
            "/v1/ping",
            post(|| async { Json(serde_json::json!({"ok": true})) }),
        );
        let base = test_server::spawn(router).await;
        let client = OpenAIClient::new(&base, "k".to_string(), Duration::from_secs(5)).unwrap();

        let echo: Echo = client.post_json("ping", &serde_json::json!({})).await.unwrap();
        assert!(echo.ok);
    }

    #[tokio::test]
    async fn test_error_status_keeps_status_and_body() {
        let router = Router::new().route(
            "/v1/ping",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = test_server::spawn(router).await;
        let client = OpenAIClient::new(&base, "k".to_string(), Duration::from_secs(5)).unwrap();

        let err = client
            .post_json::<_, Echo>("ping", &serde_json::json!({}))
            .await
            .unwrap_err();
        match err {
            RagError::Provider { status, message } => {
                assert_eq!(status, Some(429));
                assert_eq!(message, "slow down");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_provider_error() {
        let router = Router::new().route(
            "/v1/ping",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(serde_json::json!({"ok": true}))
            }),
        );
        let base = test_server::spawn(router).await;
        let client =
            OpenAIClient::new(&base, "k".to_string(), Duration::from_millis(100)).unwrap();

        let err = client
            .post_json::<_, Echo>("ping", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Provider { status: None, .. }));
        assert!(err.to_string().contains("timed out"));
    }
}
