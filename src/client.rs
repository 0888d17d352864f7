//! REST client for the training console backend.
//!
//! [`ConsoleApi`] is the seam between the sync logic and the network. The
//! production implementation, [`HttpConsoleApi`], talks JSON over HTTP with
//! `reqwest`; tests substitute in-memory implementations.
//!
//! # Endpoints
//!
//! | Method | Path | Used by |
//! |--------|------|---------|
//! | `GET`    | `/vector-db-providers` | [`ConsoleApi::list_providers`] |
//! | `GET`    | `/vector-db-providers/{id}` | [`ConsoleApi::get_provider`] |
//! | `POST`   | `/vector-db-providers/{id}/set-default` | [`ConsoleApi::set_default_provider`] |
//! | `GET`    | `/vector-db-providers/{id}/collections` | [`ConsoleApi::list_collections`] |
//! | `DELETE` | `/vector-db-providers/{id}/collections/{name}` | [`ConsoleApi::delete_collection`] |
//! | `POST`   | `/vector-db-providers/{id}/sync` | [`ConsoleApi::server_sync`] |
//! | `POST`   | `/vector-db-providers/{id}/sync/cleanup-orphans` | [`ConsoleApi::server_cleanup_orphans`] |
//! | `POST`   | `/vector-db-providers/test` | [`ConsoleApi::test_connection`] |
//! | `GET`    | `/knowledge-bases?vector_db_provider_id={id}` | [`ConsoleApi::list_knowledge_bases`] |
//!
//! No call is retried. Error bodies in the backend's `{"detail": "..."}`
//! shape are unwrapped into [`ApiError::Server`].

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    KnowledgeBase, RemoteCollection, RemoteProvider, ServerCleanupReport, ServerSyncResult,
    VerificationResult,
};

/// Operations the sync tooling needs from the backend.
#[async_trait]
pub trait ConsoleApi: Send + Sync {
    async fn list_providers(&self) -> ApiResult<Vec<RemoteProvider>>;

    async fn get_provider(&self, provider_id: i64) -> ApiResult<RemoteProvider>;

    /// Mark a provider as the default; returns the backend's message.
    async fn set_default_provider(&self, provider_id: i64) -> ApiResult<String>;

    async fn list_collections(&self, provider_id: i64) -> ApiResult<Vec<RemoteCollection>>;

    /// Knowledge bases registered against the given provider.
    async fn list_knowledge_bases(&self, provider_id: i64) -> ApiResult<Vec<KnowledgeBase>>;

    async fn delete_collection(&self, provider_id: i64, name: &str) -> ApiResult<()>;

    /// The backend's own reconciliation of the provider.
    async fn server_sync(&self, provider_id: i64) -> ApiResult<ServerSyncResult>;

    async fn server_cleanup_orphans(&self, provider_id: i64) -> ApiResult<ServerCleanupReport>;

    async fn test_connection(&self, provider_id: i64) -> ApiResult<VerificationResult>;
}

// ============ Response envelopes ============

#[derive(Deserialize)]
struct ProvidersEnvelope {
    providers: Vec<RemoteProvider>,
}

#[derive(Deserialize)]
struct CollectionsEnvelope {
    collections: Vec<RemoteCollection>,
}

#[derive(Deserialize)]
struct KnowledgeBasesEnvelope {
    knowledge_bases: Vec<KnowledgeBase>,
}

#[derive(Deserialize)]
struct TestEnvelope {
    verification_result: VerificationResult,
}

#[derive(Deserialize)]
struct MessageEnvelope {
    #[serde(default)]
    message: String,
}

// ============ HTTP implementation ============

/// [`ConsoleApi`] over HTTP.
pub struct HttpConsoleApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpConsoleApi {
    /// Build a client for the configured backend.
    ///
    /// The base URL keeps its path prefix (`/api`); endpoint segments are
    /// appended to it.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let mut base = Url::parse(config.base_url.trim()).map_err(|e| ApiError::InvalidUrl {
            endpoint: config.base_url.clone(),
            message: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl {
                endpoint: config.base_url.clone(),
                message: "url cannot be a base".to_string(),
            });
        }
        // Trailing-slash paths would produce an empty segment on push.
        if let Ok(mut segments) = base.path_segments_mut() {
            segments.pop_if_empty();
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Transport {
                endpoint: config.base_url.clone(),
                source: e,
            })?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl {
                endpoint: segments.join("/"),
                message: "url cannot be a base".to_string(),
            })?
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> ApiResult<(StatusCode, String)> {
        let endpoint = format!("{} {}", method, url.path());
        tracing::debug!(%endpoint, "sending request");

        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await.map_err(|e| ApiError::Transport {
            endpoint: endpoint.clone(),
            source: e,
        })?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| ApiError::Transport {
            endpoint: endpoint.clone(),
            source: e,
        })?;

        tracing::debug!(%endpoint, status = status.as_u16(), bytes = text.len(), "response");
        Ok((status, text))
    }

    /// Send a request and decode a successful JSON body into `T`.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<serde_json::Value>,
        what: impl FnOnce() -> String,
    ) -> ApiResult<T> {
        let url = self.endpoint(segments)?;
        let path = url.path().to_string();
        let (status, text) = self.send(method, url, body).await?;
        check_status(status, &text, what)?;
        decode(&path, &text)
    }
}

/// Map non-success statuses onto [`ApiError`].
fn check_status(status: StatusCode, body: &str, what: impl FnOnce() -> String) -> ApiResult<()> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound { what: what() });
    }
    Err(ApiError::Server {
        status: status.as_u16(),
        message: error_message(body),
    })
}

/// Extract the human-readable message from an error body.
///
/// Accepts `{"detail": "..."}`, `{"message": "..."}` and
/// `{"error": {"message": "..."}}`; anything else is returned raw.
pub fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let found = json
            .get("detail")
            .or_else(|| json.get("message"))
            .or_else(|| json.get("error").and_then(|e| e.get("message")));
        if let Some(v) = found {
            return match v.as_str() {
                Some(s) => s.to_string(),
                None => v.to_string(),
            };
        }
    }
    if trimmed.is_empty() {
        "(empty response body)".to_string()
    } else {
        trimmed.to_string()
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> ApiResult<T> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode {
        endpoint: endpoint.to_string(),
        source: e,
    })
}

const PROVIDERS: &str = "vector-db-providers";

#[async_trait]
impl ConsoleApi for HttpConsoleApi {
    async fn list_providers(&self) -> ApiResult<Vec<RemoteProvider>> {
        let env: ProvidersEnvelope = self
            .call(Method::GET, &[PROVIDERS], None, || {
                "provider list".to_string()
            })
            .await?;
        Ok(env.providers)
    }

    async fn get_provider(&self, provider_id: i64) -> ApiResult<RemoteProvider> {
        let id = provider_id.to_string();
        self.call(Method::GET, &[PROVIDERS, &id], None, || {
            format!("provider {}", provider_id)
        })
        .await
    }

    async fn set_default_provider(&self, provider_id: i64) -> ApiResult<String> {
        let id = provider_id.to_string();
        let env: MessageEnvelope = self
            .call(Method::POST, &[PROVIDERS, &id, "set-default"], None, || {
                format!("provider {}", provider_id)
            })
            .await?;
        Ok(env.message)
    }

    async fn list_collections(&self, provider_id: i64) -> ApiResult<Vec<RemoteCollection>> {
        let id = provider_id.to_string();
        let env: CollectionsEnvelope = self
            .call(Method::GET, &[PROVIDERS, &id, "collections"], None, || {
                format!("provider {}", provider_id)
            })
            .await?;
        Ok(env.collections)
    }

    async fn list_knowledge_bases(&self, provider_id: i64) -> ApiResult<Vec<KnowledgeBase>> {
        let mut url = self.endpoint(&["knowledge-bases"])?;
        url.query_pairs_mut()
            .append_pair("vector_db_provider_id", &provider_id.to_string());
        let path = url.path().to_string();
        let (status, text) = self.send(Method::GET, url, None).await?;
        check_status(status, &text, || "knowledge base list".to_string())?;
        let env: KnowledgeBasesEnvelope = decode(&path, &text)?;
        Ok(env.knowledge_bases)
    }

    async fn delete_collection(&self, provider_id: i64, name: &str) -> ApiResult<()> {
        let id = provider_id.to_string();
        let url = self.endpoint(&[PROVIDERS, &id, "collections", name])?;
        let (status, text) = self.send(Method::DELETE, url, None).await?;
        check_status(status, &text, || format!("collection '{}'", name))
    }

    async fn server_sync(&self, provider_id: i64) -> ApiResult<ServerSyncResult> {
        let id = provider_id.to_string();
        self.call(Method::POST, &[PROVIDERS, &id, "sync"], None, || {
            format!("provider {}", provider_id)
        })
        .await
    }

    async fn server_cleanup_orphans(&self, provider_id: i64) -> ApiResult<ServerCleanupReport> {
        let id = provider_id.to_string();
        self.call(
            Method::POST,
            &[PROVIDERS, &id, "sync", "cleanup-orphans"],
            None,
            || format!("provider {}", provider_id),
        )
        .await
    }

    async fn test_connection(&self, provider_id: i64) -> ApiResult<VerificationResult> {
        let body = serde_json::json!({ "provider_id": provider_id });
        let env: TestEnvelope = self
            .call(Method::POST, &[PROVIDERS, "test"], Some(body), || {
                format!("provider {}", provider_id)
            })
            .await?;
        Ok(env.verification_result)
    }
}
