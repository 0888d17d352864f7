//! Core data models used throughout vdb-sync.
//!
//! Every record that crosses the REST boundary is decoded into one of these
//! typed structs. Field names follow the backend's JSON (`vectors_count`,
//! `collection_name`) and are renamed to the crate's vocabulary where the
//! wire name is misleading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A configured vector-database provider (Qdrant, ChromaDB, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteProvider {
    pub id: i64,
    pub name: String,
    pub provider_type: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_status() -> String {
    "unknown".to_string()
}

/// Accepts RFC 3339 or a naive ISO timestamp (taken as UTC). Anything else
/// decodes to `None`; a creation time is display-only.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }))
}

/// One collection as reported by the provider's listing call.
///
/// A collection whose detail lookup failed on the backend still appears in
/// the listing with `error` set and a zero count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCollection {
    pub name: String,
    #[serde(rename = "vectors_count", default)]
    pub vector_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RemoteCollection {
    pub fn new(name: impl Into<String>, vector_count: u64) -> Self {
        Self {
            name: name.into(),
            vector_count,
            points_count: None,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// A locally registered knowledge base.
///
/// `expected_collection_name` is derived by the backend; a KB without one has
/// no defined mapping and is left out of sync classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: i64,
    pub name: String,
    #[serde(rename = "collection_name", default)]
    pub expected_collection_name: Option<String>,
}

impl KnowledgeBase {
    pub fn new(id: i64, name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            expected_collection_name: Some(collection.into()),
        }
    }

    /// The expected collection name, or `None` when absent or blank.
    pub fn mapped_name(&self) -> Option<&str> {
        self.expected_collection_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
    }
}

/// Outcome of `POST /vector-db-providers/test`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub valid: bool,
    #[serde(default)]
    pub message: String,
}

/// Server-side reconciliation counts (`sync_status` in the sync response).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    #[serde(default)]
    pub total_cloud_collections: usize,
    #[serde(default)]
    pub total_local_knowledge_bases: usize,
    #[serde(default)]
    pub synced_count: usize,
    #[serde(default)]
    pub orphan_count: usize,
    #[serde(default)]
    pub missing_count: usize,
}

/// A KB/collection pairing as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPairing {
    pub kb_id: i64,
    pub kb_name: String,
    pub collection_name: String,
}

/// Response of `POST /vector-db-providers/{id}/sync`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSyncResult {
    pub provider_id: i64,
    #[serde(default)]
    pub provider_name: String,
    pub sync_status: SyncStatus,
    #[serde(default)]
    pub orphan_collections: Vec<String>,
    #[serde(default)]
    pub missing_collections: Vec<ServerPairing>,
    #[serde(default)]
    pub synced_collections: Vec<ServerPairing>,
}

/// A single collection that could not be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupFailure {
    pub name: String,
    #[serde(rename = "error", alias = "message", default)]
    pub message: String,
}

/// Result of a best-effort orphan cleanup run by this client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub deleted_count: usize,
    pub deleted: Vec<String>,
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    pub fn failed_names(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.name.as_str()).collect()
    }
}

/// Response of `POST /vector-db-providers/{id}/sync/cleanup-orphans`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCleanupReport {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub deleted_count: usize,
    #[serde(default)]
    pub deleted_collections: Vec<String>,
    #[serde(default)]
    pub failed_collections: Vec<CleanupFailure>,
}
