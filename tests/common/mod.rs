//! In-process fake of the console backend for integration tests.
//!
//! Serves the vector-db-provider and knowledge-base endpoints under `/api`
//! on an ephemeral port, backed by a mutable in-memory state that tests can
//! inspect after the fact.

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct FakeState {
    /// (id, name, provider_type, is_default)
    pub providers: Vec<(i64, String, String, bool)>,
    pub collections: HashMap<i64, Vec<Value>>,
    pub kbs: HashMap<i64, Vec<Value>>,
    /// Collection names whose delete returns 500.
    pub refuse_delete: HashSet<String>,
    pub deleted: Vec<String>,
    /// Providers whose connection test reports invalid, with the message.
    pub unreachable: HashMap<i64, String>,
    /// Answer the collection listing with a malformed body.
    pub malformed_collections: bool,
}

pub type Shared = Arc<Mutex<FakeState>>;

pub struct FakeBackend {
    pub addr: SocketAddr,
    pub state: Shared,
}

impl FakeBackend {
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn collection_names(&self, provider_id: i64) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(&provider_id)
            .map(|cs| cs.iter().map(|c| c["name"].as_str().unwrap().to_string()).collect())
            .unwrap_or_default()
    }
}

/// A backend with two providers. Provider 1 (default) holds `kb_1`,
/// `orphan_a` and `orphan_b`; KB 1 maps to `kb_1`, KB 2 to the absent `kb_2`.
/// Provider 2 is empty.
pub fn sample_state() -> FakeState {
    let mut s = FakeState::default();
    s.providers = vec![
        (1, "local-qdrant".into(), "qdrant".into(), true),
        (2, "cloud".into(), "qdrant".into(), false),
    ];
    s.collections.insert(
        1,
        vec![
            json!({ "name": "kb_1", "vectors_count": 10, "points_count": 10 }),
            json!({ "name": "orphan_a", "vectors_count": 5 }),
            json!({ "name": "orphan_b", "vectors_count": 0, "error": "detail lookup failed" }),
        ],
    );
    s.collections.insert(2, vec![]);
    s.kbs.insert(
        1,
        vec![
            json!({ "id": 1, "name": "docs", "collection_name": "kb_1" }),
            json!({ "id": 2, "name": "faq", "collection_name": "kb_2" }),
        ],
    );
    s
}

/// [`sample_state`] with knowledge bases in the console's plain listing
/// shape: no `collection_name`, so every KB is unmapped.
pub fn unmapped_kb_state() -> FakeState {
    let mut s = sample_state();
    s.kbs.insert(
        1,
        vec![json!({
            "id": 1,
            "name": "docs",
            "description": "product docs",
            "document_count": 4,
            "created_at": "2024-05-01T10:00:00",
            "updated_at": null
        })],
    );
    s
}

pub async fn spawn(state: FakeState) -> FakeBackend {
    let shared: Shared = Arc::new(Mutex::new(state));

    let api = Router::new()
        .route("/vector-db-providers", get(list_providers))
        .route("/vector-db-providers/test", post(test_connection))
        .route("/vector-db-providers/{id}", get(get_provider))
        .route("/vector-db-providers/{id}/set-default", post(set_default))
        .route("/vector-db-providers/{id}/collections", get(list_collections))
        .route(
            "/vector-db-providers/{id}/collections/{name}",
            delete(delete_collection),
        )
        .route("/vector-db-providers/{id}/sync", post(sync))
        .route(
            "/vector-db-providers/{id}/sync/cleanup-orphans",
            post(cleanup_orphans),
        )
        .route("/knowledge-bases", get(list_kbs));

    let app = Router::new().nest("/api", api).with_state(shared.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeBackend {
        addr,
        state: shared,
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn provider_json(p: &(i64, String, String, bool)) -> Value {
    json!({
        "id": p.0,
        "name": p.1,
        "provider_type": p.2,
        "host": "localhost",
        "port": 6333,
        "is_default": p.3,
        "status": "active",
        "created_at": "2024-05-01T10:00:00.000000"
    })
}

async fn list_providers(State(s): State<Shared>) -> Json<Value> {
    let s = s.lock().unwrap();
    let providers: Vec<Value> = s.providers.iter().map(provider_json).collect();
    Json(json!({ "total": providers.len(), "providers": providers }))
}

async fn get_provider(State(s): State<Shared>, Path(id): Path<i64>) -> Response {
    let s = s.lock().unwrap();
    match s.providers.iter().find(|p| p.0 == id) {
        Some(p) => Json(provider_json(p)).into_response(),
        None => detail(StatusCode::NOT_FOUND, "provider not found"),
    }
}

async fn set_default(State(s): State<Shared>, Path(id): Path<i64>) -> Response {
    let mut s = s.lock().unwrap();
    if !s.providers.iter().any(|p| p.0 == id) {
        return detail(StatusCode::NOT_FOUND, "provider not found");
    }
    for p in s.providers.iter_mut() {
        p.3 = p.0 == id;
    }
    Json(json!({ "message": "default updated", "provider": { "id": id } })).into_response()
}

async fn list_collections(State(s): State<Shared>, Path(id): Path<i64>) -> Response {
    let s = s.lock().unwrap();
    if s.malformed_collections {
        return Json(json!({ "collections": "not-a-list" })).into_response();
    }
    match s.collections.get(&id) {
        Some(cs) => Json(json!({
            "provider_id": id,
            "total_collections": cs.len(),
            "collections": cs,
        }))
        .into_response(),
        None => detail(StatusCode::NOT_FOUND, "provider not found"),
    }
}

async fn delete_collection(
    State(s): State<Shared>,
    Path((id, name)): Path<(i64, String)>,
) -> Response {
    let mut s = s.lock().unwrap();
    if s.refuse_delete.contains(&name) {
        return detail(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("failed to delete collection: {}", name),
        );
    }
    let Some(cs) = s.collections.get_mut(&id) else {
        return detail(StatusCode::NOT_FOUND, "provider not found");
    };
    cs.retain(|c| c["name"] != name.as_str());
    s.deleted.push(name.clone());
    Json(json!({ "message": "deleted", "collection_name": name, "provider_id": id }))
        .into_response()
}

fn server_orphans(s: &FakeState, id: i64) -> Vec<String> {
    let expected: HashSet<&str> = s
        .kbs
        .get(&id)
        .map(|k| k.iter().filter_map(|kb| kb["collection_name"].as_str()).collect())
        .unwrap_or_default();
    s.collections
        .get(&id)
        .map(|cs| {
            cs.iter()
                .filter_map(|c| c["name"].as_str())
                .filter(|n| !expected.contains(n))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

async fn sync(State(s): State<Shared>, Path(id): Path<i64>) -> Response {
    let s = s.lock().unwrap();
    let names: Vec<String> = s
        .collections
        .get(&id)
        .map(|cs| cs.iter().filter_map(|c| c["name"].as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    let kbs = s.kbs.get(&id).cloned().unwrap_or_default();
    let orphans = server_orphans(&s, id);
    let pairing = |kb: &Value| {
        json!({
            "kb_id": kb["id"],
            "kb_name": kb["name"],
            "collection_name": kb["collection_name"],
        })
    };
    let present = |kb: &Value| {
        kb["collection_name"]
            .as_str()
            .map(|n| names.iter().any(|c| c == n))
            .unwrap_or(false)
    };
    let synced: Vec<Value> = kbs.iter().filter(|kb| present(kb)).map(pairing).collect();
    let missing: Vec<Value> = kbs.iter().filter(|kb| !present(kb)).map(pairing).collect();
    Json(json!({
        "provider_id": id,
        "provider_name": "fake",
        "sync_status": {
            "total_cloud_collections": names.len(),
            "total_local_knowledge_bases": kbs.len(),
            "synced_count": synced.len(),
            "orphan_count": orphans.len(),
            "missing_count": missing.len(),
        },
        "orphan_collections": orphans,
        "missing_collections": missing,
        "synced_collections": synced,
        "recommendations": { "orphan": "...", "missing": "..." }
    }))
    .into_response()
}

async fn cleanup_orphans(State(s): State<Shared>, Path(id): Path<i64>) -> Response {
    let mut s = s.lock().unwrap();
    let orphans = server_orphans(&s, id);
    if orphans.is_empty() {
        return Json(json!({ "message": "no orphan collections", "deleted_count": 0 }))
            .into_response();
    }
    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    for name in orphans {
        if s.refuse_delete.contains(&name) {
            failed.push(json!({ "name": name, "error": "refused" }));
            continue;
        }
        if let Some(cs) = s.collections.get_mut(&id) {
            cs.retain(|c| c["name"] != name.as_str());
        }
        s.deleted.push(name.clone());
        deleted.push(name);
    }
    Json(json!({
        "message": format!("cleaned {} orphan collections", deleted.len()),
        "deleted_count": deleted.len(),
        "deleted_collections": deleted,
        "failed_count": failed.len(),
        "failed_collections": failed,
    }))
    .into_response()
}

#[derive(Deserialize)]
struct KbQuery {
    vector_db_provider_id: Option<i64>,
}

async fn list_kbs(State(s): State<Shared>, Query(q): Query<KbQuery>) -> Json<Value> {
    let s = s.lock().unwrap();
    let kbs: Vec<Value> = match q.vector_db_provider_id {
        Some(id) => s.kbs.get(&id).cloned().unwrap_or_default(),
        None => s.kbs.values().flatten().cloned().collect(),
    };
    Json(json!({ "total": kbs.len(), "knowledge_bases": kbs }))
}

#[derive(Deserialize)]
struct TestBody {
    provider_id: i64,
}

async fn test_connection(State(s): State<Shared>, Json(body): Json<TestBody>) -> Response {
    let s = s.lock().unwrap();
    let Some(p) = s.providers.iter().find(|p| p.0 == body.provider_id) else {
        return detail(StatusCode::NOT_FOUND, "provider not found");
    };
    let result = match s.unreachable.get(&p.0) {
        Some(msg) => json!({ "valid": false, "message": msg }),
        None => json!({ "valid": true, "message": "connected, 3 collections" }),
    };
    Json(json!({
        "provider": { "id": p.0, "name": p.1, "provider_type": p.2 },
        "verification_result": result,
    }))
    .into_response()
}
