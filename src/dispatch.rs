//! Actions that read or mutate a provider's collections.
//!
//! Every mutation follows the same discipline: the cached
//! [`ReconciliationResult`] is invalidated before anything is deleted, and
//! the caller re-fetches both lists and reconciles again afterwards. The
//! cached result is never patched in place, so partial failures cannot make
//! it drift from what the provider actually holds.
//!
//! Orphan cleanup only runs from a result that is still current in the
//! [`SyncStore`]. A stale or missing result is an error, not a reason to
//! guess.

use std::sync::Arc;

use crate::client::ConsoleApi;
use crate::error::{ApiError, DispatchError};
use crate::models::{CleanupFailure, CleanupReport, ServerCleanupReport, ServerSyncResult};
use crate::progress::{CleanupEvent, CleanupReporter, NoProgress};
use crate::reconcile::{reconcile, ReconciliationResult};
use crate::store::SyncStore;

pub struct ActionDispatcher {
    api: Arc<dyn ConsoleApi>,
    reporter: Box<dyn CleanupReporter>,
}

impl ActionDispatcher {
    pub fn new(api: Arc<dyn ConsoleApi>) -> Self {
        Self {
            api,
            reporter: Box::new(NoProgress),
        }
    }

    pub fn with_reporter(mut self, reporter: Box<dyn CleanupReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn api(&self) -> &dyn ConsoleApi {
        self.api.as_ref()
    }

    /// Fetch both lists for `provider_id` and reconcile them.
    ///
    /// The two listings are requested concurrently; either failure fails the
    /// whole fetch.
    pub async fn fetch(&self, provider_id: i64) -> Result<ReconciliationResult, ApiError> {
        let (remote, local) = tokio::try_join!(
            self.api.list_collections(provider_id),
            self.api.list_knowledge_bases(provider_id),
        )?;
        let result = reconcile(&remote, &local);
        tracing::info!(
            provider_id,
            synced = result.counts.synced,
            missing = result.counts.missing,
            orphans = result.counts.orphans,
            "reconciled"
        );
        Ok(result)
    }

    /// Fetch, reconcile, and store the result as the current one.
    pub async fn refresh(
        &self,
        store: &mut SyncStore,
        provider_id: i64,
    ) -> Result<ReconciliationResult, DispatchError> {
        let ticket = store.begin(provider_id);
        match self.fetch(provider_id).await {
            Ok(result) => {
                store.complete(ticket, Ok(result.clone()));
                Ok(result)
            }
            Err(e) => {
                store.complete(ticket, Err(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Delete one collection. The store is invalidated whether or not the
    /// delete succeeded; call [`refresh`](Self::refresh) before trusting any
    /// classification again.
    pub async fn delete_collection(
        &self,
        store: &mut SyncStore,
        provider_id: i64,
        name: &str,
    ) -> Result<(), DispatchError> {
        store.invalidate();
        let ticket = store.begin(provider_id);
        let outcome = self.api.delete_collection(provider_id, name).await;
        match &outcome {
            Ok(()) => tracing::info!(provider_id, collection = name, "deleted collection"),
            Err(e) => tracing::warn!(provider_id, collection = name, error = %e, "delete failed"),
        }
        store.finish(
            ticket,
            outcome.as_ref().map(|_| ()).map_err(|e| e.to_string()),
        );
        outcome.map_err(DispatchError::from)
    }

    /// Delete then reconcile again. When the delete fails the refresh still
    /// runs, so `store` may hold a current result alongside the error.
    pub async fn delete_and_refresh(
        &self,
        store: &mut SyncStore,
        provider_id: i64,
        name: &str,
    ) -> Result<ReconciliationResult, DispatchError> {
        let deleted = self.delete_collection(store, provider_id, name).await;
        let refreshed = self.refresh(store, provider_id).await;
        deleted?;
        refreshed
    }

    /// Delete every orphan in the current result, best effort.
    ///
    /// Fails with [`DispatchError::StaleResult`] and deletes nothing unless
    /// `store` holds a current result for `provider_id`. Fails with
    /// [`DispatchError::UnmappedKnowledgeBases`] and deletes nothing when that
    /// result has unmapped knowledge bases. Individual delete failures are
    /// collected in the report and do not stop the batch.
    pub async fn cleanup_orphans(
        &self,
        store: &mut SyncStore,
        provider_id: i64,
    ) -> Result<CleanupReport, DispatchError> {
        let current = store
            .fresh_result(provider_id)
            .ok_or(DispatchError::StaleResult { provider_id })?;
        if !current.unmapped.is_empty() {
            return Err(DispatchError::UnmappedKnowledgeBases {
                provider_id,
                count: current.unmapped.len(),
            });
        }
        let orphans = current.orphans.clone();

        store.invalidate();

        let total = orphans.len() as u64;
        let mut report = CleanupReport::default();
        for (i, name) in orphans.into_iter().enumerate() {
            self.reporter.report(CleanupEvent::Deleting {
                name: name.clone(),
                n: i as u64 + 1,
                total,
            });
            match self.api.delete_collection(provider_id, &name).await {
                Ok(()) => {
                    tracing::info!(provider_id, collection = %name, "deleted orphan");
                    report.deleted.push(name);
                }
                Err(e) => {
                    tracing::warn!(provider_id, collection = %name, error = %e, "orphan delete failed");
                    let message = e.to_string();
                    self.reporter.report(CleanupEvent::Failed {
                        name: name.clone(),
                        message: message.clone(),
                    });
                    report.failures.push(CleanupFailure { name, message });
                }
            }
        }
        report.deleted_count = report.deleted.len();

        self.reporter.report(CleanupEvent::Done {
            deleted: report.deleted_count as u64,
            failed: report.failures.len() as u64,
        });
        Ok(report)
    }

    /// Cleanup followed by a fresh reconciliation.
    pub async fn cleanup_and_refresh(
        &self,
        store: &mut SyncStore,
        provider_id: i64,
    ) -> Result<(CleanupReport, ReconciliationResult), DispatchError> {
        let report = self.cleanup_orphans(store, provider_id).await?;
        let result = self.refresh(store, provider_id).await?;
        Ok((report, result))
    }

    /// Ask the backend to run its own orphan cleanup.
    pub async fn server_cleanup_orphans(
        &self,
        store: &mut SyncStore,
        provider_id: i64,
    ) -> Result<ServerCleanupReport, DispatchError> {
        store.invalidate();
        let report = self.api.server_cleanup_orphans(provider_id).await?;
        tracing::info!(
            provider_id,
            deleted = report.deleted_count,
            failed = report.failed_collections.len(),
            "server cleanup finished"
        );
        Ok(report)
    }

    /// The backend's authoritative reconciliation.
    pub async fn server_sync(&self, provider_id: i64) -> Result<ServerSyncResult, ApiError> {
        self.api.server_sync(provider_id).await
    }
}
