//! Command bodies for the `vdbsync` CLI.
//!
//! Each `run_*` function loads what it needs from the backend, performs one
//! action and prints the outcome to stdout, either as aligned text tables or
//! as a single JSON document (`--output json`). Diagnostics go to stderr via
//! `tracing`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::client::{ConsoleApi, HttpConsoleApi};
use crate::config::{CleanupMode, Config};
use crate::dispatch::ActionDispatcher;
use crate::models::{RemoteCollection, RemoteProvider, ServerSyncResult};
use crate::probe;
use crate::progress::ProgressMode;
use crate::reconcile::ReconciliationResult;
use crate::registry::ProviderRegistry;
use crate::store::SyncStore;

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Build the HTTP client for the configured backend.
pub fn connect(config: &Config) -> Result<Arc<dyn ConsoleApi>> {
    let api = HttpConsoleApi::new(&config.api)
        .with_context(|| format!("Invalid api.base_url: {}", config.api.base_url))?;
    Ok(Arc::new(api))
}

/// Load the registry and select `requested`, the configured default, or the
/// backend's default provider, in that order.
async fn resolve_provider(
    api: &dyn ConsoleApi,
    config: &Config,
    requested: Option<i64>,
    store: &mut SyncStore,
) -> Result<RemoteProvider> {
    let mut registry = ProviderRegistry::load(api)
        .await
        .context("Failed to list vector database providers")?;
    if registry.is_empty() {
        anyhow::bail!("No vector database providers are configured on the backend");
    }
    let provider = registry
        .select_default(requested.or(config.sync.default_provider), store)?
        .clone();
    Ok(provider)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn provider_header(p: &RemoteProvider) -> String {
    format!("{} (id {}, {})", p.name, p.id, p.provider_type)
}

// ============ providers ============

pub async fn run_providers(config: &Config, output: OutputFormat) -> Result<()> {
    let api = connect(config)?;
    let registry = ProviderRegistry::load(api.as_ref())
        .await
        .context("Failed to list vector database providers")?;

    if output == OutputFormat::Json {
        return print_json(&registry.providers());
    }

    if registry.is_empty() {
        println!("No vector database providers configured.");
        return Ok(());
    }

    println!(
        "{:<4} {:<20} {:<10} {:<28} {:<8} {:<8} CREATED",
        "ID", "NAME", "TYPE", "ENDPOINT", "DEFAULT", "STATUS"
    );
    for p in registry.providers() {
        let endpoint = match (&p.host, p.port) {
            (Some(h), Some(port)) => format!("{}:{}", h, port),
            (Some(h), None) => h.clone(),
            _ => "-".to_string(),
        };
        let created = p
            .created_at
            .map(format_ts_relative)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<4} {:<20} {:<10} {:<28} {:<8} {:<8} {}",
            p.id,
            p.name,
            p.provider_type,
            endpoint,
            if p.is_default { "*" } else { "" },
            p.status,
            created
        );
    }
    Ok(())
}

pub async fn run_use(config: &Config, provider_id: i64) -> Result<()> {
    let api = connect(config)?;
    let mut registry = ProviderRegistry::load(api.as_ref())
        .await
        .context("Failed to list vector database providers")?;
    let message = registry
        .set_default(api.as_ref(), provider_id)
        .await
        .with_context(|| format!("Failed to set provider {} as default", provider_id))?;
    let name = registry
        .get(provider_id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| provider_id.to_string());
    if message.is_empty() {
        println!("Default provider is now {}.", name);
    } else {
        println!("{} (default provider: {})", message, name);
    }
    Ok(())
}

// ============ collections ============

#[derive(Serialize)]
struct CollectionsOutput<'a> {
    provider: &'a RemoteProvider,
    collections: &'a [RemoteCollection],
}

/// List the provider's collections. A failed listing is shown as empty.
pub async fn run_collections(
    config: &Config,
    provider: Option<i64>,
    output: OutputFormat,
) -> Result<()> {
    let api = connect(config)?;
    let mut store = SyncStore::new();
    let p = resolve_provider(api.as_ref(), config, provider, &mut store).await?;

    let collections = match api.list_collections(p.id).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(provider_id = p.id, error = %e, "collection listing failed");
            Vec::new()
        }
    };

    if output == OutputFormat::Json {
        return print_json(&CollectionsOutput {
            provider: &p,
            collections: &collections,
        });
    }

    println!("Provider: {}", provider_header(&p));
    println!();
    if collections.is_empty() {
        println!("  (no collections)");
        return Ok(());
    }
    println!("  {:<40} {:>10}   NOTE", "COLLECTION", "VECTORS");
    for c in &collections {
        println!(
            "  {:<40} {:>10}   {}",
            c.name,
            c.vector_count,
            c.error.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

// ============ sync ============

#[derive(Serialize)]
struct SyncOutput<'a> {
    provider: &'a RemoteProvider,
    result: &'a ReconciliationResult,
}

/// Reconcile the provider. With `server`, print the backend's own result.
pub async fn run_sync(
    config: &Config,
    provider: Option<i64>,
    server: bool,
    output: OutputFormat,
) -> Result<()> {
    let api = connect(config)?;
    let mut store = SyncStore::new();
    let p = resolve_provider(api.as_ref(), config, provider, &mut store).await?;
    let dispatcher = ActionDispatcher::new(api);

    if server {
        let result = dispatcher
            .server_sync(p.id)
            .await
            .with_context(|| format!("Server sync failed for provider {}", p.id))?;
        if output == OutputFormat::Json {
            return print_json(&result);
        }
        print_server_sync(&p, &result);
        return Ok(());
    }

    let result = dispatcher
        .refresh(&mut store, p.id)
        .await
        .with_context(|| format!("Sync failed for provider {}", p.id))?;

    if output == OutputFormat::Json {
        return print_json(&SyncOutput {
            provider: &p,
            result: &result,
        });
    }
    print_reconciliation(&p, &result);
    Ok(())
}

fn print_reconciliation(p: &RemoteProvider, r: &ReconciliationResult) {
    println!("Provider: {}", provider_header(p));
    println!();
    println!("  Remote collections:  {}", r.counts.total_remote);
    println!("  Knowledge bases:     {}", r.counts.total_local);
    println!("  Synced:              {}", r.counts.synced);
    println!("  Missing:             {}", r.counts.missing);
    println!("  Orphans:             {}", r.counts.orphans);
    if r.counts.unmapped > 0 {
        println!("  Unmapped:            {}", r.counts.unmapped);
    }

    if !r.synced.is_empty() {
        println!();
        println!("  Synced:");
        println!(
            "  {:<6} {:<24} {:<32} {:>10}",
            "KB", "NAME", "COLLECTION", "VECTORS"
        );
        for pair in &r.synced {
            println!(
                "  {:<6} {:<24} {:<32} {:>10}",
                pair.kb.id, pair.kb.name, pair.collection.name, pair.collection.vector_count
            );
        }
    }

    if !r.missing.is_empty() {
        println!();
        println!("  Missing (registered locally, absent remotely):");
        for kb in &r.missing {
            println!(
                "  {:<6} {:<24} {}",
                kb.id,
                kb.name,
                kb.mapped_name().unwrap_or("-")
            );
        }
    }

    if !r.orphans.is_empty() {
        println!();
        println!("  Orphans (remote only):");
        for name in &r.orphans {
            println!("    {}", name);
        }
    }

    if !r.unmapped.is_empty() {
        println!();
        println!("  Unmapped (no expected collection):");
        for kb in &r.unmapped {
            println!("  {:<6} {}", kb.id, kb.name);
        }
    }

    if !r.errored.is_empty() {
        println!();
        println!("  Collections reported with errors:");
        for name in &r.errored {
            println!("    {}", name);
        }
    }
}

fn print_server_sync(p: &RemoteProvider, r: &ServerSyncResult) {
    let s = &r.sync_status;
    println!("Provider: {} (server-side sync)", provider_header(p));
    println!();
    println!("  Remote collections:  {}", s.total_cloud_collections);
    println!("  Knowledge bases:     {}", s.total_local_knowledge_bases);
    println!("  Synced:              {}", s.synced_count);
    println!("  Missing:             {}", s.missing_count);
    println!("  Orphans:             {}", s.orphan_count);
    for name in &r.orphan_collections {
        println!("    orphan   {}", name);
    }
    for m in &r.missing_collections {
        println!("    missing  {} (kb {} {})", m.collection_name, m.kb_id, m.kb_name);
    }
}

// ============ delete ============

pub async fn run_delete(
    config: &Config,
    provider: Option<i64>,
    name: &str,
    output: OutputFormat,
) -> Result<()> {
    let api = connect(config)?;
    let mut store = SyncStore::new();
    let p = resolve_provider(api.as_ref(), config, provider, &mut store).await?;
    let dispatcher = ActionDispatcher::new(api);

    let result = match dispatcher.delete_and_refresh(&mut store, p.id, name).await {
        Ok(result) => result,
        Err(e) => {
            // The refresh after a failed delete may still have succeeded.
            if let Some(current) = store.fresh_result(p.id) {
                if output == OutputFormat::Json {
                    print_json(&SyncOutput {
                        provider: &p,
                        result: current,
                    })?;
                } else {
                    print_reconciliation(&p, current);
                }
            }
            return Err(anyhow::Error::new(e)
                .context(format!("Failed to delete collection '{}'", name)));
        }
    };

    if output == OutputFormat::Json {
        return print_json(&SyncOutput {
            provider: &p,
            result: &result,
        });
    }
    println!("Deleted collection '{}'.", name);
    println!();
    print_reconciliation(&p, &result);
    Ok(())
}

// ============ cleanup ============

#[derive(Serialize)]
struct CleanupOutput<'a, R: Serialize> {
    provider: &'a RemoteProvider,
    report: R,
    #[serde(skip_serializing_if = "Option::is_none")]
    after: Option<&'a ReconciliationResult>,
}

/// Delete every orphan collection of the provider.
///
/// Always reconciles first so the delete set comes from a current result.
/// `mode` overrides `sync.cleanup` from the config. With `dry_run`, only the
/// orphan list is printed.
pub async fn run_cleanup(
    config: &Config,
    provider: Option<i64>,
    mode: Option<CleanupMode>,
    dry_run: bool,
    progress: ProgressMode,
    output: OutputFormat,
) -> Result<()> {
    let api = connect(config)?;
    let mut store = SyncStore::new();
    let p = resolve_provider(api.as_ref(), config, provider, &mut store).await?;
    let dispatcher = ActionDispatcher::new(api).with_reporter(progress.reporter());
    let mode = mode.unwrap_or(config.sync.cleanup);

    if dry_run {
        let result = dispatcher
            .refresh(&mut store, p.id)
            .await
            .with_context(|| format!("Sync failed for provider {}", p.id))?;
        if output == OutputFormat::Json {
            return print_json(&result.orphans);
        }
        println!(
            "Dry run: {} orphan collection(s) would be deleted from {}",
            result.orphans.len(),
            provider_header(&p)
        );
        for name in &result.orphans {
            println!("  {}", name);
        }
        if !result.unmapped.is_empty() && mode == CleanupMode::Client {
            println!();
            println!(
                "  {} knowledge base(s) have no collection name; client cleanup will refuse to run.",
                result.unmapped.len()
            );
        }
        return Ok(());
    }

    match mode {
        CleanupMode::Server => {
            let report = dispatcher
                .server_cleanup_orphans(&mut store, p.id)
                .await
                .with_context(|| format!("Server cleanup failed for provider {}", p.id))?;
            if output == OutputFormat::Json {
                return print_json(&CleanupOutput {
                    provider: &p,
                    report: &report,
                    after: None,
                });
            }
            println!("{}", report.message);
            println!("  deleted: {}", report.deleted_count);
            for f in &report.failed_collections {
                println!("  failed:  {}: {}", f.name, f.message);
            }
            if !report.failed_collections.is_empty() {
                anyhow::bail!(
                    "{} orphan collection(s) could not be deleted",
                    report.failed_collections.len()
                );
            }
        }
        CleanupMode::Client => {
            dispatcher
                .refresh(&mut store, p.id)
                .await
                .with_context(|| format!("Sync failed for provider {}", p.id))?;
            let (report, after) = dispatcher
                .cleanup_and_refresh(&mut store, p.id)
                .await
                .with_context(|| format!("Cleanup failed for provider {}", p.id))?;

            if output == OutputFormat::Json {
                print_json(&CleanupOutput {
                    provider: &p,
                    report: &report,
                    after: Some(&after),
                })?;
            } else {
                println!(
                    "Deleted {} orphan collection(s) from {}",
                    report.deleted_count,
                    provider_header(&p)
                );
                for name in &report.deleted {
                    println!("  deleted  {}", name);
                }
                for f in &report.failures {
                    println!("  failed   {}: {}", f.name, f.message);
                }
                println!();
                println!("  Orphans remaining:   {}", after.counts.orphans);
            }
            if !report.failures.is_empty() {
                anyhow::bail!(
                    "{} orphan collection(s) could not be deleted",
                    report.failures.len()
                );
            }
        }
    }
    Ok(())
}

// ============ test ============

pub async fn run_test(config: &Config, provider: Option<i64>, output: OutputFormat) -> Result<()> {
    let api = connect(config)?;
    let mut store = SyncStore::new();
    let p = resolve_provider(api.as_ref(), config, provider, &mut store).await?;

    let result = probe::probe(api.as_ref(), &mut store, p.id)
        .await
        .with_context(|| format!("Connection test failed for provider {}", p.id))?;

    if output == OutputFormat::Json {
        print_json(&result)?;
    } else if result.valid {
        println!("{}: OK {}", provider_header(&p), result.message);
    } else {
        println!("{}: FAILED", provider_header(&p));
    }

    if !result.valid {
        anyhow::bail!("{}", result.message);
    }
    Ok(())
}

// ============ formatting ============

/// Format a timestamp relative to now (e.g. "3 hours ago").
fn format_ts_relative(ts: DateTime<Utc>) -> String {
    let delta = Utc::now().signed_duration_since(ts).num_seconds();

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}
