//! # vdb-sync
//!
//! Keep a training console's vector-database collections in step with the
//! knowledge bases registered against them.
//!
//! vdb-sync lists the collections a provider holds and the knowledge bases
//! the console expects, classifies them into synced, missing and orphaned
//! sets, and drives cleanup of orphans through the console's REST API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────┐
//! │  ConsoleApi  │──▶│  reconcile  │──▶│  SyncStore   │
//! │ (HTTP/JSON)  │   │   (pure)    │   │ (generation) │
//! └──────▲───────┘   └─────────────┘   └──────┬───────┘
//!        │                                    │
//!        │          ┌───────────────────┐     │
//!        └──────────│  ActionDispatcher │◀────┘
//!                   │ delete / cleanup  │
//!                   └───────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! vdbsync providers                 # list configured providers
//! vdbsync sync --provider 1         # classify collections
//! vdbsync cleanup --dry-run         # show what cleanup would delete
//! vdbsync cleanup                   # delete orphans, best effort
//! vdbsync test --provider 1         # verify the connection
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Wire and domain records |
//! | [`error`] | Typed API and dispatch errors |
//! | [`client`] | REST client trait and HTTP implementation |
//! | [`registry`] | Provider list and selection |
//! | [`reconcile`] | Collection/knowledge-base classification |
//! | [`store`] | Owned sync state with stale-response guard |
//! | [`dispatch`] | Delete and orphan cleanup actions |
//! | [`probe`] | Connection test |
//! | [`progress`] | Cleanup progress reporting |
//! | [`commands`] | CLI command bodies |

pub mod client;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod probe;
pub mod progress;
pub mod reconcile;
pub mod registry;
pub mod store;
