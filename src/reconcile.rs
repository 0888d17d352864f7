//! Classification of remote collections against local knowledge bases.
//!
//! [`reconcile`] is a pure function: given the collections a provider reports
//! and the knowledge bases registered against it, it sorts every KB into
//! `synced`, `missing` or `unmapped`, and every distinct remote collection
//! name into either a synced pairing or `orphans`.
//!
//! # Rules
//!
//! - Remote names form a set. When the listing repeats a name, the last
//!   occurrence supplies the count and error; the first occurrence fixes
//!   the output position.
//! - A KB whose expected collection name is absent or blank is `unmapped`:
//!   it is neither synced nor missing.
//! - Several KBs may expect the same collection. Each of them is synced
//!   against it, and the collection is not an orphan.
//! - A collection carrying an `error` is classified by name like any other
//!   and additionally listed in `errored`.
//!
//! Output order is deterministic: KB lists follow the local input order,
//! name lists follow remote first-seen order.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::{KnowledgeBase, RemoteCollection};

/// A KB paired with the remote collection it expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncedPair {
    pub kb: KnowledgeBase,
    pub collection: RemoteCollection,
}

/// Cardinalities of a [`ReconciliationResult`] and of its inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounts {
    pub synced: usize,
    pub missing: usize,
    pub orphans: usize,
    pub unmapped: usize,
    /// Distinct remote collection names.
    pub total_remote: usize,
    pub total_local: usize,
}

/// Derived view of one provider. Valid only until either input list changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconciliationResult {
    pub synced: Vec<SyncedPair>,
    pub missing: Vec<KnowledgeBase>,
    pub orphans: Vec<String>,
    pub unmapped: Vec<KnowledgeBase>,
    /// Remote names whose listing entry reported an error.
    pub errored: Vec<String>,
    pub counts: SyncCounts,
}

impl ReconciliationResult {
    pub fn is_clean(&self) -> bool {
        self.orphans.is_empty() && self.missing.is_empty()
    }

    pub fn is_orphan(&self, name: &str) -> bool {
        self.orphans.iter().any(|o| o == name)
    }

    /// Distinct remote names that some KB is synced against.
    pub fn synced_collection_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for pair in &self.synced {
            let name = pair.collection.name.as_str();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// Classify `remote` against `local`. Never fails.
pub fn reconcile(remote: &[RemoteCollection], local: &[KnowledgeBase]) -> ReconciliationResult {
    // Collapse duplicates: index by name, later entries overwrite the slot.
    let mut slots: Vec<&RemoteCollection> = Vec::with_capacity(remote.len());
    let mut by_name: HashMap<&str, usize> = HashMap::with_capacity(remote.len());
    for collection in remote {
        match by_name.get(collection.name.as_str()) {
            Some(&i) => slots[i] = collection,
            None => {
                by_name.insert(collection.name.as_str(), slots.len());
                slots.push(collection);
            }
        }
    }

    let mut consumed = vec![false; slots.len()];
    let mut result = ReconciliationResult::default();

    for kb in local {
        let Some(expected) = kb.mapped_name() else {
            result.unmapped.push(kb.clone());
            continue;
        };
        match by_name.get(expected) {
            Some(&i) => {
                consumed[i] = true;
                result.synced.push(SyncedPair {
                    kb: kb.clone(),
                    collection: slots[i].clone(),
                });
            }
            None => result.missing.push(kb.clone()),
        }
    }

    for (i, collection) in slots.iter().enumerate() {
        if !consumed[i] {
            result.orphans.push(collection.name.clone());
        }
        if collection.error.is_some() {
            result.errored.push(collection.name.clone());
        }
    }

    result.counts = SyncCounts {
        synced: result.synced.len(),
        missing: result.missing.len(),
        orphans: result.orphans.len(),
        unmapped: result.unmapped.len(),
        total_remote: slots.len(),
        total_local: local.len(),
    };
    result
}
