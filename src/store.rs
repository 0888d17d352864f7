//! Owned sync state for one console session.
//!
//! [`SyncStore`] holds the selected provider, the load state and the last
//! [`ReconciliationResult`]. Every request is started with [`SyncStore::begin`],
//! which hands out a [`Ticket`] stamped with the current generation. A
//! response is applied only if its ticket is still current; switching
//! providers, starting a newer request, or invalidating after a delete all
//! move the generation on, so late responses are discarded instead of
//! overwriting newer state.
//!
//! ```text
//!   Idle ──begin──▶ Loading ──complete(ok)──▶ Success
//!                     ▲   └──complete(err)─▶ Error
//!                     └──────── begin ───────┘
//! ```

use crate::reconcile::ReconciliationResult;

/// Page-level load state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Success,
    Error(String),
}

/// Proof that a request was started at a given generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub provider_id: i64,
}

/// Whether a completed response was applied to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    /// The ticket was superseded; the response was dropped.
    Discarded,
}

#[derive(Debug)]
struct Snapshot {
    provider_id: i64,
    generation: u64,
    result: ReconciliationResult,
}

#[derive(Debug)]
pub struct SyncStore {
    selected: Option<i64>,
    generation: u64,
    state: LoadState,
    snapshot: Option<Snapshot>,
}

impl Default for SyncStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStore {
    pub fn new() -> Self {
        Self {
            selected: None,
            generation: 0,
            state: LoadState::Idle,
            snapshot: None,
        }
    }

    pub fn selected(&self) -> Option<i64> {
        self.selected
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Select a provider. Switching to a different one invalidates any
    /// result and any in-flight request.
    pub fn select(&mut self, provider_id: i64) {
        if self.selected == Some(provider_id) {
            return;
        }
        tracing::debug!(provider_id, "provider selected");
        self.selected = Some(provider_id);
        self.generation += 1;
        self.snapshot = None;
        self.state = LoadState::Idle;
    }

    /// Start a request for `provider_id`, selecting it if needed.
    pub fn begin(&mut self, provider_id: i64) -> Ticket {
        self.select(provider_id);
        self.generation += 1;
        self.state = LoadState::Loading;
        Ticket {
            generation: self.generation,
            provider_id,
        }
    }

    fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation && self.selected == Some(ticket.provider_id)
    }

    /// Apply a finished reconciliation, unless the ticket was superseded.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        outcome: Result<ReconciliationResult, String>,
    ) -> Applied {
        if !self.is_current(&ticket) {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale response"
            );
            return Applied::Discarded;
        }
        match outcome {
            Ok(result) => {
                self.snapshot = Some(Snapshot {
                    provider_id: ticket.provider_id,
                    generation: ticket.generation,
                    result,
                });
                self.state = LoadState::Success;
            }
            Err(message) => {
                self.snapshot = None;
                self.state = LoadState::Error(message);
            }
        }
        Applied::Applied
    }

    /// Record the outcome of an action that produces no result (delete,
    /// probe), under the same ticket discipline.
    pub fn finish(&mut self, ticket: Ticket, outcome: Result<(), String>) -> Applied {
        if !self.is_current(&ticket) {
            return Applied::Discarded;
        }
        self.state = match outcome {
            Ok(()) => LoadState::Success,
            Err(message) => LoadState::Error(message),
        };
        Applied::Applied
    }

    /// Mark the current result stale after either side was mutated.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.snapshot = None;
    }

    /// The last result, if it is current and belongs to `provider_id`.
    pub fn fresh_result(&self, provider_id: i64) -> Option<&ReconciliationResult> {
        self.snapshot
            .as_ref()
            .filter(|s| s.provider_id == provider_id && s.generation == self.generation)
            .map(|s| &s.result)
    }

    /// The last result regardless of freshness, for display only.
    pub fn last_result(&self) -> Option<&ReconciliationResult> {
        self.snapshot.as_ref().map(|s| &s.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RemoteCollection;
    use crate::reconcile::reconcile;

    fn orphan_result(name: &str) -> ReconciliationResult {
        reconcile(&[RemoteCollection::new(name, 1)], &[])
    }

    #[test]
    fn starts_idle() {
        let s = SyncStore::new();
        assert_eq!(s.state(), &LoadState::Idle);
        assert_eq!(s.selected(), None);
        assert!(s.last_result().is_none());
    }

    #[test]
    fn begin_then_complete_applies() {
        let mut s = SyncStore::new();
        let t = s.begin(1);
        assert_eq!(s.state(), &LoadState::Loading);
        assert_eq!(s.complete(t, Ok(orphan_result("a"))), Applied::Applied);
        assert_eq!(s.state(), &LoadState::Success);
        assert!(s.fresh_result(1).unwrap().is_orphan("a"));
        assert!(s.fresh_result(2).is_none());
    }

    #[test]
    fn error_outcome_clears_result() {
        let mut s = SyncStore::new();
        let t = s.begin(1);
        s.complete(t, Ok(orphan_result("a")));
        let t = s.begin(1);
        s.complete(t, Err("boom".into()));
        assert_eq!(s.state(), &LoadState::Error("boom".into()));
        assert!(s.fresh_result(1).is_none());
    }

    #[test]
    fn late_response_after_provider_switch_is_discarded() {
        let mut s = SyncStore::new();
        let old = s.begin(1);
        let new = s.begin(2);
        assert_eq!(s.complete(old, Ok(orphan_result("from_1"))), Applied::Discarded);
        assert!(s.fresh_result(1).is_none());
        assert_eq!(s.state(), &LoadState::Loading);
        assert_eq!(s.complete(new, Ok(orphan_result("from_2"))), Applied::Applied);
        assert!(s.fresh_result(2).unwrap().is_orphan("from_2"));
    }

    #[test]
    fn older_request_for_same_provider_is_discarded() {
        let mut s = SyncStore::new();
        let first = s.begin(1);
        let second = s.begin(1);
        assert_eq!(s.complete(second, Ok(orphan_result("new"))), Applied::Applied);
        assert_eq!(s.complete(first, Ok(orphan_result("old"))), Applied::Discarded);
        assert!(s.fresh_result(1).unwrap().is_orphan("new"));
    }

    #[test]
    fn switching_back_does_not_revive_old_ticket() {
        let mut s = SyncStore::new();
        let t1 = s.begin(1);
        s.select(2);
        s.select(1);
        assert_eq!(s.complete(t1, Ok(orphan_result("a"))), Applied::Discarded);
    }

    #[test]
    fn invalidate_makes_result_stale() {
        let mut s = SyncStore::new();
        let t = s.begin(1);
        s.complete(t, Ok(orphan_result("a")));
        s.invalidate();
        assert!(s.fresh_result(1).is_none());
        assert!(s.last_result().is_none());
    }

    #[test]
    fn reselecting_same_provider_keeps_result() {
        let mut s = SyncStore::new();
        let t = s.begin(1);
        s.complete(t, Ok(orphan_result("a")));
        s.select(1);
        assert!(s.fresh_result(1).is_some());
    }

    #[test]
    fn finish_respects_ticket() {
        let mut s = SyncStore::new();
        let t = s.begin(1);
        s.invalidate();
        assert_eq!(s.finish(t, Ok(())), Applied::Discarded);
        let t = s.begin(1);
        assert_eq!(s.finish(t, Err("denied".into())), Applied::Applied);
        assert_eq!(s.state(), &LoadState::Error("denied".into()));
    }
}
