//! The live catalog and the per-snapshot verification tables.
//!
//! One lock guards the current snapshot together with the availability map
//! and the verified list, so a write can check snapshot membership and land
//! in the same critical section. Publishing a new snapshot swaps it in and
//! resets both tables.
//!
//! Records found available while not yet classified as primary are held
//! back. [`CatalogState::promote`] moves them into the verified list once
//! their classification resolves.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use appshelf_core::{AppId, CatalogRecord};

use crate::loader::CatalogSnapshot;

/// Result of [`CatalogState::record_availability`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityWrite {
    /// The id is not part of the current snapshot; nothing was written.
    Stale,
    /// The table already held an equal or stronger value.
    Unchanged,
    /// The value was stored.
    Recorded { newly_verified: bool },
}

/// Counters for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateStats {
    pub generation: u64,
    pub records: usize,
    pub probed: usize,
    pub available: usize,
    pub verified: usize,
}

#[derive(Default)]
struct Tables {
    snapshot: Arc<CatalogSnapshot>,
    generation: u64,
    availability: HashMap<AppId, bool>,
    verified: Vec<CatalogRecord>,
    verified_ids: HashSet<AppId>,
    /// Available ids that were not primary when their probe landed.
    held_back: HashSet<AppId>,
}

/// Shared catalog state. Cheap to query from any thread.
#[derive(Default)]
pub struct CatalogState {
    tables: Mutex<Tables>,
}

impl CatalogState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the snapshot and reset the availability and verified tables.
    /// Returns the new generation number.
    pub fn publish(&self, snapshot: CatalogSnapshot) -> u64 {
        let mut tables = self.lock();
        tables.snapshot = Arc::new(snapshot);
        tables.generation += 1;
        tables.availability.clear();
        tables.verified.clear();
        tables.verified_ids.clear();
        tables.held_back.clear();
        tables.generation
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.lock().snapshot)
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Cached availability of `id`, if a probe has settled it.
    pub fn availability(&self, id: AppId) -> Option<bool> {
        self.lock().availability.get(&id).copied()
    }

    /// Ids of `ids` that have no settled availability yet, in order,
    /// at most `limit` of them.
    pub fn unresolved(&self, ids: &[AppId], limit: usize) -> Vec<AppId> {
        let mut seen = HashSet::new();
        let tables = self.lock();
        ids.iter()
            .copied()
            .filter(|id| !tables.availability.contains_key(id) && seen.insert(*id))
            .take(limit)
            .collect()
    }

    /// Store a probe result for `id`.
    ///
    /// `true` is final: a later `false` for the same id is ignored. A record
    /// joins the verified list the first time it is stored as available if
    /// `is_primary` says so; otherwise it is held back for [`promote`](Self::promote).
    pub fn record_availability(
        &self,
        id: AppId,
        available: bool,
        is_primary: bool,
    ) -> AvailabilityWrite {
        let mut tables = self.lock();
        let Some(record) = tables.snapshot.get(id).cloned() else {
            return AvailabilityWrite::Stale;
        };
        match tables.availability.get(&id) {
            Some(true) => return AvailabilityWrite::Unchanged,
            Some(false) if !available => return AvailabilityWrite::Unchanged,
            _ => {}
        }
        tables.availability.insert(id, available);
        let newly_verified = available && is_primary && tables.verified_ids.insert(id);
        if newly_verified {
            tables.verified.push(record);
        } else if available && !is_primary {
            tables.held_back.insert(id);
        }
        AvailabilityWrite::Recorded { newly_verified }
    }

    /// Append held-back records that `is_primary` now accepts. Returns how
    /// many joined the verified list.
    pub fn promote(&self, is_primary: impl Fn(&CatalogRecord) -> bool) -> usize {
        let mut tables = self.lock();
        if tables.held_back.is_empty() {
            return 0;
        }
        let snapshot = Arc::clone(&tables.snapshot);
        let mut held: Vec<AppId> = tables.held_back.iter().copied().collect();
        held.sort_unstable();
        let mut promoted: Vec<CatalogRecord> = held
            .into_iter()
            .filter_map(|id| snapshot.get(id))
            .filter(|r| is_primary(r))
            .cloned()
            .collect();
        promoted.retain(|r| tables.verified_ids.insert(r.id));
        for record in &promoted {
            tables.held_back.remove(&record.id);
        }
        let count = promoted.len();
        tables.verified.append(&mut promoted);
        count
    }

    /// Number of available records waiting on a primary classification.
    pub fn held_back_len(&self) -> usize {
        self.lock().held_back.len()
    }

    pub fn verified_len(&self) -> usize {
        self.lock().verified.len()
    }

    pub fn is_verified(&self, id: AppId) -> bool {
        self.lock().verified_ids.contains(&id)
    }

    /// A page of verified records matching `needle` (already lowercased).
    pub fn verified_page(&self, needle: &str, skip: usize, take: usize) -> Vec<CatalogRecord> {
        self.lock()
            .verified
            .iter()
            .filter(|r| r.matches_text(needle))
            .skip(skip)
            .take(take)
            .cloned()
            .collect()
    }

    pub fn verified_count(&self, needle: &str) -> usize {
        let tables = self.lock();
        if needle.is_empty() {
            return tables.verified.len();
        }
        tables.verified.iter().filter(|r| r.matches_text(needle)).count()
    }

    pub fn stats(&self) -> StateStats {
        let tables = self.lock();
        StateStats {
            generation: tables.generation,
            records: tables.snapshot.len(),
            probed: tables.availability.len(),
            available: tables.availability.values().filter(|v| **v).count(),
            verified: tables.verified.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> AppId {
        AppId::new(raw).unwrap()
    }

    fn snapshot(ids: &[u32]) -> CatalogSnapshot {
        CatalogSnapshot::from_records(
            ids.iter()
                .map(|&i| CatalogRecord::new(id(i), format!("Title {i}")).unwrap())
                .collect(),
        )
    }

    #[test]
    fn test_publish_resets_tables() {
        let state = CatalogState::new();
        assert_eq!(state.publish(snapshot(&[1, 2])), 1);
        state.record_availability(id(1), true, true);
        assert_eq!(state.verified_len(), 1);

        assert_eq!(state.publish(snapshot(&[1, 2])), 2);
        assert_eq!(state.availability(id(1)), None);
        assert_eq!(state.verified_len(), 0);
    }

    #[test]
    fn test_true_is_final() {
        let state = CatalogState::new();
        state.publish(snapshot(&[1]));
        assert_eq!(
            state.record_availability(id(1), true, true),
            AvailabilityWrite::Recorded {
                newly_verified: true
            }
        );
        assert_eq!(
            state.record_availability(id(1), false, true),
            AvailabilityWrite::Unchanged
        );
        assert_eq!(
            state.record_availability(id(1), true, true),
            AvailabilityWrite::Unchanged
        );
        assert_eq!(state.availability(id(1)), Some(true));
        assert_eq!(state.verified_len(), 1);
    }

    #[test]
    fn test_false_can_become_true() {
        let state = CatalogState::new();
        state.publish(snapshot(&[1]));
        state.record_availability(id(1), false, true);
        assert_eq!(state.verified_len(), 0);
        state.record_availability(id(1), true, true);
        assert_eq!(state.availability(id(1)), Some(true));
        assert!(state.is_verified(id(1)));
    }

    #[test]
    fn test_non_primary_is_not_verified() {
        let state = CatalogState::new();
        state.publish(snapshot(&[1]));
        assert_eq!(
            state.record_availability(id(1), true, false),
            AvailabilityWrite::Recorded {
                newly_verified: false
            }
        );
        assert_eq!(state.availability(id(1)), Some(true));
        assert_eq!(state.verified_len(), 0);
    }

    #[test]
    fn test_stale_write_is_dropped() {
        let state = CatalogState::new();
        state.publish(snapshot(&[1]));
        state.publish(snapshot(&[2]));
        assert_eq!(
            state.record_availability(id(1), true, true),
            AvailabilityWrite::Stale
        );
        assert_eq!(state.availability(id(1)), None);
        assert_eq!(state.verified_len(), 0);
    }

    #[test]
    fn test_verified_page_keeps_append_order() {
        let state = CatalogState::new();
        state.publish(snapshot(&[1, 2, 3, 4]));
        for i in [3, 1, 4] {
            state.record_availability(id(i), true, true);
        }
        let page: Vec<u32> = state
            .verified_page("", 1, 5)
            .into_iter()
            .map(|r| r.id.get())
            .collect();
        assert_eq!(page, vec![1, 4]);
        assert_eq!(state.verified_count("title 4"), 1);
        assert_eq!(state.verified_count(""), 3);
    }

    #[test]
    fn test_unresolved_skips_settled_ids() {
        let state = CatalogState::new();
        state.publish(snapshot(&[1, 2, 3]));
        state.record_availability(id(2), false, true);
        let ids: Vec<AppId> = state.snapshot().ids().chain([id(1)]).collect();
        assert_eq!(state.unresolved(&ids, 10), vec![id(1), id(3)]);
        assert_eq!(state.unresolved(&ids, 1), vec![id(1)]);
    }

    #[test]
    fn test_promote_appends_held_back_records() {
        let state = CatalogState::new();
        state.publish(snapshot(&[1, 2, 3]));
        state.record_availability(id(2), true, false);
        state.record_availability(id(3), true, false);
        state.record_availability(id(1), false, false);
        assert_eq!(state.held_back_len(), 2);
        assert_eq!(state.verified_len(), 0);

        assert_eq!(state.promote(|r| r.id == id(3)), 1);
        assert!(state.is_verified(id(3)));
        assert_eq!(state.held_back_len(), 1);
        assert_eq!(state.promote(|r| r.id == id(3)), 0);

        state.publish(snapshot(&[1, 2, 3]));
        assert_eq!(state.held_back_len(), 0);
        assert_eq!(state.promote(|_| true), 0);
    }
}
