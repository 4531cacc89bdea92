//! Paginated search and counting over the live catalog.
//!
//! Unverified queries walk the snapshot lazily in source order and stop as
//! soon as the requested page is filled. Verified queries are answered from
//! the verified list and, as a side effect, queue the matching candidates
//! for verification so that later pages fill in.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use appshelf_core::{
    AppId, CatalogRecord, PRIORITY_BULK, PRIORITY_INTERACTIVE, PRIORITY_VISIBLE,
};
use appshelf_remote::Fetch;

use crate::classify::ClassificationResolver;
use crate::state::CatalogState;
use crate::verify::VerificationQueue;

/// Upper bound on ids queued by a catalog-wide warm-up.
pub const BULK_WARMUP_LIMIT: usize = 50_000;

const CANDIDATE_FLOOR: usize = 20_000;
const CANDIDATE_CEILING: usize = 30_000;
const CANDIDATE_PAGES_AHEAD: usize = 120;

/// Lowercased, trimmed form of a search string.
fn needle(text: &str) -> String {
    text.trim().to_lowercase()
}

/// How many unresolved candidates a verified search may queue.
fn candidate_limit(page: usize, page_size: usize) -> usize {
    page_size
        .saturating_mul(page.saturating_add(CANDIDATE_PAGES_AHEAD))
        .clamp(CANDIDATE_FLOOR, CANDIDATE_CEILING)
}

pub struct QueryEngine<F> {
    state: Arc<CatalogState>,
    classifier: Arc<ClassificationResolver<F>>,
    queue: Arc<VerificationQueue<F>>,
    /// Generation for which the count-triggered warm-up already ran.
    warmed: AtomicU64,
}

impl<F: Fetch> QueryEngine<F> {
    pub fn new(
        state: Arc<CatalogState>,
        classifier: Arc<ClassificationResolver<F>>,
        queue: Arc<VerificationQueue<F>>,
    ) -> Self {
        Self {
            state,
            classifier,
            queue,
            warmed: AtomicU64::new(0),
        }
    }

    /// One page of results. `page` is 1-based; page 0 is treated as page 1.
    pub fn search(
        &self,
        text: &str,
        page: usize,
        page_size: usize,
        require_verified: bool,
    ) -> Vec<CatalogRecord> {
        if page_size == 0 {
            return Vec::new();
        }
        let page = page.max(1);
        let start = (page - 1).saturating_mul(page_size);
        let needle = needle(text);

        if !require_verified {
            let snapshot = self.state.snapshot();
            let view = self.classifier.view();
            return snapshot
                .records()
                .iter()
                .filter(|r| r.matches_text(&needle) && view.is_primary(r))
                .skip(start)
                .take(page_size)
                .cloned()
                .collect();
        }

        self.promote_classified();
        let end = start.saturating_add(page_size);
        self.queue_candidates(&needle, end, page_size, candidate_limit(page, page_size));
        self.state.verified_page(&needle, start, page_size)
    }

    /// Number of results the same query would page through.
    pub fn count(&self, text: &str, require_verified: bool) -> usize {
        let needle = needle(text);
        if !require_verified {
            let snapshot = self.state.snapshot();
            let view = self.classifier.view();
            return snapshot
                .records()
                .iter()
                .filter(|r| r.matches_text(&needle) && view.is_primary(r))
                .count();
        }

        self.promote_classified();
        if needle.is_empty() {
            self.warm_up_once();
        } else {
            self.queue_candidates(&needle, 0, 0, CANDIDATE_FLOOR);
        }
        self.state.verified_count(&needle)
    }

    /// Move available records whose classification has since resolved to
    /// primary into the verified list.
    pub fn promote_classified(&self) -> usize {
        let view = self.classifier.view();
        let promoted = self.state.promote(|r| view.is_primary(r));
        if promoted > 0 {
            log::debug!("Promoted {promoted} newly classified records to verified");
        }
        promoted
    }

    /// Queue the first [`BULK_WARMUP_LIMIT`] ids of the snapshot at bulk priority.
    pub fn warm_up(&self) -> usize {
        let snapshot = self.state.snapshot();
        let queued = self
            .queue
            .enqueue(snapshot.ids().take(BULK_WARMUP_LIMIT), PRIORITY_BULK);
        log::debug!("Bulk warm-up queued {queued} ids");
        queued
    }

    /// Run [`warm_up`](Self::warm_up) at most once per published snapshot.
    fn warm_up_once(&self) {
        let generation = self.state.generation();
        let previous = self.warmed.swap(generation, Ordering::AcqRel);
        if previous != generation {
            self.warm_up();
        }
    }

    /// Mark the current snapshot as already warmed.
    pub fn mark_warmed(&self) {
        self.warmed.store(self.state.generation(), Ordering::Release);
    }

    /// Queue unresolved primary candidates matching `needle`.
    ///
    /// The first `page_size` go in at visible priority, the rest up to
    /// `end + page_size` at interactive priority, and everything after that
    /// up to `limit` at bulk priority.
    fn queue_candidates(&self, needle: &str, end: usize, page_size: usize, limit: usize) {
        let snapshot = self.state.snapshot();
        let matching: Vec<AppId> = {
            let view = self.classifier.view();
            snapshot
                .records()
                .iter()
                .filter(|r| r.matches_text(needle) && view.is_primary(r))
                .map(|r| r.id)
                .collect()
        };
        let candidates = self.state.unresolved(&matching, limit);

        let visible = page_size.min(candidates.len());
        let interactive = end.saturating_add(page_size).min(candidates.len()).max(visible);
        let queued = self
            .queue
            .enqueue(candidates[..visible].iter().copied(), PRIORITY_VISIBLE)
            + self.queue.enqueue(
                candidates[visible..interactive].iter().copied(),
                PRIORITY_INTERACTIVE,
            )
            + self
                .queue
                .enqueue(candidates[interactive..].iter().copied(), PRIORITY_BULK);
        if queued > 0 {
            log::debug!(
                "Queued {queued} of {} candidates for {needle:?}",
                candidates.len()
            );
        }
    }
}

#[cfg(test)]
#[path = "tests/query_tests.rs"]
mod tests;
