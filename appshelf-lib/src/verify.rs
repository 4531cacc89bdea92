//! Background asset verification.
//!
//! A [`WorkQueue`] orders pending ids by priority (lower first, FIFO within a
//! priority) and remembers which ids are already pending or being probed so
//! that nothing is probed twice concurrently. A fixed set of persistent
//! tokio workers drains it; each pop probes the asset hosts and writes the
//! outcome into the shared [`CatalogState`].
//!
//! Re-enqueuing a pending id with a better priority pushes a second heap
//! entry and moves the id's slot to the new priority. The old entry is
//! skipped when it surfaces.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::pin::pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use appshelf_core::{AppId, Priority};
use appshelf_remote::{AssetProber, Fetch};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::classify::ClassificationResolver;
use crate::events::{CatalogEvent, EventBus};
use crate::state::{AvailabilityWrite, CatalogState};

/// Hard ceiling per probe. Individual requests carry their own shorter
/// timeouts; this only fires if those somehow fail to.
const SAFETY_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Pending(Priority),
    InFlight,
}

#[derive(Default)]
struct Pending {
    heap: BinaryHeap<Reverse<(Priority, u64, AppId)>>,
    slots: HashMap<AppId, Slot>,
    seq: u64,
}

/// Priority queue of ids with duplicate suppression.
#[derive(Default)]
pub struct WorkQueue {
    pending: Mutex<Pending>,
    notify: Notify,
    closed: AtomicBool,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `id` at `priority`.
    ///
    /// Returns false if the id is already being probed or already pending at
    /// an equal or better priority.
    pub fn push(&self, id: AppId, priority: Priority) -> bool {
        {
            let mut pending = self.lock();
            match pending.slots.get(&id) {
                Some(Slot::InFlight) => return false,
                Some(Slot::Pending(current)) if *current <= priority => return false,
                _ => {}
            }
            pending.slots.insert(id, Slot::Pending(priority));
            pending.seq += 1;
            let seq = pending.seq;
            pending.heap.push(Reverse((priority, seq, id)));
        }
        self.notify.notify_one();
        true
    }

    /// Take the best pending id, marking it in flight.
    pub fn try_pop(&self) -> Option<(AppId, Priority)> {
        let mut pending = self.lock();
        while let Some(Reverse((priority, _, id))) = pending.heap.pop() {
            if pending.slots.get(&id) == Some(&Slot::Pending(priority)) {
                pending.slots.insert(id, Slot::InFlight);
                return Some((id, priority));
            }
        }
        None
    }

    /// Wait for the next id. Returns `None` once the queue is closed.
    pub async fn pop(&self) -> Option<(AppId, Priority)> {
        loop {
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            if let Some(next) = self.try_pop() {
                return Some(next);
            }
            notified.await;
        }
    }

    /// Release an in-flight id so it may be queued again.
    pub fn finish(&self, id: AppId) {
        let mut pending = self.lock();
        if pending.slots.get(&id) == Some(&Slot::InFlight) {
            pending.slots.remove(&id);
        }
    }

    /// True if `id` is pending or in flight.
    pub fn contains(&self, id: AppId) -> bool {
        self.lock().slots.contains_key(&id)
    }

    /// Number of ids waiting to be probed.
    pub fn pending(&self) -> usize {
        self.lock()
            .slots
            .values()
            .filter(|s| matches!(s, Slot::Pending(_)))
            .count()
    }

    /// Number of ids pending or in flight.
    pub fn outstanding(&self) -> usize {
        self.lock().slots.len()
    }

    /// Drop every pending id. In-flight ids finish normally.
    pub fn clear(&self) {
        let mut pending = self.lock();
        pending.heap.clear();
        pending.slots.retain(|_, slot| *slot == Slot::InFlight);
    }

    /// Wake every waiter and make all future pops return `None`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

struct Shared<F> {
    queue: WorkQueue,
    state: Arc<CatalogState>,
    classifier: Arc<ClassificationResolver<F>>,
    prober: AssetProber<F>,
    events: EventBus,
    probes: AtomicU64,
}

impl<F: Fetch> Shared<F> {
    async fn process(&self, id: AppId) {
        if self.state.availability(id).is_some() {
            log::debug!("{id} settled while queued, skipping probe");
            self.queue.finish(id);
            return;
        }

        self.probes.fetch_add(1, Ordering::Relaxed);
        let outcome = self.prober.probe(id).await;
        let available = outcome.availability();
        match available {
            Some(value) => {
                let snapshot = self.state.snapshot();
                let primary = snapshot
                    .get(id)
                    .map(|r| self.classifier.is_primary(r))
                    .unwrap_or(false);
                match self.state.record_availability(id, value, primary) {
                    AvailabilityWrite::Stale => {
                        log::debug!("Dropping probe result for {id}: not in current catalog")
                    }
                    AvailabilityWrite::Recorded {
                        newly_verified: true,
                    } => log::debug!("Verified {id}"),
                    _ => {}
                }
            }
            None => log::debug!("Probe for {id} inconclusive: {outcome:?}"),
        }

        self.queue.finish(id);
        self.events.emit(CatalogEvent::AvailabilityChanged {
            id,
            available,
            verified: self.state.verified_len(),
        });
    }

    async fn process_guarded(&self, id: AppId) {
        if tokio::time::timeout(SAFETY_TIMEOUT, self.process(id))
            .await
            .is_err()
        {
            log::warn!(
                "Probe for {id} exceeded {}s, releasing it",
                SAFETY_TIMEOUT.as_secs()
            );
            self.queue.finish(id);
        }
    }
}

/// Verification work queue plus its worker pool.
pub struct VerificationQueue<F> {
    shared: Arc<Shared<F>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<F: Fetch> VerificationQueue<F> {
    pub fn new(
        state: Arc<CatalogState>,
        classifier: Arc<ClassificationResolver<F>>,
        prober: AssetProber<F>,
        events: EventBus,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: WorkQueue::new(),
                state,
                classifier,
                prober,
                events,
                probes: AtomicU64::new(0),
            }),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn `n` persistent workers on the current tokio runtime.
    ///
    /// With no workers the queue only advances through
    /// [`process_next`](Self::process_next).
    pub fn start(&self, n: usize) {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        for worker in 0..n {
            let shared = Arc::clone(&self.shared);
            handles.push(tokio::spawn(async move {
                while let Some((id, priority)) = shared.queue.pop().await {
                    log::trace!("worker {worker}: probing {id} (priority {priority})");
                    shared.process_guarded(id).await;
                }
                log::debug!("Verification worker {worker} stopped");
            }));
        }
        log::debug!("Started {n} verification workers");
    }

    pub fn worker_count(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Queue every id that has no settled availability and is not already
    /// queued. Returns how many ids were queued or moved to a better priority.
    pub fn enqueue(&self, ids: impl IntoIterator<Item = AppId>, priority: Priority) -> usize {
        if self.shared.queue.is_closed() {
            return 0;
        }
        ids.into_iter()
            .filter(|id| self.shared.state.availability(*id).is_none())
            .filter(|id| self.shared.queue.push(*id, priority))
            .count()
    }

    /// Probe the next queued id on the calling task.
    pub async fn process_next(&self) -> Option<AppId> {
        let (id, _) = self.shared.queue.try_pop()?;
        self.shared.process_guarded(id).await;
        Some(id)
    }

    /// Process queued ids on the calling task until none are left.
    pub async fn drain(&self) -> usize {
        let mut done = 0;
        while self.process_next().await.is_some() {
            done += 1;
        }
        done
    }

    pub fn pending(&self) -> usize {
        self.shared.queue.pending()
    }

    /// Ids pending or currently being probed.
    pub fn outstanding(&self) -> usize {
        self.shared.queue.outstanding()
    }

    pub fn is_queued(&self, id: AppId) -> bool {
        self.shared.queue.contains(id)
    }

    /// Number of network probes started so far.
    pub fn probes_started(&self) -> u64 {
        self.shared.probes.load(Ordering::Relaxed)
    }

    /// Forget pending work, e.g. after a new snapshot was published.
    pub fn clear(&self) {
        self.shared.queue.clear();
    }

    /// Stop accepting work and stop the workers.
    pub fn shutdown(&self) {
        self.shared.queue.close();
        for handle in self
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            handle.abort();
        }
    }
}

impl<F> Drop for VerificationQueue<F> {
    fn drop(&mut self) {
        self.shared.queue.close();
        if let Ok(mut handles) = self.handles.lock() {
            for handle in handles.drain(..) {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/verify_tests.rs"]
mod tests;
