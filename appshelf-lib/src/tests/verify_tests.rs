use super::*;
use appshelf_core::{CatalogRecord, PRIORITY_BULK, PRIORITY_VISIBLE};
use appshelf_remote::{MemoryFetcher, Method};
use tempfile::TempDir;

use crate::loader::CatalogSnapshot;

fn id(raw: u32) -> AppId {
    AppId::new(raw).unwrap()
}

fn head_url(raw: u32) -> String {
    format!("https://a/{raw}/header.jpg")
}

fn snapshot(ids: &[u32]) -> CatalogSnapshot {
    CatalogSnapshot::from_records(
        ids.iter()
            .map(|&i| CatalogRecord::new(id(i), format!("Title {i}")).unwrap())
            .collect(),
    )
}

struct Fixture {
    _tmp: TempDir,
    fetcher: Arc<MemoryFetcher>,
    state: Arc<CatalogState>,
    queue: VerificationQueue<MemoryFetcher>,
}

fn fixture(ids: &[u32]) -> Fixture {
    let tmp = TempDir::new().unwrap();
    fixture_in(tmp, ids)
}

fn fixture_in(tmp: TempDir, ids: &[u32]) -> Fixture {
    let fetcher = Arc::new(MemoryFetcher::new());
    let state = Arc::new(CatalogState::new());
    state.publish(snapshot(ids));
    let classifier = Arc::new(ClassificationResolver::new(tmp.path(), None));
    let prober = AssetProber::new(Arc::clone(&fetcher)).with_hosts(vec!["https://a/".to_string()]);
    let queue = VerificationQueue::new(Arc::clone(&state), classifier, prober, EventBus::new());
    Fixture {
        _tmp: tmp,
        fetcher,
        state,
        queue,
    }
}

fn present(fetcher: &MemoryFetcher, raw: u32) {
    fetcher.respond(Method::Head, head_url(raw), 200, Vec::new());
}

#[tokio::test]
async fn test_better_priority_is_probed_first() {
    let fx = fixture(&[1, 5, 6, 7]);
    assert_eq!(fx.queue.enqueue([id(5), id(6), id(7)], 10), 3);
    assert_eq!(fx.queue.enqueue([id(1)], 1), 1);

    assert_eq!(fx.queue.process_next().await, Some(id(1)));
    assert_eq!(fx.fetcher.requests()[0].1, head_url(1));

    let rest = [
        fx.queue.process_next().await,
        fx.queue.process_next().await,
        fx.queue.process_next().await,
    ];
    assert_eq!(rest, [Some(id(5)), Some(id(6)), Some(id(7))]);
    assert_eq!(fx.queue.process_next().await, None);
}

#[tokio::test]
async fn test_duplicate_enqueue_probes_once() {
    let fx = fixture(&[10]);
    present(&fx.fetcher, 10);
    assert_eq!(fx.queue.enqueue([id(10)], PRIORITY_BULK), 1);
    assert_eq!(fx.queue.enqueue([id(10)], PRIORITY_BULK), 0);
    assert_eq!(fx.queue.enqueue([id(10), id(10)], PRIORITY_BULK), 0);

    assert_eq!(fx.queue.drain().await, 1);
    assert_eq!(fx.queue.probes_started(), 1);
    assert_eq!(fx.fetcher.count(&head_url(10)), 1);
    assert_eq!(fx.state.availability(id(10)), Some(true));
}

#[tokio::test]
async fn test_escalation_moves_id_forward_without_double_probe() {
    let fx = fixture(&[1, 2, 3]);
    fx.queue.enqueue([id(1), id(2), id(3)], PRIORITY_BULK);
    assert_eq!(fx.queue.enqueue([id(3)], PRIORITY_VISIBLE), 1);
    assert_eq!(fx.queue.pending(), 3);

    let mut order = Vec::new();
    while let Some(next) = fx.queue.process_next().await {
        order.push(next);
    }
    assert_eq!(order, vec![id(3), id(1), id(2)]);
    assert_eq!(fx.queue.probes_started(), 3);
}

#[tokio::test]
async fn test_in_flight_id_is_not_requeued() {
    let fx = fixture(&[1]);
    fx.queue.enqueue([id(1)], PRIORITY_BULK);
    let popped = fx.queue.shared.queue.try_pop();
    assert_eq!(popped, Some((id(1), PRIORITY_BULK)));
    assert_eq!(fx.queue.enqueue([id(1)], PRIORITY_VISIBLE), 0);
    fx.queue.shared.queue.finish(id(1));
    assert_eq!(fx.queue.enqueue([id(1)], PRIORITY_VISIBLE), 1);
}

#[tokio::test]
async fn test_availability_never_reverts() {
    let fx = fixture(&[1]);
    fx.fetcher.respond(Method::Head, head_url(1), 200, Vec::new());
    fx.fetcher.respond(Method::Head, head_url(1), 404, Vec::new());

    fx.queue.enqueue([id(1)], PRIORITY_BULK);
    fx.queue.drain().await;
    assert_eq!(fx.state.availability(id(1)), Some(true));
    assert_eq!(fx.state.verified_len(), 1);

    // Further requests are suppressed because the id is settled.
    assert_eq!(fx.queue.enqueue([id(1)], PRIORITY_VISIBLE), 0);
    // A direct negative write is ignored as well.
    fx.state.record_availability(id(1), false, true);
    // Processing it again is a no-op even though the host now answers 404.
    fx.queue.shared.process(id(1)).await;

    assert_eq!(fx.state.availability(id(1)), Some(true));
    assert!(fx.state.is_verified(id(1)));
    assert_eq!(fx.state.verified_len(), 1);
}

#[tokio::test]
async fn test_transient_failure_is_not_cached() {
    let fx = fixture(&[1]);
    fx.fetcher.fail_any(head_url(1));

    fx.queue.enqueue([id(1)], PRIORITY_BULK);
    fx.queue.drain().await;
    assert_eq!(fx.state.availability(id(1)), None);
    assert!(!fx.queue.is_queued(id(1)));

    assert_eq!(fx.queue.enqueue([id(1)], PRIORITY_BULK), 1);
}

#[tokio::test]
async fn test_definitive_absence_is_cached() {
    let fx = fixture(&[1]);
    fx.queue.enqueue([id(1)], PRIORITY_BULK);
    fx.queue.drain().await;
    assert_eq!(fx.state.availability(id(1)), Some(false));
    assert_eq!(fx.queue.enqueue([id(1)], PRIORITY_BULK), 0);
}

#[tokio::test]
async fn test_settled_while_queued_skips_probe() {
    let fx = fixture(&[1]);
    fx.queue.enqueue([id(1)], PRIORITY_BULK);
    fx.state.record_availability(id(1), true, true);
    assert_eq!(fx.queue.process_next().await, Some(id(1)));
    assert_eq!(fx.queue.probes_started(), 0);
    assert!(fx.fetcher.requests().is_empty());
}

#[tokio::test]
async fn test_result_for_replaced_snapshot_is_dropped() {
    let fx = fixture(&[1]);
    present(&fx.fetcher, 1);
    fx.queue.enqueue([id(1)], PRIORITY_BULK);
    fx.state.publish(snapshot(&[2]));

    fx.queue.drain().await;
    assert_eq!(fx.queue.probes_started(), 1);
    assert_eq!(fx.state.availability(id(1)), None);
    assert_eq!(fx.state.verified_len(), 0);
}

#[tokio::test]
async fn test_non_primary_is_available_but_not_verified() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("appmeta.json"), r#"{"1":"dlc"}"#).unwrap();
    let fx = fixture_in(tmp, &[1]);
    present(&fx.fetcher, 1);

    fx.queue.enqueue([id(1)], PRIORITY_BULK);
    fx.queue.drain().await;
    assert_eq!(fx.state.availability(id(1)), Some(true));
    assert_eq!(fx.state.verified_len(), 0);
}

#[tokio::test]
async fn test_clear_forgets_pending_work() {
    let fx = fixture(&[1, 2]);
    fx.queue.enqueue([id(1), id(2)], PRIORITY_BULK);
    fx.queue.clear();
    assert_eq!(fx.queue.pending(), 0);
    assert_eq!(fx.queue.process_next().await, None);
}

#[tokio::test]
async fn test_workers_drain_the_queue() {
    let ids: Vec<u32> = (1..=40).collect();
    let fx = fixture(&ids);
    for &i in &ids {
        if i % 2 == 0 {
            present(&fx.fetcher, i);
        }
    }
    let mut events = fx.queue.shared.events.subscribe();
    fx.queue.start(4);
    assert_eq!(fx.queue.worker_count(), 4);
    fx.queue.enqueue(ids.iter().map(|&i| id(i)), PRIORITY_BULK);

    tokio::time::timeout(Duration::from_secs(10), async {
        while fx.queue.outstanding() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(fx.state.verified_len(), 20);
    assert_eq!(fx.queue.probes_started(), 40);
    let mut changes = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, CatalogEvent::AvailabilityChanged { .. }) {
            changes += 1;
        }
    }
    assert_eq!(changes, 40);

    fx.queue.shutdown();
    assert_eq!(fx.queue.enqueue([id(1)], PRIORITY_BULK), 0);
}

#[tokio::test]
async fn test_pop_waits_for_push_and_close() {
    let queue = Arc::new(WorkQueue::new());
    let waiter = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.pop().await })
    };
    tokio::task::yield_now().await;
    queue.push(id(9), 3);
    assert_eq!(waiter.await.unwrap(), Some((id(9), 3)));

    let waiter = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.pop().await })
    };
    tokio::task::yield_now().await;
    queue.close();
    assert_eq!(waiter.await.unwrap(), None);
}
