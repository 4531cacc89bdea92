//! PC requirement text per id, cached in memory and on disk.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Once, PoisonError, RwLock};

use appshelf_cache::{CacheKind, JsonCache};
use appshelf_core::AppId;
use appshelf_remote::{Fetch, Requirements, StoreClient};
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;

use crate::error::LibError;

const PREFETCH_CONCURRENCY: usize = 4;

pub struct RequirementsResolver<F> {
    memory: RwLock<HashMap<AppId, Requirements>>,
    disk: JsonCache<Requirements>,
    disk_loaded: Once,
    store: Option<Arc<StoreClient<F>>>,
    persist: Mutex<()>,
}

impl<F: Fetch> RequirementsResolver<F> {
    pub fn new(cache_dir: &Path, store: Option<Arc<StoreClient<F>>>) -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            disk: JsonCache::in_dir(cache_dir, CacheKind::Requirements),
            disk_loaded: Once::new(),
            store,
            persist: Mutex::new(()),
        }
    }

    fn ensure_disk_loaded(&self) {
        self.disk_loaded.call_once(|| {
            let on_disk = self.disk.load();
            let mut memory = self.memory.write().unwrap_or_else(PoisonError::into_inner);
            for (key, req) in on_disk {
                if let Ok(id) = key.parse::<AppId>() {
                    memory.entry(id).or_insert(req);
                }
            }
        });
    }

    /// Cached requirements, without touching the network.
    pub fn cached(&self, id: AppId) -> Option<Requirements> {
        self.ensure_disk_loaded();
        self.memory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Cached requirements, fetching them when `allow_network` is set and
    /// nothing is cached yet. `Ok(None)` means nothing is known.
    pub async fn resolve(
        &self,
        id: AppId,
        allow_network: bool,
    ) -> Result<Option<Requirements>, LibError> {
        if let Some(req) = self.cached(id) {
            return Ok(Some(req));
        }
        let Some(store) = self.store.as_ref().filter(|_| allow_network) else {
            return Ok(None);
        };
        let req = store.requirements(id).await?;
        if req.is_empty() {
            log::debug!("Store lists no requirements for {id}");
            return Ok(Some(req));
        }
        self.memory
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, req.clone());
        self.persist(id, &req).await;
        Ok(Some(req))
    }

    /// Fetch requirements for uncached ids with small fan-out, ignoring
    /// failures. Returns how many ids gained text.
    pub async fn prefetch(&self, ids: &[AppId]) -> usize {
        if self.store.is_none() {
            return 0;
        }
        let missing: Vec<AppId> = ids
            .iter()
            .copied()
            .filter(|id| self.cached(*id).is_none())
            .collect();
        stream::iter(missing)
            .map(|id| async move { self.resolve(id, true).await })
            .buffer_unordered(PREFETCH_CONCURRENCY)
            .filter(|res| {
                let gained = matches!(res, Ok(Some(req)) if !req.is_empty());
                async move { gained }
            })
            .count()
            .await
    }

    async fn persist(&self, id: AppId, req: &Requirements) {
        let _guard = self.persist.lock().await;
        let mut on_disk = self.disk.load();
        on_disk.insert(id.to_string(), req.clone());
        self.disk.save(&on_disk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appshelf_remote::{MemoryFetcher, Method};
    use tempfile::TempDir;
    use tokio::time::Duration;

    fn id(raw: u32) -> AppId {
        AppId::new(raw).unwrap()
    }

    fn url(raw: u32) -> String {
        format!("https://store/details?appids={raw}&filters=platforms,pc_requirements")
    }

    fn resolver(
        tmp: &TempDir,
        fetcher: &Arc<MemoryFetcher>,
    ) -> RequirementsResolver<MemoryFetcher> {
        let store = StoreClient::with_base_url(Arc::clone(fetcher), "https://store/details")
            .with_min_interval(Duration::ZERO);
        RequirementsResolver::new(tmp.path(), Some(Arc::new(store)))
    }

    fn answer(fetcher: &MemoryFetcher, raw: u32) {
        let body = format!(
            concat!(
                r#"{{"{raw}":{{"success":true,"data":"#,
                r#"{{"pc_requirements":{{"minimum":"<li>OS</li>"}}}}}}}}"#,
            ),
            raw = raw
        );
        fetcher.respond(Method::Get, url(raw), 200, body.into_bytes());
    }

    #[tokio::test]
    async fn test_cache_only_without_network() {
        let tmp = TempDir::new().unwrap();
        let fetcher = Arc::new(MemoryFetcher::new());
        answer(&fetcher, 10);
        let resolver = resolver(&tmp, &fetcher);
        assert_eq!(resolver.resolve(id(10), false).await.unwrap(), None);
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_then_serve_from_disk() {
        let tmp = TempDir::new().unwrap();
        let fetcher = Arc::new(MemoryFetcher::new());
        answer(&fetcher, 10);
        let req = resolver(&tmp, &fetcher)
            .resolve(id(10), true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(req.minimum, "• OS<br>");

        let offline: RequirementsResolver<MemoryFetcher> =
            RequirementsResolver::new(tmp.path(), None);
        assert_eq!(offline.cached(id(10)), Some(req));
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_entry_absent() {
        let tmp = TempDir::new().unwrap();
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.fail(Method::Get, url(10));
        let resolver = resolver(&tmp, &fetcher);
        assert!(resolver.resolve(id(10), true).await.is_err());
        assert_eq!(resolver.cached(id(10)), None);
    }

    #[tokio::test]
    async fn test_prefetch_counts_gains() {
        let tmp = TempDir::new().unwrap();
        let fetcher = Arc::new(MemoryFetcher::new());
        answer(&fetcher, 1);
        answer(&fetcher, 2);
        let resolver = resolver(&tmp, &fetcher);
        assert_eq!(resolver.prefetch(&[id(1), id(2), id(3)]).await, 2);
        assert_eq!(resolver.prefetch(&[id(1), id(2)]).await, 0);
    }
}
