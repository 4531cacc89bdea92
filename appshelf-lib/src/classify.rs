//! Category resolution for catalog ids.
//!
//! Lookups go memory, then the on-disk cache. The network is only touched
//! by [`ClassificationResolver::resolve_network`], never by the filter path.
//! An empty category is a resolved answer ("not a primary entry") and is
//! kept distinct from an id that has never been resolved.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Once, RwLock, RwLockReadGuard, PoisonError};

use appshelf_cache::{CacheKind, JsonCache};
use appshelf_core::{AppId, CatalogRecord, Classification, is_primary_category, looks_non_primary};
use appshelf_remote::{Fetch, StoreClient};
use tokio::sync::Mutex;

/// Outcome of a network resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkResolution {
    /// Category per requested id; `""` where still unknown.
    pub categories: HashMap<AppId, String>,
    /// Ids answered by the store during this pass.
    pub fetched: usize,
    /// Ids whose lookup failed and stay unresolved.
    pub failed: usize,
}

/// Resolves and caches the category of ids.
pub struct ClassificationResolver<F> {
    memory: RwLock<HashMap<AppId, String>>,
    disk: JsonCache<String>,
    disk_loaded: Once,
    store: Option<Arc<StoreClient<F>>>,
    persist: Mutex<()>,
}

impl<F: Fetch> ClassificationResolver<F> {
    /// Resolver backed by the classification cache in `cache_dir`.
    /// With no store client, network resolution degrades to cache reads.
    pub fn new(cache_dir: &Path, store: Option<Arc<StoreClient<F>>>) -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            disk: JsonCache::in_dir(cache_dir, CacheKind::Classification),
            disk_loaded: Once::new(),
            store,
            persist: Mutex::new(()),
        }
    }

    fn ensure_disk_loaded(&self) {
        self.disk_loaded.call_once(|| {
            let on_disk = self.disk.load();
            let mut memory = self.memory.write().unwrap_or_else(PoisonError::into_inner);
            for (key, category) in on_disk {
                if let Ok(id) = key.parse::<AppId>() {
                    memory.entry(id).or_insert(category);
                }
            }
            log::debug!("Classification cache holds {} ids", memory.len());
        });
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<AppId, String>> {
        self.ensure_disk_loaded();
        self.memory.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// A read view for classifying many records under one lock.
    pub fn view(&self) -> ClassificationView<'_> {
        ClassificationView { memory: self.read() }
    }

    pub fn classification(&self, id: AppId) -> Classification {
        Classification::from_cached(self.read().get(&id).map(String::as_str))
    }

    pub fn is_known(&self, id: AppId) -> bool {
        self.read().contains_key(&id)
    }

    /// Primary check with the title heuristic as fallback for unknown ids.
    pub fn is_primary(&self, record: &CatalogRecord) -> bool {
        self.view().is_primary(record)
    }

    /// Categories from memory and disk only; unknown ids map to `""`.
    pub fn resolve_cached(&self, ids: &[AppId]) -> HashMap<AppId, String> {
        let memory = self.read();
        ids.iter()
            .map(|id| (*id, memory.get(id).cloned().unwrap_or_default()))
            .collect()
    }

    /// Like [`resolve_cached`](Self::resolve_cached), additionally fetching
    /// unknown ids from the store and persisting what was learned.
    ///
    /// A failed lookup leaves the id unknown.
    pub async fn resolve_network(&self, ids: &[AppId]) -> NetworkResolution {
        let mut seen = HashSet::new();
        let missing: Vec<AppId> = ids
            .iter()
            .copied()
            .filter(|id| !self.is_known(*id) && seen.insert(*id))
            .collect();

        let mut fetched = BTreeMap::new();
        let mut failed = 0;
        if let Some(store) = &self.store {
            for id in missing {
                match store.app_type(id).await {
                    Ok(category) => {
                        log::debug!("Classified {id} as {category:?}");
                        fetched.insert(id, category);
                    }
                    Err(e) => {
                        log::debug!("Classification of {id} failed: {e}");
                        failed += 1;
                    }
                }
            }
        }

        if !fetched.is_empty() {
            {
                let mut memory = self.memory.write().unwrap_or_else(PoisonError::into_inner);
                for (id, category) in &fetched {
                    memory.insert(*id, category.clone());
                }
            }
            self.persist(&fetched).await;
        }

        NetworkResolution {
            categories: self.resolve_cached(ids),
            fetched: fetched.len(),
            failed,
        }
    }

    /// Merge `updates` into the disk cache. Concurrent callers are serialized
    /// so that no read-modify-write loses another's entries.
    async fn persist(&self, updates: &BTreeMap<AppId, String>) {
        let _guard = self.persist.lock().await;
        let mut on_disk = self.disk.load();
        for (id, category) in updates {
            on_disk.insert(id.to_string(), category.clone());
        }
        self.disk.save(&on_disk);
    }
}

/// A read-locked view of the in-memory classification table.
pub struct ClassificationView<'a> {
    memory: RwLockReadGuard<'a, HashMap<AppId, String>>,
}

impl ClassificationView<'_> {
    pub fn is_primary(&self, record: &CatalogRecord) -> bool {
        match self.memory.get(&record.id) {
            Some(category) => is_primary_category(category),
            None => !looks_non_primary(&record.title),
        }
    }
}
