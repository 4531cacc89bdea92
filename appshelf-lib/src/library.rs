//! The [`Library`] ties the engine together: one loader, one shared state,
//! the resolvers, the verification queue with its workers and the query
//! engine, all fed from a single [`Settings`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use appshelf_core::{AppId, CatalogRecord, Classification};
use appshelf_remote::{AssetProber, Fetch, HttpFetcher, Requirements, StoreClient};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

use crate::classify::ClassificationResolver;
use crate::error::LibError;
use crate::events::{CatalogEvent, EventBus};
use crate::install::{find_install_root, plugin_dir};
use crate::loader::{CatalogLoader, CatalogSnapshot};
use crate::query::QueryEngine;
use crate::reconcile::{self, PatchReport, PatchState, ScanReport};
use crate::requirements::RequirementsResolver;
use crate::settings::Settings;
use crate::state::{CatalogState, StateStats};
use crate::verify::VerificationQueue;

/// Ids resolved by the post-load classification warm-up.
pub const CLASSIFY_WARMUP_LIMIT: usize = 128;

/// Ids whose requirement text is prefetched after a load.
pub const REQUIREMENTS_PREFETCH_LIMIT: usize = 50;

/// Everything known about one id.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub record: CatalogRecord,
    pub classification: Classification,
    pub primary: bool,
    pub availability: Option<bool>,
    pub verified: bool,
    pub queued: bool,
    pub requirements: Option<Requirements>,
    /// Present when automatic patch scanning is on and a plugin directory exists.
    pub patch: Option<PatchState>,
}

/// Clears the loading flag when a load ends, however it ends.
struct LoadGuard<'a>(&'a AtomicBool);

impl<'a> LoadGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, LibError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| LibError::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Library<F: Fetch> {
    settings: Settings,
    loader: CatalogLoader<F>,
    state: Arc<CatalogState>,
    classifier: Arc<ClassificationResolver<F>>,
    requirements: Arc<RequirementsResolver<F>>,
    queue: Arc<VerificationQueue<F>>,
    query: Arc<QueryEngine<F>>,
    events: EventBus,
    loading: AtomicBool,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl Library<HttpFetcher> {
    /// A library talking to the real network, caching under the user cache dir.
    pub fn open(settings: Settings) -> Result<Self, LibError> {
        let fetcher = Arc::new(HttpFetcher::new()?);
        let cache_dir = appshelf_cache::cache_dir()?;
        Ok(Self::new(fetcher, settings, &cache_dir))
    }
}

impl<F: Fetch> Library<F> {
    /// Wire up every component. No tasks are spawned until [`start`](Self::start).
    pub fn new(fetcher: Arc<F>, settings: Settings, cache_dir: &Path) -> Self {
        let events = EventBus::new();
        let state = Arc::new(CatalogState::new());
        let store = if settings.no_network {
            None
        } else {
            Some(Arc::new(StoreClient::new(Arc::clone(&fetcher))))
        };
        let classifier = Arc::new(ClassificationResolver::new(cache_dir, store.clone()));
        let requirements = Arc::new(RequirementsResolver::new(cache_dir, store));
        let prober = AssetProber::new(Arc::clone(&fetcher))
            .with_hosts(settings.asset_hosts.clone())
            .with_file_name(settings.asset_file.clone())
            .with_timeout(settings.probe_timeout());
        let queue = Arc::new(VerificationQueue::new(
            Arc::clone(&state),
            Arc::clone(&classifier),
            prober,
            events.clone(),
        ));
        let query = Arc::new(QueryEngine::new(
            Arc::clone(&state),
            Arc::clone(&classifier),
            Arc::clone(&queue),
        ));
        Self {
            loader: CatalogLoader::new(fetcher),
            settings,
            state,
            classifier,
            requirements,
            queue,
            query,
            events,
            loading: AtomicBool::new(false),
            background: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the verification workers on the current runtime.
    pub fn start(&self) {
        self.queue.start(self.settings.worker_count());
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> &CatalogState {
        &self.state
    }

    pub fn queue(&self) -> &VerificationQueue<F> {
        &self.queue
    }

    pub fn stats(&self) -> StateStats {
        self.state.stats()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Fetch the catalog (from `url`, or the configured source) and publish it.
    ///
    /// Fails with [`LibError::Busy`] while another load runs. On failure the
    /// previous snapshot stays in place.
    pub async fn reload(&self, url: Option<&str>) -> Result<usize, LibError> {
        let _guard = LoadGuard::acquire(&self.loading)?;
        let url = url.unwrap_or(&self.settings.catalog_url);
        self.events.status(format!("Loading catalog from {url}"));
        match self.loader.load(url).await {
            Ok(snapshot) => Ok(self.publish(snapshot)),
            Err(e) => {
                self.events.error(format!("Catalog load failed: {e}"));
                Err(e)
            }
        }
    }

    /// Like [`reload`](Self::reload) with a document on disk.
    pub fn reload_from_file(&self, path: &Path) -> Result<usize, LibError> {
        let _guard = LoadGuard::acquire(&self.loading)?;
        self.events
            .status(format!("Loading catalog from {}", path.display()));
        match self.loader.load_file(path) {
            Ok(snapshot) => Ok(self.publish(snapshot)),
            Err(e) => {
                self.events.error(format!("Catalog load failed: {e}"));
                Err(e)
            }
        }
    }

    /// Make `snapshot` the live catalog and start the warm-ups.
    pub fn publish(&self, snapshot: CatalogSnapshot) -> usize {
        let records = snapshot.len();
        let generation = self.state.publish(snapshot);
        self.queue.clear();
        self.events.emit(CatalogEvent::SnapshotPublished {
            generation,
            records,
        });
        self.events.status(format!("Loaded {records} entries"));
        self.query.warm_up();
        self.query.mark_warmed();
        self.spawn_network_warmups();
        records
    }

    fn spawn_network_warmups(&self) {
        if self.settings.no_network {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::debug!("No runtime available, skipping network warm-ups");
            return;
        };
        let snapshot = self.state.snapshot();

        let classify_ids: Vec<AppId> = snapshot
            .ids()
            .filter(|id| !self.classifier.is_known(*id))
            .take(CLASSIFY_WARMUP_LIMIT)
            .collect();
        let requirement_ids: Vec<AppId> =
            snapshot.ids().take(REQUIREMENTS_PREFETCH_LIMIT).collect();

        let mut handles = self.background.lock().unwrap_or_else(PoisonError::into_inner);
        handles.retain(|h| !h.is_finished());

        if !classify_ids.is_empty() {
            let classifier = Arc::clone(&self.classifier);
            let query = Arc::clone(&self.query);
            let events = self.events.clone();
            handles.push(runtime.spawn(async move {
                let result = classifier.resolve_network(&classify_ids).await;
                log::debug!(
                    "Classification warm-up: {} fetched, {} failed",
                    result.fetched,
                    result.failed
                );
                if result.fetched > 0 {
                    query.promote_classified();
                    events.emit(CatalogEvent::ClassificationsUpdated {
                        fetched: result.fetched,
                    });
                }
            }));
        }

        let requirements = Arc::clone(&self.requirements);
        handles.push(runtime.spawn(async move {
            let gained = requirements.prefetch(&requirement_ids).await;
            log::debug!("Prefetched requirements for {gained} ids");
        }));
    }

    pub fn search(
        &self,
        text: &str,
        page: usize,
        page_size: usize,
        require_verified: bool,
    ) -> Vec<CatalogRecord> {
        self.query.search(text, page, page_size, require_verified)
    }

    pub fn count(&self, text: &str, require_verified: bool) -> usize {
        self.query.count(text, require_verified)
    }

    /// Categories for `ids`, fetching unknown ones when `network` is set and
    /// the network is enabled. Unknown ids map to `""`.
    pub async fn classify(&self, ids: &[AppId], network: bool) -> HashMap<AppId, String> {
        if !network || self.settings.no_network {
            return self.classifier.resolve_cached(ids);
        }
        let result = self.classifier.resolve_network(ids).await;
        if result.failed > 0 {
            self.events.error(format!(
                "{} classification lookup(s) failed and stay unresolved",
                result.failed
            ));
        }
        if result.fetched > 0 {
            self.query.promote_classified();
            self.events.emit(CatalogEvent::ClassificationsUpdated {
                fetched: result.fetched,
            });
        }
        result.categories
    }

    pub fn classification(&self, id: AppId) -> Classification {
        self.classifier.classification(id)
    }

    /// Requirement text for `id`, from cache or (if allowed) the store.
    pub async fn requirements(
        &self,
        id: AppId,
        network: bool,
    ) -> Result<Option<Requirements>, LibError> {
        let allow = network && !self.settings.no_network;
        match self.requirements.resolve(id, allow).await {
            Ok(Some(req)) if !req.is_empty() => {
                self.events.emit(CatalogEvent::RequirementsLoaded {
                    id,
                    requirements: req.clone(),
                });
                Ok(Some(req))
            }
            Ok(other) => Ok(other),
            Err(e) => {
                self.events
                    .error(format!("Requirements for {id} unavailable: {e}"));
                Err(e)
            }
        }
    }

    /// The plugin directory: `dir` if given, else the one under the install root.
    pub fn plugin_dir(&self, dir: Option<&Path>) -> Result<PathBuf, LibError> {
        if let Some(dir) = dir {
            return Ok(dir.to_path_buf());
        }
        find_install_root(self.settings.install_root.as_deref())
            .map(|root| plugin_dir(&root))
            .ok_or_else(|| LibError::no_install_root("no candidate contains steamapps"))
    }

    /// Scan the plugin directory for `id` and report its patch state.
    pub fn scan_patch(&self, id: AppId, dir: Option<&Path>) -> Result<ScanReport, LibError> {
        let dir = self.plugin_dir(dir)?;
        let report = reconcile::scan(&dir, id);
        let state = report.state();
        if state.needs_patch() || (state == PatchState::UpToDate && self.settings.notify_up_to_date)
        {
            self.events.status(state.status_line(id));
        }
        for (path, err) in &report.errors {
            self.events
                .error(format!("Cannot read {}: {}", path.display(), err));
        }
        Ok(report)
    }

    /// Neutralize active directives for `id`.
    pub fn patch(
        &self,
        id: AppId,
        dir: Option<&Path>,
        candidates: &[PathBuf],
    ) -> Result<PatchReport, LibError> {
        let dir = self.plugin_dir(dir)?;
        let report = reconcile::patch(&dir, id, candidates);
        if report.files_changed > 0 {
            self.events.status(format!(
                "Patched {} file(s) for {id} ({} line(s))",
                report.files_changed, report.lines_neutralized
            ));
        }
        for (path, err) in &report.failures {
            self.events
                .error(format!("Failed to patch {}: {}", path.display(), err));
        }
        Ok(report)
    }

    /// Everything cached about `id`, without touching the network.
    pub fn inspect(&self, id: AppId) -> Option<EntryInfo> {
        let record = self.state.snapshot().get(id)?.clone();
        let patch = if self.settings.auto_patch_scan {
            self.plugin_dir(None)
                .ok()
                .map(|dir| reconcile::scan(&dir, id).state())
        } else {
            None
        };
        Some(EntryInfo {
            classification: self.classifier.classification(id),
            primary: self.classifier.is_primary(&record),
            availability: self.state.availability(id),
            verified: self.state.is_verified(id),
            queued: self.queue.is_queued(id),
            requirements: self.requirements.cached(id),
            patch,
            record,
        })
    }

    /// Wait until no verification work is outstanding, or `timeout` passes.
    /// Returns true if the queue went idle.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.queue.outstanding() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        true
    }

    /// Stop workers and background tasks.
    pub fn shutdown(&self) {
        self.queue.shutdown();
        for handle in self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            handle.abort();
        }
    }
}
