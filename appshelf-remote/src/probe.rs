//! Asset existence probing.
//!
//! An id's asset lives at `<host><id>/<file>` on any of several equivalent
//! CDN hosts. Each host is asked with a HEAD first and, unless that already
//! proved the asset present, a one-byte ranged GET. The first host that
//! answers 200 or 206 settles the question.

use std::sync::Arc;

use appshelf_core::AppId;
use tokio::time::Duration;

use crate::fetch::{Fetch, FetchRequest};

/// CDN hosts in preference order.
pub const DEFAULT_ASSET_HOSTS: &[&str] = &[
    "https://cdn.akamai.steamstatic.com/steam/apps/",
    "https://steamcdn-a.akamaihd.net/steam/apps/",
];

/// File probed under each id's directory.
pub const DEFAULT_ASSET_FILE: &str = "header.jpg";

/// Per-request timeout for a probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(2500);

/// Statuses that prove the asset is missing rather than temporarily unreachable.
const ABSENT_STATUSES: &[u16] = &[403, 404, 410];

/// Result of probing one id across all hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Some host served the asset.
    Present,
    /// Every host answered definitively that the asset does not exist.
    Absent,
    /// No host served the asset and at least one could not be asked.
    Failed(String),
}

impl ProbeOutcome {
    /// The value to record in the availability table, if any.
    /// Failures record nothing so the id stays eligible for another probe.
    pub fn availability(&self) -> Option<bool> {
        match self {
            Self::Present => Some(true),
            Self::Absent => Some(false),
            Self::Failed(_) => None,
        }
    }
}

enum UrlProbe {
    Present,
    Absent,
    Failed(String),
}

/// Checks whether an id's asset exists on any configured host.
pub struct AssetProber<F> {
    fetcher: Arc<F>,
    hosts: Vec<String>,
    file_name: String,
    timeout: Duration,
}

impl<F: Fetch> AssetProber<F> {
    /// Prober using the default hosts, file name and timeout.
    pub fn new(fetcher: Arc<F>) -> Self {
        Self {
            fetcher,
            hosts: DEFAULT_ASSET_HOSTS.iter().map(|h| h.to_string()).collect(),
            file_name: DEFAULT_ASSET_FILE.to_string(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_hosts(mut self, hosts: Vec<String>) -> Self {
        self.hosts = hosts;
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// URL of the asset for `id` on `host`.
    pub fn asset_url(&self, host: &str, id: AppId) -> String {
        if host.ends_with('/') {
            format!("{host}{id}/{}", self.file_name)
        } else {
            format!("{host}/{id}/{}", self.file_name)
        }
    }

    /// Probe every host in order, stopping at the first that has the asset.
    pub async fn probe(&self, id: AppId) -> ProbeOutcome {
        let mut failures = Vec::new();
        for host in &self.hosts {
            let url = self.asset_url(host, id);
            match self.probe_url(&url).await {
                UrlProbe::Present => return ProbeOutcome::Present,
                UrlProbe::Absent => {}
                UrlProbe::Failed(reason) => failures.push(reason),
            }
        }
        if failures.is_empty() {
            ProbeOutcome::Absent
        } else {
            ProbeOutcome::Failed(failures.join("; "))
        }
    }

    async fn probe_url(&self, url: &str) -> UrlProbe {
        let head = self
            .fetcher
            .fetch(
                FetchRequest::head(url)
                    .header("Accept", "image/*")
                    .timeout(self.timeout),
            )
            .await;
        let head_reason = match head {
            Ok(resp) if is_present(resp.status) => return UrlProbe::Present,
            Ok(resp) => format!("HEAD {url} -> {}", resp.status),
            Err(e) => format!("HEAD {url}: {e}"),
        };
        log::debug!("{head_reason}, falling back to ranged GET");

        let ranged = self
            .fetcher
            .fetch(
                FetchRequest::get(url)
                    .header("Accept", "image/*")
                    .header("Range", "bytes=0-0")
                    .timeout(self.timeout),
            )
            .await;
        match ranged {
            Ok(resp) if is_present(resp.status) => UrlProbe::Present,
            Ok(resp) if ABSENT_STATUSES.contains(&resp.status) => UrlProbe::Absent,
            Ok(resp) => UrlProbe::Failed(format!("GET {url} -> {}", resp.status)),
            Err(e) => UrlProbe::Failed(format!("GET {url}: {e}")),
        }
    }
}

fn is_present(status: u16) -> bool {
    status == 200 || status == 206
}
