use std::sync::Arc;

use appshelf_core::AppId;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::error::FetchError;
use crate::fetch::{Fetch, FetchRequest};
use crate::markup::clean_requirements_html;
use crate::types::{AppDetailsResponse, AppData, Requirements};

/// Store app details endpoint.
pub const DETAILS_URL: &str = "https://store.steampowered.com/api/appdetails";

const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(250);
const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(12);
const REQUIREMENTS_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the store's app details endpoint with request spacing.
pub struct StoreClient<F> {
    fetcher: Arc<F>,
    base_url: String,
    min_interval: Duration,
    last_request: Arc<Mutex<Instant>>,
}

impl<F: Fetch> StoreClient<F> {
    pub fn new(fetcher: Arc<F>) -> Self {
        Self::with_base_url(fetcher, DETAILS_URL)
    }

    pub fn with_base_url(fetcher: Arc<F>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            min_interval: MIN_REQUEST_INTERVAL,
            last_request: Arc::new(Mutex::new(Instant::now() - MIN_REQUEST_INTERVAL)),
        }
    }

    /// Change the minimum spacing between requests (zero disables it).
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn details_url(&self, id: AppId) -> String {
        format!("{}?appids={id}", self.base_url)
    }

    pub fn requirements_url(&self, id: AppId) -> String {
        format!("{}?appids={id}&filters=platforms,pc_requirements", self.base_url)
    }

    /// Look up the category of `id`.
    ///
    /// Returns an empty string when the store answers but has no usable
    /// data for the id; that answer is definitive and may be cached. Any
    /// transport or status failure is returned as an error instead.
    pub async fn app_type(&self, id: AppId) -> Result<String, FetchError> {
        let url = self.details_url(id);
        let data = self.details(id, &url, CLASSIFY_TIMEOUT).await?;
        Ok(data
            .and_then(|d| d.app_type)
            .map(|t| t.trim().to_ascii_lowercase())
            .unwrap_or_default())
    }

    /// Fetch and clean the PC requirements of `id`.
    pub async fn requirements(&self, id: AppId) -> Result<Requirements, FetchError> {
        let url = self.requirements_url(id);
        let Some(data) = self.details(id, &url, REQUIREMENTS_TIMEOUT).await? else {
            return Ok(Requirements::default());
        };
        let (minimum, recommended) = data.raw_requirements();
        Ok(Requirements {
            minimum: clean_requirements_html(&minimum),
            recommended: clean_requirements_html(&recommended),
        })
    }

    async fn details(
        &self,
        id: AppId,
        url: &str,
        timeout: Duration,
    ) -> Result<Option<AppData>, FetchError> {
        self.rate_limit().await;

        let resp = self
            .fetcher
            .fetch(
                FetchRequest::get(url)
                    .header("Accept-Language", "en-US,en;q=0.8")
                    .timeout(timeout),
            )
            .await?;
        if resp.status == 429 {
            return Err(FetchError::RateLimit(url.to_string()));
        }
        let resp = resp.error_for_status(url)?;

        let mut parsed: AppDetailsResponse = serde_json::from_slice(&resp.body)?;
        let Some(entry) = parsed.remove(&id.to_string()) else {
            return Err(FetchError::api(format!("response for {id} did not mention it")));
        };
        if !entry.success {
            log::debug!("Store has no details for {id}");
            return Ok(None);
        }
        Ok(entry.data)
    }

    /// Wait until at least the minimum interval has passed since the last request.
    async fn rate_limit(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.min_interval {
            tokio::time::sleep(self.min_interval - elapsed).await;
        }
        *last = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Method;
    use crate::memory::MemoryFetcher;

    fn id(raw: u32) -> AppId {
        AppId::new(raw).unwrap()
    }

    fn client(fetcher: &Arc<MemoryFetcher>) -> StoreClient<MemoryFetcher> {
        StoreClient::with_base_url(Arc::clone(fetcher), "https://store/details")
            .with_min_interval(Duration::ZERO)
    }

    #[tokio::test]
    async fn app_type_reads_category() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.respond(
            Method::Get,
            "https://store/details?appids=10",
            200,
            br#"{"10":{"success":true,"data":{"type":"Game"}}}"#.to_vec(),
        );
        assert_eq!(client(&fetcher).app_type(id(10)).await.unwrap(), "game");
    }

    #[tokio::test]
    async fn unsuccessful_answer_is_empty_category() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.respond(
            Method::Get,
            "https://store/details?appids=10",
            200,
            br#"{"10":{"success":false}}"#.to_vec(),
        );
        assert_eq!(client(&fetcher).app_type(id(10)).await.unwrap(), "");
    }

    #[tokio::test]
    async fn throttled_answer_is_an_error() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.respond(Method::Get, "https://store/details?appids=10", 429, Vec::new());
        let err = client(&fetcher).app_type(id(10)).await.unwrap_err();
        assert!(matches!(err, FetchError::RateLimit(_)));
    }

    #[tokio::test]
    async fn transport_failure_is_an_error() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.fail(Method::Get, "https://store/details?appids=10");
        assert!(client(&fetcher).app_type(id(10)).await.is_err());
    }

    #[tokio::test]
    async fn requirements_are_cleaned() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.respond(
            Method::Get,
            "https://store/details?appids=10&filters=platforms,pc_requirements",
            200,
            br#"{"10":{"success":true,"data":{"pc_requirements":
                {"minimum":"<ul><li>OS: 10</li></ul>","recommended":""}}}}"#
                .to_vec(),
        );
        let req = client(&fetcher).requirements(id(10)).await.unwrap();
        assert_eq!(req.minimum, "• OS: 10<br>");
        assert_eq!(req.recommended, "");
    }

    #[tokio::test(start_paused = true)]
    async fn requests_are_spaced() {
        let fetcher = Arc::new(MemoryFetcher::new());
        let client = StoreClient::with_base_url(Arc::clone(&fetcher), "https://store/details")
            .with_min_interval(Duration::from_millis(500));
        let start = Instant::now();
        let _ = client.app_type(id(1)).await;
        let _ = client.app_type(id(2)).await;
        assert!(start.elapsed() >= Duration::from_millis(500));
    }
}
