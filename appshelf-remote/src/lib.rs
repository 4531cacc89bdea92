//! Network edge of appshelf.
//!
//! The engine only ever sees the [`Fetch`] capability: a URL, headers and a
//! timeout in, a status code and body bytes out. [`HttpFetcher`] implements it
//! with reqwest; [`MemoryFetcher`] serves scripted responses for tests and
//! offline runs. On top of it sit the store detail client and the asset
//! existence prober.

pub mod error;
pub mod fetch;
pub mod markup;
pub mod memory;
pub mod probe;
pub mod store;
pub mod types;

pub use error::FetchError;
pub use fetch::{Fetch, FetchRequest, FetchResponse, HttpFetcher, Method};
pub use memory::MemoryFetcher;
pub use probe::{AssetProber, DEFAULT_ASSET_FILE, DEFAULT_ASSET_HOSTS, ProbeOutcome};
pub use store::{DETAILS_URL, StoreClient};
pub use types::Requirements;
