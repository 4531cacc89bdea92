//! Catalog engine: loading, availability verification, classification,
//! filtered paged queries and plugin-directory reconciliation.
//!
//! [`Library`] is the entry point; the other modules are usable on their own.

pub mod classify;
pub mod error;
pub mod events;
pub mod install;
pub mod library;
pub mod loader;
pub mod query;
pub mod reconcile;
pub mod requirements;
pub mod settings;
pub mod state;
pub mod verify;

pub use appshelf_core::{AppId, CatalogRecord, Classification, Priority};
pub use appshelf_remote::{HttpFetcher, Requirements};
pub use classify::{ClassificationResolver, NetworkResolution};
pub use error::LibError;
pub use events::{CatalogEvent, EventBus};
pub use library::{EntryInfo, Library};
pub use loader::{CatalogLoader, CatalogSnapshot, RawCatalog, parse_catalog};
pub use query::QueryEngine;
pub use reconcile::{PatchReport, PatchState, ScanReport};
pub use requirements::RequirementsResolver;
pub use settings::{Settings, settings_path};
pub use state::{AvailabilityWrite, CatalogState, StateStats};
pub use verify::VerificationQueue;
