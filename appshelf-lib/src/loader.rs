//! Catalog ingestion.
//!
//! The source document arrives in one of a few shapes. It is decoded into a
//! [`RawCatalog`] first, then normalized into an immutable
//! [`CatalogSnapshot`]: ids coerced, titles trimmed, denylisted titles
//! dropped, `(id, title)` duplicates removed, source order kept.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use appshelf_core::util::snippet;
use appshelf_core::{AppId, CatalogRecord, is_excluded_title};
use appshelf_remote::{Fetch, FetchRequest};
use serde_json::{Map, Value};
use tokio::time::Duration;

use crate::error::LibError;

/// Default catalog source.
pub const DEFAULT_CATALOG_URL: &str =
    "https://raw.githubusercontent.com/mansokwu/applist/main/applist.json";

const LOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Keys under which the list-shaped document nests its `apps` array.
const CONTAINER_KEYS: &[&str] = &["applist", "list"];

/// One undecoded source entry. Fields keep their JSON form until
/// normalization so that numeric strings and numbers are treated alike.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub id: Value,
    pub title: Value,
}

/// The shape the source document turned out to have.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCatalog {
    /// A sequence of `{appid, name}` objects.
    List(Vec<RawEntry>),
    /// An id-string to title-string mapping.
    Map(Vec<RawEntry>),
    /// Anything else. Yields zero records.
    Empty,
}

impl RawCatalog {
    /// Decode a parsed document, preferring the list shape.
    pub fn decode(doc: &Value) -> Self {
        let container = CONTAINER_KEYS.iter().find_map(|key| doc.get(*key));
        if let Some(apps) = container.and_then(|c| c.get("apps")) {
            match apps {
                Value::Array(items) => return Self::from_list(items),
                Value::Object(map) => return Self::from_map(map),
                _ => {}
            }
        }
        match doc {
            Value::Array(items) => Self::from_list(items),
            Value::Object(map) if container.is_none() => Self::from_map(map),
            _ => Self::Empty,
        }
    }

    fn from_list(items: &[Value]) -> Self {
        let entries = items
            .iter()
            .filter_map(|item| {
                let obj = item.as_object()?;
                let id = obj.get("appid").or_else(|| obj.get("id"))?;
                let title = obj.get("name").or_else(|| obj.get("title"))?;
                Some(RawEntry {
                    id: id.clone(),
                    title: title.clone(),
                })
            })
            .collect();
        Self::List(entries)
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        let entries = map
            .iter()
            .map(|(id, title)| RawEntry {
                id: Value::String(id.clone()),
                title: title.clone(),
            })
            .collect();
        Self::Map(entries)
    }

    pub fn entries(&self) -> &[RawEntry] {
        match self {
            Self::List(entries) | Self::Map(entries) => entries,
            Self::Empty => &[],
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Empty => "empty",
        }
    }
}

/// An immutable, ordered catalog plus an id index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    records: Vec<CatalogRecord>,
    index: HashMap<AppId, usize>,
}

impl CatalogSnapshot {
    /// Build a snapshot from already-normalized records.
    ///
    /// When several records share an id the index points at the first.
    pub fn from_records(records: Vec<CatalogRecord>) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        for (pos, rec) in records.iter().enumerate() {
            index.entry(rec.id).or_insert(pos);
        }
        Self { records, index }
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: AppId) -> Option<&CatalogRecord> {
        self.index.get(&id).map(|&pos| &self.records[pos])
    }

    pub fn contains(&self, id: AppId) -> bool {
        self.index.contains_key(&id)
    }

    /// Ids in source order, without repeats.
    pub fn ids(&self) -> impl Iterator<Item = AppId> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(pos, rec)| self.index.get(&rec.id) == Some(pos))
            .map(|(_, rec)| rec.id)
    }
}

fn coerce_id(value: &Value) -> Option<AppId> {
    match value {
        Value::Number(n) => n.as_i64().and_then(AppId::from_i64),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Normalize decoded entries into a snapshot.
pub fn build_snapshot(raw: &RawCatalog) -> CatalogSnapshot {
    let mut seen: HashSet<(AppId, String)> = HashSet::new();
    let mut records = Vec::new();
    for entry in raw.entries() {
        let Some(id) = coerce_id(&entry.id) else {
            continue;
        };
        let Some(title) = entry.title.as_str() else {
            continue;
        };
        let Some(record) = CatalogRecord::new(id, title) else {
            continue;
        };
        if is_excluded_title(&record.title) {
            continue;
        }
        if seen.insert((record.id, record.title.clone())) {
            records.push(record);
        }
    }
    CatalogSnapshot::from_records(records)
}

/// Parse a whole source document.
///
/// Invalid JSON is an error; valid JSON of an unknown shape is an empty snapshot.
pub fn parse_catalog(bytes: &[u8]) -> Result<CatalogSnapshot, LibError> {
    let doc: Value = serde_json::from_slice(bytes).map_err(|e| {
        let text = String::from_utf8_lossy(bytes);
        LibError::parse(format!("{e} (document starts with {:?})", snippet(&text, 60)))
    })?;
    let raw = RawCatalog::decode(&doc);
    let snapshot = build_snapshot(&raw);
    log::debug!(
        "Decoded {} shape: {} raw entries, {} records kept",
        raw.shape(),
        raw.entries().len(),
        snapshot.len()
    );
    Ok(snapshot)
}

/// Fetches and parses the catalog document.
pub struct CatalogLoader<F> {
    fetcher: Arc<F>,
    timeout: Duration,
}

impl<F: Fetch> CatalogLoader<F> {
    pub fn new(fetcher: Arc<F>) -> Self {
        Self {
            fetcher,
            timeout: LOAD_TIMEOUT,
        }
    }

    /// Fetch `url` and build a snapshot. Nothing partial is ever returned.
    pub async fn load(&self, url: &str) -> Result<CatalogSnapshot, LibError> {
        let resp = self
            .fetcher
            .fetch(FetchRequest::get(url).timeout(self.timeout))
            .await?
            .error_for_status(url)?;
        parse_catalog(&resp.body)
    }

    /// Build a snapshot from a document on disk.
    pub fn load_file(&self, path: &Path) -> Result<CatalogSnapshot, LibError> {
        let bytes = std::fs::read(path)?;
        parse_catalog(&bytes)
    }
}

#[cfg(test)]
#[path = "tests/loader_tests.rs"]
mod tests;
