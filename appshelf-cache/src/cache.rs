use std::collections::BTreeMap;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CacheError;

/// The cache files appshelf keeps on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// id → category string.
    Classification,
    /// id → minimum/recommended requirement text.
    Requirements,
}

impl CacheKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Classification => "appmeta.json",
            Self::Requirements => "sysreq.json",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::Requirements => "requirements",
        }
    }

    pub fn all() -> &'static [CacheKind] {
        &[Self::Classification, Self::Requirements]
    }
}

/// Information about a cache file for display purposes.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub kind: CacheKind,
    pub path: PathBuf,
    pub file_size: u64,
    pub entry_count: usize,
    pub modified: Option<String>,
}

/// Get the cache directory for appshelf files.
pub fn cache_dir() -> Result<PathBuf, CacheError> {
    let base =
        dirs::cache_dir().ok_or_else(|| CacheError::cache("Could not determine cache directory"))?;
    Ok(base.join("appshelf"))
}

/// A flat string-keyed JSON document on disk.
///
/// The cache performs no locking. Callers that read-modify-write must
/// serialize those sequences themselves.
#[derive(Debug, Clone)]
pub struct JsonCache<V> {
    path: PathBuf,
    _value: PhantomData<fn() -> V>,
}

impl<V> JsonCache<V>
where
    V: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _value: PhantomData,
        }
    }

    /// The cache file of `kind` inside `dir`.
    pub fn in_dir(dir: &Path, kind: CacheKind) -> Self {
        Self::new(dir.join(kind.file_name()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the whole mapping. A missing or corrupt file reads as empty.
    pub fn load(&self) -> BTreeMap<String, V> {
        match self.try_load() {
            Ok(map) => map,
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable cache {}: {}",
                    self.path.display(),
                    e
                );
                BTreeMap::new()
            }
        }
    }

    /// Load the mapping, reporting why it could not be read.
    ///
    /// A missing file is not an error.
    pub fn try_load(&self) -> Result<BTreeMap<String, V>, CacheError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    /// Persist the whole mapping. Failures are logged and swallowed.
    pub fn save(&self, map: &BTreeMap<String, V>) -> bool {
        match self.try_save(map) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to save cache {}: {}", self.path.display(), e);
                false
            }
        }
    }

    /// Persist the whole mapping atomically (write to a temp file, then rename).
    pub fn try_save(&self, map: &BTreeMap<String, V>) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string(map)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// List the cache files present in `dir`.
pub fn list(dir: &Path) -> Vec<CacheEntry> {
    let mut entries = Vec::new();
    for &kind in CacheKind::all() {
        let path = dir.join(kind.file_name());
        let Ok(meta) = fs::metadata(&path) else {
            continue;
        };
        let entry_count = JsonCache::<serde_json::Value>::new(&path).load().len();
        let modified = meta.modified().ok().map(|t| {
            chrono::DateTime::<chrono::Local>::from(t)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        });
        entries.push(CacheEntry {
            kind,
            path,
            file_size: meta.len(),
            entry_count,
            modified,
        });
    }
    entries
}

/// Remove all cache files in `dir`. Returns the number of bytes freed.
pub fn clear(dir: &Path) -> Result<u64, CacheError> {
    let mut total_size = 0u64;
    for &kind in CacheKind::all() {
        let path = dir.join(kind.file_name());
        if path.exists() {
            if let Ok(m) = fs::metadata(&path) {
                total_size += m.len();
            }
            fs::remove_file(&path)?;
        }
    }
    Ok(total_size)
}
