//! Domain types shared by every appshelf crate.
//!
//! Nothing in here performs I/O. The catalog record, the numeric app id, the
//! classification value and the title denylist rules live here so that the
//! cache, remote and engine crates agree on them.

use serde::{Deserialize, Serialize};

pub mod app_id;
pub mod category;
pub mod title_filter;
pub mod util;

pub use app_id::{AppId, AppIdParseError};
pub use category::{Classification, PRIMARY_CATEGORY, is_primary_category};
pub use title_filter::{is_excluded_title, looks_non_primary};

/// Scheduling priority for verification work. Lower values are serviced first.
pub type Priority = u32;

/// Priority used for entries a user is about to see.
pub const PRIORITY_VISIBLE: Priority = 0;

/// Priority used for interactive candidate warm-up during a search.
pub const PRIORITY_INTERACTIVE: Priority = 1;

/// Priority used when warming the whole catalog in bulk.
pub const PRIORITY_BULK: Priority = 2;

/// One entry of the remote catalog.
///
/// Records are immutable once built. Two records are the same entry when
/// both id and title match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: AppId,
    pub title: String,
}

impl CatalogRecord {
    /// Build a record from raw parts, trimming the title.
    ///
    /// Returns `None` when the trimmed title is empty.
    pub fn new(id: AppId, title: impl AsRef<str>) -> Option<Self> {
        let title = title.as_ref().trim();
        if title.is_empty() {
            return None;
        }
        Some(Self {
            id,
            title: title.to_string(),
        })
    }

    /// Case-insensitive match against the title or the decimal id.
    ///
    /// `needle` must already be lowercased. An empty needle matches everything.
    pub fn matches_text(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(needle) || self.id.to_string().contains(needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_trims_title() {
        let rec = CatalogRecord::new(AppId::new(10).unwrap(), "  Half-Life \n").unwrap();
        assert_eq!(rec.title, "Half-Life");
    }

    #[test]
    fn record_rejects_blank_title() {
        assert!(CatalogRecord::new(AppId::new(10).unwrap(), "   ").is_none());
    }

    #[test]
    fn matches_title_or_id() {
        let rec = CatalogRecord::new(AppId::new(4000).unwrap(), "Garry's Mod").unwrap();
        assert!(rec.matches_text("garry"));
        assert!(rec.matches_text("400"));
        assert!(rec.matches_text(""));
        assert!(!rec.matches_text("portal"));
    }
}
