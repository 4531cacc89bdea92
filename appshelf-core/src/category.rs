//! Category classification values.
//!
//! The detail endpoint reports a free-form type string per id. Only `"game"`
//! (any case) counts as the primary category. An empty string is stored for
//! ids that were resolved but carry no usable type, which is different from
//! an id that was never resolved at all.

/// The only category value treated as primary.
pub const PRIMARY_CATEGORY: &str = "game";

/// Returns true if a stored category string denotes the primary category.
pub fn is_primary_category(category: &str) -> bool {
    category.trim().eq_ignore_ascii_case(PRIMARY_CATEGORY)
}

/// What is known about an id's category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Never resolved; callers fall back to title heuristics.
    Unknown,
    /// Resolved to a category string (possibly empty).
    Resolved(String),
}

impl Classification {
    /// Build from a cached value. `None` means the id is absent from every cache.
    pub fn from_cached(value: Option<&str>) -> Self {
        match value {
            Some(v) => Self::Resolved(v.to_string()),
            None => Self::Unknown,
        }
    }

    /// `Some(true/false)` when resolved, `None` when unknown.
    pub fn is_primary(&self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::Resolved(v) => Some(is_primary_category(v)),
        }
    }

    /// The category string, with unknown rendered as empty.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unknown => "",
            Self::Resolved(v) => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_is_case_insensitive() {
        assert!(is_primary_category("game"));
        assert!(is_primary_category("Game"));
        assert!(is_primary_category(" GAME "));
        assert!(!is_primary_category("dlc"));
        assert!(!is_primary_category(""));
    }

    #[test]
    fn empty_resolution_differs_from_unknown() {
        let empty = Classification::from_cached(Some(""));
        let unknown = Classification::from_cached(None);
        assert_eq!(empty.is_primary(), Some(false));
        assert_eq!(unknown.is_primary(), None);
        assert_ne!(empty, unknown);
        assert_eq!(unknown.as_str(), "");
    }
}
