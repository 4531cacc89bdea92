//! Lexical title rules for spotting non-primary entries (DLC, demos,
//! soundtracks, betas, tools, trailers, servers).
//!
//! Two rule sets exist. [`is_excluded_title`] is applied once while a raw
//! list is ingested and is deliberately positional so that titles such as
//! "Dlcorp Tycoon" survive. [`looks_non_primary`] is the looser query-time
//! fallback used only while an id has no resolved classification.

/// Substrings that exclude a title anywhere they appear.
const INGEST_CONTAINS: &[&str] = &[
    " dlc",
    " demo",
    "soundtrack",
    " ost",
    "pre-purchase",
    "pre purchase",
    "prepurchase",
    "season pass",
    " beta",
    " alpha",
    " editor",
    "benchmark",
    " dedicated server",
    "test server",
];

/// Prefixes that exclude a title.
const INGEST_PREFIXES: &[&str] = &["dlc "];

/// Suffixes that exclude a title.
const INGEST_SUFFIXES: &[&str] = &[" trailer", " teaser"];

/// Keywords for the query-time heuristic.
const HEURISTIC_KEYWORDS: &[&str] = &[
    "dlc",
    " demo",
    "soundtrack",
    " ost",
    "pre-purchase",
    "pre purchase",
    "prepurchase",
    "season pass",
    " beta",
    " alpha",
    " editor",
    "benchmark",
    " trailer",
    " teaser",
    " dedicated server",
    "test server",
];

/// Returns true if a title should be dropped while ingesting the raw list.
pub fn is_excluded_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    INGEST_CONTAINS.iter().any(|kw| lower.contains(kw))
        || INGEST_PREFIXES.iter().any(|p| lower.starts_with(p))
        || INGEST_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

/// Returns true if a title looks like a non-primary entry.
///
/// Only consulted when the classification of an id is unknown.
pub fn looks_non_primary(title: &str) -> bool {
    let lower = title.trim().to_lowercase();
    HEURISTIC_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[cfg(test)]
#[path = "tests/title_filter_tests.rs"]
mod tests;
