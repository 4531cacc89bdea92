//! Detection and neutralization of active manifest directives in the
//! per-id script files of the plugin directory.
//!
//! A script file belongs to an id when its extension is `lua` (any case) and
//! its file name contains the decimal id anywhere. A line is an active
//! directive when its first non-blank text is `setManifestid` (any case)
//! followed by optional blanks and `(`. Patching prefixes such lines with
//! `--`, which also makes them inactive for every later scan.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use appshelf_core::AppId;
use serde::Serialize;

const DIRECTIVE: &str = "setmanifestid";
const COMMENT: &str = "--";
const SCRIPT_EXTENSION: &str = "lua";

/// One script file and the active directives it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerFile {
    pub path: PathBuf,
    pub active_directives: usize,
}

/// Where an id stands with respect to patching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PatchState {
    /// No script files exist for the id.
    Absent,
    /// Script files exist and none has an active directive.
    UpToDate,
    /// At least one active directive remains.
    NeedsPatch { active_lines: usize, files: usize },
}

impl PatchState {
    /// Human-readable one-line status.
    pub fn status_line(&self, id: AppId) -> String {
        match self {
            Self::Absent => format!("No script files for {id}; nothing to patch"),
            Self::UpToDate => format!("{id} is up to date"),
            Self::NeedsPatch {
                active_lines,
                files,
            } => format!(
                "{id} needs patching: {active_lines} active line(s) in {files} file(s)"
            ),
        }
    }

    pub fn needs_patch(&self) -> bool {
        matches!(self, Self::NeedsPatch { .. })
    }
}

/// Result of [`scan`]. Derived fresh each time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub files: Vec<MarkerFile>,
    /// Files that matched but could not be read.
    pub errors: Vec<(PathBuf, String)>,
}

impl ScanReport {
    pub fn file_count(&self) -> usize {
        self.files.len() + self.errors.len()
    }

    pub fn active_directive_count(&self) -> usize {
        self.files.iter().map(|f| f.active_directives).sum()
    }

    /// Files that still have active directives.
    pub fn detail(&self) -> impl Iterator<Item = &MarkerFile> {
        self.files.iter().filter(|f| f.active_directives > 0)
    }

    pub fn state(&self) -> PatchState {
        let active_lines = self.active_directive_count();
        if self.file_count() == 0 {
            PatchState::Absent
        } else if active_lines == 0 {
            PatchState::UpToDate
        } else {
            PatchState::NeedsPatch {
                active_lines,
                files: self.detail().count(),
            }
        }
    }
}

/// Summary of an executed [`patch`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct PatchReport {
    /// Files that were rewritten.
    pub files_changed: usize,
    /// Directive lines neutralized across all files.
    pub lines_neutralized: usize,
    /// Files that could not be read or written, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

/// True if `line` is an active directive.
pub fn is_active_directive(line: &str) -> bool {
    let trimmed = line.trim_start();
    let Some(head) = trimmed.get(..DIRECTIVE.len()) else {
        return false;
    };
    if !head.eq_ignore_ascii_case(DIRECTIVE) {
        return false;
    }
    trimmed[DIRECTIVE.len()..].trim_start().starts_with('(')
}

fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(SCRIPT_EXTENSION))
        .unwrap_or(false)
}

/// Key used to recognize the same file reached through different spellings.
fn canonical_key(path: &Path) -> String {
    let resolved = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    resolved.to_string_lossy().to_lowercase()
}

/// Script files in `dir` whose name contains `id`, sorted by path.
///
/// A missing or unreadable directory yields no files.
pub fn find_marker_files(dir: &Path, id: AppId) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            log::debug!("Cannot list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };
    let needle = id.to_string();
    let mut seen = HashSet::new();
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_script(p))
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().contains(&needle))
                .unwrap_or(false)
        })
        .filter(|p| seen.insert(canonical_key(p)))
        .collect();
    files.sort();
    files
}

fn count_active(bytes: &[u8]) -> usize {
    String::from_utf8_lossy(bytes)
        .lines()
        .filter(|line| is_active_directive(line))
        .count()
}

/// Count active directives in every script file for `id`.
pub fn scan(dir: &Path, id: AppId) -> ScanReport {
    let mut report = ScanReport::default();
    for path in find_marker_files(dir, id) {
        match fs::read(&path) {
            Ok(bytes) => report.files.push(MarkerFile {
                active_directives: count_active(&bytes),
                path,
            }),
            Err(e) => {
                log::warn!("Cannot read {}: {}", path.display(), e);
                report.errors.push((path, e.to_string()));
            }
        }
    }
    report
}

/// Prefix every active directive line with `--`, keeping line endings and
/// all other bytes intact. Returns the new content and the number of lines
/// changed.
pub fn neutralize(bytes: &[u8]) -> (Vec<u8>, usize) {
    let mut out = Vec::with_capacity(bytes.len() + 16);
    let mut changed = 0;
    for line in bytes.split_inclusive(|b| *b == b'\n') {
        if is_active_directive(&String::from_utf8_lossy(line)) {
            out.extend_from_slice(COMMENT.as_bytes());
            changed += 1;
        }
        out.extend_from_slice(line);
    }
    (out, changed)
}

/// Neutralize one file in place. Files without active directives are not
/// rewritten. Returns the number of lines changed.
pub fn patch_file(path: &Path) -> io::Result<usize> {
    let bytes = fs::read(path)?;
    let (patched, changed) = neutralize(&bytes);
    if changed == 0 {
        return Ok(0);
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    fs::write(&tmp, &patched)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(changed)
}

/// Neutralize active directives in `candidates` plus every script file for
/// `id` in `dir`. Non-script candidates are ignored and each file is
/// handled once. Running it twice in a row changes nothing the second time.
pub fn patch(dir: &Path, id: AppId, candidates: &[PathBuf]) -> PatchReport {
    let mut seen = HashSet::new();
    let targets: Vec<PathBuf> = candidates
        .iter()
        .filter(|p| is_script(p))
        .cloned()
        .chain(find_marker_files(dir, id))
        .filter(|p| seen.insert(canonical_key(p)))
        .collect();

    let mut report = PatchReport::default();
    for path in targets {
        match patch_file(&path) {
            Ok(0) => {}
            Ok(lines) => {
                log::info!("Neutralized {} line(s) in {}", lines, path.display());
                report.files_changed += 1;
                report.lines_neutralized += lines;
            }
            Err(e) => {
                log::warn!("Failed to patch {}: {}", path.display(), e);
                report.failures.push((path, e.to_string()));
            }
        }
    }
    report
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
