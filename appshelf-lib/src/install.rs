//! Locating the client install root and its plugin directory.

use std::path::{Path, PathBuf};

/// Subdirectory that marks a directory as an install root.
const ROOT_MARKER: &str = "steamapps";

/// Platform default install locations, in preference order.
fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if cfg!(windows) {
        for var in ["ProgramFiles(x86)", "ProgramFiles"] {
            if let Some(dir) = std::env::var_os(var) {
                candidates.push(PathBuf::from(dir).join("Steam"));
            }
        }
        candidates.push(PathBuf::from(r"C:\Program Files (x86)\Steam"));
        candidates.push(PathBuf::from(r"C:\Program Files\Steam"));
    }
    if let Some(home) = dirs::home_dir() {
        if cfg!(windows) {
            candidates.push(home.join("AppData").join("Local").join("Steam"));
            candidates.push(home.join("AppData").join("Roaming").join("Steam"));
        } else if cfg!(target_os = "macos") {
            candidates.push(home.join("Library/Application Support/Steam"));
        } else {
            candidates.push(home.join(".steam").join("steam"));
            candidates.push(home.join(".local/share/Steam"));
        }
    }
    candidates
}

/// First of `candidates` that contains the root marker directory.
pub fn first_install_root(candidates: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    candidates
        .into_iter()
        .find(|p| p.join(ROOT_MARKER).is_dir())
}

/// Find the install root, trying `override_root` before platform defaults.
pub fn find_install_root(override_root: Option<&Path>) -> Option<PathBuf> {
    let candidates = override_root
        .map(Path::to_path_buf)
        .into_iter()
        .chain(default_candidates());
    first_install_root(candidates)
}

/// The reconciliation directory under an install root.
pub fn plugin_dir(root: &Path) -> PathBuf {
    root.join("config").join("stplug-in")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_candidate_with_marker_wins() {
        let tmp = TempDir::new().unwrap();
        let bare = tmp.path().join("bare");
        let real = tmp.path().join("real");
        let also = tmp.path().join("also");
        std::fs::create_dir_all(&bare).unwrap();
        std::fs::create_dir_all(real.join("steamapps")).unwrap();
        std::fs::create_dir_all(also.join("steamapps")).unwrap();

        let found = first_install_root([tmp.path().join("missing"), bare, real.clone(), also]);
        assert_eq!(found, Some(real));
    }

    #[test]
    fn test_override_is_preferred() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("steamapps")).unwrap();
        assert_eq!(
            find_install_root(Some(tmp.path())),
            Some(tmp.path().to_path_buf())
        );
    }

    #[test]
    fn test_plugin_dir_layout() {
        assert_eq!(
            plugin_dir(Path::new("/steam")),
            Path::new("/steam").join("config").join("stplug-in")
        );
    }
}
