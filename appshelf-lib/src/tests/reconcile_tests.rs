use super::*;
use tempfile::TempDir;

fn id(raw: u32) -> AppId {
    AppId::new(raw).unwrap()
}

const SCRIPT: &str = concat!(
    "addappid(10)\n",
    "setManifestid(11, \"1\")\n",
    "  SETMANIFESTID (12, \"2\")\r\n",
    "--setManifestid(13, \"3\")\n",
    "setManifestid(14, \"4\")",
);

#[test]
fn test_directive_detection() {
    assert!(is_active_directive("setManifestid(1)"));
    assert!(is_active_directive("   setmanifestid  (1)"));
    assert!(is_active_directive("\tSETMANIFESTID(1)"));
    assert!(!is_active_directive("--setManifestid(1)"));
    assert!(!is_active_directive("  -- setManifestid(1)"));
    assert!(!is_active_directive("setManifestidx(1)"));
    assert!(!is_active_directive("setManifestid"));
    assert!(!is_active_directive("addappid(1)"));
    assert!(!is_active_directive(""));
}

#[test]
fn test_neutralize_keeps_line_endings() {
    let (out, changed) = neutralize(SCRIPT.as_bytes());
    assert_eq!(changed, 3);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        concat!(
            "addappid(10)\n",
            "--setManifestid(11, \"1\")\n",
            "--  SETMANIFESTID (12, \"2\")\r\n",
            "--setManifestid(13, \"3\")\n",
            "--setManifestid(14, \"4\")",
        )
    );
}

#[test]
fn test_missing_directory_is_absent() {
    let tmp = TempDir::new().unwrap();
    let report = scan(&tmp.path().join("nope"), id(10));
    assert_eq!(report.file_count(), 0);
    assert_eq!(report.state(), PatchState::Absent);
}

#[test]
fn test_marker_files_match_by_substring_and_extension() {
    let tmp = TempDir::new().unwrap();
    for name in ["10.lua", "pack_10_extra.LUA", "10.txt", "20.lua", "110.lua"] {
        fs::write(tmp.path().join(name), "").unwrap();
    }
    fs::create_dir(tmp.path().join("10.lua.d")).unwrap();

    let names: Vec<String> = find_marker_files(tmp.path(), id(10))
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["10.lua", "110.lua", "pack_10_extra.LUA"]);
}

#[test]
fn test_scan_states() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("10.lua"), "--setManifestid(1)\n").unwrap();
    let report = scan(tmp.path(), id(10));
    assert_eq!(report.state(), PatchState::UpToDate);

    fs::write(tmp.path().join("10_b.lua"), SCRIPT).unwrap();
    let report = scan(tmp.path(), id(10));
    assert_eq!(report.file_count(), 2);
    assert_eq!(report.active_directive_count(), 3);
    assert_eq!(
        report.state(),
        PatchState::NeedsPatch {
            active_lines: 3,
            files: 1
        }
    );
    assert!(report.state().status_line(id(10)).contains("3 active line(s)"));
}

#[test]
fn test_patch_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let script = "setManifestid(1)\nsetManifestid(2)\nsetManifestid(3)\n";
    fs::write(tmp.path().join("10.lua"), script).unwrap();
    assert_eq!(scan(tmp.path(), id(10)).active_directive_count(), 3);

    let first = patch(tmp.path(), id(10), &[]);
    assert_eq!(first.files_changed, 1);
    assert_eq!(first.lines_neutralized, 3);
    assert_eq!(scan(tmp.path(), id(10)).active_directive_count(), 0);

    let second = patch(tmp.path(), id(10), &[]);
    assert_eq!(second.files_changed, 0);
    assert_eq!(second.lines_neutralized, 0);
    assert!(second.failures.is_empty());
}

#[test]
fn test_unchanged_file_is_not_rewritten() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("10.lua");
    fs::write(&path, "addappid(10)\n").unwrap();
    let before = fs::metadata(&path).unwrap().modified().unwrap();

    let report = patch(tmp.path(), id(10), &[]);
    assert_eq!(report.files_changed, 0);
    assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), before);
    assert!(!tmp.path().join("10.lua.tmp").exists());
}

#[test]
fn test_candidates_are_merged_and_filtered() {
    let tmp = TempDir::new().unwrap();
    let plugin = tmp.path().join("plugin");
    fs::create_dir(&plugin).unwrap();
    fs::write(plugin.join("10.lua"), "setManifestid(1)\n").unwrap();

    let moved = tmp.path().join("moved.lua");
    fs::write(&moved, "setManifestid(2)\n").unwrap();
    let notes = tmp.path().join("notes.txt");
    fs::write(&notes, "setManifestid(3)\n").unwrap();

    let report = patch(
        &plugin,
        id(10),
        &[moved.clone(), plugin.join("10.lua"), notes.clone()],
    );
    assert_eq!(report.files_changed, 2);
    assert_eq!(fs::read_to_string(&moved).unwrap(), "--setManifestid(2)\n");
    assert_eq!(fs::read_to_string(&notes).unwrap(), "setManifestid(3)\n");
}

#[test]
fn test_missing_candidate_is_reported() {
    let tmp = TempDir::new().unwrap();
    let report = patch(tmp.path(), id(10), &[tmp.path().join("gone.lua")]);
    assert_eq!(report.files_changed, 0);
    assert_eq!(report.failures.len(), 1);
}
