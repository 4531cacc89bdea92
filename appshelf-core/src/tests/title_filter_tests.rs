use super::*;

#[test]
fn ingest_drops_obvious_extras() {
    let dropped = [
        "Foo DLC",
        "DLC Pack One",
        "Bar Demo",
        "Game Soundtrack",
        "Game OST",
        "Game Pre-Purchase",
        "Game Season Pass",
        "Game Beta",
        "Game Alpha",
        "Level Editor",
        "GPU Benchmark",
        "Game Trailer",
        "Game Teaser",
        "Game Dedicated Server",
        "Game Test Server",
    ];
    for title in dropped {
        assert!(is_excluded_title(title), "expected '{title}' to be excluded");
    }
}

#[test]
fn ingest_keeps_primary_titles() {
    let kept = [
        "Half-Life",
        "Portal 2",
        "Dlcorp Tycoon",
        "Trailer Park Simulator",
        "Alphabet Soup",
        "Demolition Inc.",
    ];
    for title in kept {
        assert!(!is_excluded_title(title), "expected '{title}' to be kept");
    }
}

#[test]
fn ingest_trailer_only_as_suffix() {
    assert!(is_excluded_title("Launch Trailer"));
    assert!(!is_excluded_title("Trailer Park Simulator"));
}

#[test]
fn heuristic_is_looser_than_ingest() {
    // "dlc" anywhere and mid-title trailers count for the heuristic only
    assert!(!is_excluded_title("Dlcorp Tycoon"));
    assert!(looks_non_primary("Dlcorp Tycoon"));
    assert!(!is_excluded_title("Game Trailer 2"));
    assert!(looks_non_primary("Game Trailer 2"));
}

#[test]
fn heuristic_case_insensitive() {
    assert!(looks_non_primary("SUPER GAME SOUNDTRACK"));
    assert!(!looks_non_primary("Half-Life"));
}
