// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    map = { "*.map", "proc_map_4250.map", true },
    sav = { "*.sav*", "us-weekly.sav", true },
    savbak = { "*.sav*", "us-weekly.savbak", true },
    states = { "player.states.*.db*", "player.states.260.db", true },
    states_wal = { "player.states.*.db*", "player.states.260.db-wal", true },
    files_db = { "sv.files.*.db*", "sv.files.0.db-shm", true },
    blueprints = { "player.blueprints.*", "player.blueprints.5.db-wal", true },
    cfg_not_map = { "*.map", "server.cfg", false },
    prefix_only = { "player.states.*.db*", "player.blueprints.5.db", false },
    no_extension = { "*.sav*", "us-weekly", false },
)]
fn wipe_pattern_matching(pattern: &str, name: &str, expected: bool) {
    assert_eq!(matches(pattern, name), expected);
}

#[test]
fn star_matches_empty_run() {
    assert!(matches("a*b", "ab"));
    assert!(matches("*", ""));
}

#[test]
fn literal_match_is_exact() {
    assert!(matches("buildid", "buildid"));
    assert!(!matches("buildid", "buildid2"));
    assert!(!matches("buildid2", "buildid"));
}

#[test]
fn multiple_stars_backtrack() {
    assert!(matches("*.states.*.db*", "player.states.123.db-journal"));
    assert!(!matches("*.states.*.db*", "player.states.123.sav"));
}
