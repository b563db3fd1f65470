// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;

fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    (dir, path)
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("nope.yaml")).unwrap();

    assert_eq!(config, Config::default());
    assert_eq!(config.lookahead_hours, 24);
    assert_eq!(config.check_interval, 30);
    assert_eq!(config.event_delay, 5);
    assert_eq!(config.map_generation_hours, 22);
    assert!(config.servers.is_empty());
}

#[test]
fn parses_full_config() {
    let (_dir, path) = write_config(
        r#"
lookahead_hours: 48
check_interval: 60
event_delay: 0
map_generation_hours: 12
discord_webhook: "https://discord.example/webhook"
servers:
  - name: us-weekly
    path: /srv/fleet/us-weekly
    calendar_url: "https://calendar.example/us-weekly.ics"
    branch: staging
    wipe_blueprints: true
    generate_map: true
  - name: train
    path: /srv/fleet/train
    calendar_url: "https://calendar.example/train.ics"
"#,
    );

    let config = Config::load(&path).unwrap();
    assert_eq!(config.lookahead_hours, 48);
    assert_eq!(config.event_delay, 0);
    assert_eq!(config.servers.len(), 2);

    let us = &config.servers[0];
    assert_eq!(us.identity(), "us-weekly");
    assert_eq!(us.branch(), "staging");
    assert!(us.wipe_blueprints);

    let train = &config.servers[1];
    assert_eq!(train.branch, "");
    assert_eq!(train.branch(), "main");
    assert!(!train.wipe_blueprints);
    assert!(!train.generate_map);
}

#[test]
fn malformed_yaml_is_an_error() {
    let (_dir, path) = write_config("servers: [not: closed");
    assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
}

#[test]
fn branches_are_unique_and_normalised() {
    let server = |branch: &str| Server {
        name: "s".into(),
        path: PathBuf::from(format!("/srv/{}", branch)),
        calendar_url: String::new(),
        branch: branch.into(),
        wipe_blueprints: false,
        generate_map: false,
    };

    let config = Config {
        servers: vec![server(""), server("main"), server("staging")],
        ..Config::default()
    };

    let branches: Vec<_> = config.branches().into_iter().collect();
    assert_eq!(branches, vec!["main".to_string(), "staging".to_string()]);
}
