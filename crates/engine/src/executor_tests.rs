// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::branch_lock::BranchLocks;
use std::sync::Arc;
use wd_adapters::notify::NotifyLevel;
use wd_adapters::{FakeMirror, FakeNotifyAdapter, FakeScriptRunner};
use wd_core::CalendarEvent;

struct Fixture {
    dir: tempfile::TempDir,
    executor: BatchExecutor<FakeMirror, FakeScriptRunner, FakeNotifyAdapter>,
    mirror: FakeMirror,
    scripts: FakeScriptRunner,
    notify: FakeNotifyAdapter,
    paths: ScriptPaths,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let mirror = FakeMirror::new();
    let scripts = FakeScriptRunner::new();
    let notify = FakeNotifyAdapter::new();
    let paths = ScriptPaths::under(&dir.path().join("scripts"));
    let sync = SyncWorker::new(
        dir.path().join("game"),
        dir.path().join("mods"),
        Arc::new(BranchLocks::new()),
        mirror.clone(),
    );
    let executor = BatchExecutor::new(
        sync,
        scripts.clone(),
        notify.clone(),
        paths.clone(),
        Duration::ZERO,
    );
    Fixture {
        dir,
        executor,
        mirror,
        scripts,
        notify,
        paths,
    }
}

impl Fixture {
    fn server(&self, name: &str, wipe_blueprints: bool) -> Server {
        Server {
            name: name.to_string(),
            path: self.dir.path().join("servers").join(name),
            calendar_url: String::new(),
            branch: String::new(),
            wipe_blueprints,
            generate_map: false,
        }
    }

    fn scheduled(&self, name: &str, kind: EventKind) -> ScheduledEvent {
        self.scheduled_for(self.server(name, false), kind)
    }

    fn scheduled_for(&self, server: Server, kind: EventKind) -> ScheduledEvent {
        let start = chrono::Utc::now() + chrono::Duration::minutes(1);
        ScheduledEvent::new(
            server,
            CalendarEvent {
                kind,
                start,
                end: start + chrono::Duration::hours(1),
                summary: kind.to_string(),
            },
        )
    }

    /// Create the identity data directory with a set of files
    fn seed_data_dir(&self, server: &Server, files: &[&str]) {
        let data_dir = server.path.join("server").join(server.identity());
        std::fs::create_dir_all(&data_dir).unwrap();
        for file in files {
            std::fs::write(data_dir.join(file), b"x").unwrap();
        }
    }

    fn data_files(&self, server: &Server) -> Vec<String> {
        let data_dir = server.path.join("server").join(server.identity());
        let mut names: Vec<String> = std::fs::read_dir(data_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

const STATE_FILES: &[&str] = &[
    "proc_map_4250.map",
    "us-weekly.sav",
    "us-weekly.savbak",
    "player.states.260.db",
    "player.states.260.db-wal",
    "sv.files.0.db",
    "player.blueprints.5.db",
    "player.blueprints.5.db-wal",
    "server.cfg",
    "users.cfg",
];

#[tokio::test]
async fn batch_runs_all_five_steps_in_order() {
    let f = fixture();
    let events = vec![
        f.scheduled("us-weekly", EventKind::Restart),
        f.scheduled("us-long", EventKind::Restart),
        f.scheduled("us-build", EventKind::Wipe),
        f.scheduled("train", EventKind::Wipe),
    ];
    let expected_paths: Vec<String> = events
        .iter()
        .map(|e| e.server.path.display().to_string())
        .collect();

    f.executor.execute_batch(events).await.unwrap();

    // Scripts: stop, hook, start, once each, with all four paths in order
    let calls = f.scripts.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].script, f.paths.stop);
    assert_eq!(calls[0].args, expected_paths);
    assert_eq!(calls[1].script, f.paths.pre_start_hook);
    assert_eq!(calls[1].args, expected_paths);
    assert_eq!(calls[2].script, f.paths.start);
    assert_eq!(calls[2].args, expected_paths);

    // Sync mirrored both trees for every server
    assert_eq!(f.mirror.calls().len(), 8);

    // Notifications: starting + complete
    let titles = f.notify.titles();
    assert_eq!(
        titles,
        vec!["Batch Event Starting".to_string(), "Batch Event Complete".to_string()]
    );
    let starting = &f.notify.sent()[0];
    assert!(starting.description.contains("**4** server(s)"));
    assert!(starting.description.contains("**2 restart(s), 2 wipe(s)**"));
}

#[tokio::test]
async fn stop_failure_aborts_before_any_sync() {
    let f = fixture();
    f.scripts.fail_for(f.paths.stop.clone());

    let result = f
        .executor
        .execute_batch(vec![f.scheduled("us-weekly", EventKind::Restart)])
        .await;

    assert!(matches!(result, Err(BatchError::Stop(_))));
    assert!(f.mirror.calls().is_empty());
    assert_eq!(f.scripts.calls().len(), 1);

    let errors = f.notify.at_level(NotifyLevel::Error);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].title, "Batch Event Failed");
    assert!(errors[0].description.starts_with("Failed to stop servers"));
}

#[tokio::test]
async fn sync_failure_aborts_before_start() {
    let f = fixture();
    f.mirror.fail_for(f.dir.path().join("game").join("main"));

    let result = f
        .executor
        .execute_batch(vec![f.scheduled("us-weekly", EventKind::Restart)])
        .await;

    assert!(matches!(result, Err(BatchError::Sync(_))));
    // Only the stop script ran
    assert_eq!(f.scripts.calls().len(), 1);
    assert_eq!(f.scripts.calls()[0].script, f.paths.stop);
}

#[tokio::test]
async fn hook_failure_is_not_fatal() {
    let f = fixture();
    f.scripts.fail_for(f.paths.pre_start_hook.clone());

    f.executor
        .execute_batch(vec![f.scheduled("us-weekly", EventKind::Restart)])
        .await
        .unwrap();

    let calls = f.scripts.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2].script, f.paths.start);
    assert!(f.notify.titles().contains(&"Batch Event Complete".to_string()));
}

#[tokio::test]
async fn start_failure_aborts_with_error_notification() {
    let f = fixture();
    f.scripts.fail_for(f.paths.start.clone());

    let result = f
        .executor
        .execute_batch(vec![f.scheduled("us-weekly", EventKind::Restart)])
        .await;

    assert!(matches!(result, Err(BatchError::Start(_))));
    let errors = f.notify.at_level(NotifyLevel::Error);
    assert!(errors[0].description.starts_with("Failed to start servers"));
    assert!(!f.notify.titles().contains(&"Batch Event Complete".to_string()));
}

#[tokio::test]
async fn wipe_deletes_state_files_only_for_wipe_servers() {
    let f = fixture();
    let wiped = f.server("us-build", false);
    let restarted = f.server("us-weekly", false);
    f.seed_data_dir(&wiped, STATE_FILES);
    f.seed_data_dir(&restarted, STATE_FILES);

    f.executor
        .execute_batch(vec![
            f.scheduled_for(restarted.clone(), EventKind::Restart),
            f.scheduled_for(wiped.clone(), EventKind::Wipe),
        ])
        .await
        .unwrap();

    // Blueprints survive without wipe_blueprints; config always survives
    assert_eq!(
        f.data_files(&wiped),
        vec![
            "player.blueprints.5.db".to_string(),
            "player.blueprints.5.db-wal".to_string(),
            "server.cfg".to_string(),
            "users.cfg".to_string(),
        ]
    );

    // The restart server is untouched
    assert_eq!(f.data_files(&restarted).len(), STATE_FILES.len());
}

#[tokio::test]
async fn wipe_includes_blueprints_when_configured() {
    let f = fixture();
    let server = f.server("us-build", true);
    f.seed_data_dir(&server, STATE_FILES);

    f.executor
        .execute_batch(vec![f.scheduled_for(server.clone(), EventKind::Wipe)])
        .await
        .unwrap();

    assert_eq!(
        f.data_files(&server),
        vec!["server.cfg".to_string(), "users.cfg".to_string()]
    );
}

#[tokio::test]
async fn wipe_with_missing_data_directory_is_not_an_error() {
    let f = fixture();
    f.executor
        .execute_batch(vec![f.scheduled("us-build", EventKind::Wipe)])
        .await
        .unwrap();
    assert!(f.notify.titles().contains(&"Batch Event Complete".to_string()));
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let f = fixture();
    f.executor.execute_batch(vec![]).await.unwrap();
    assert!(f.scripts.calls().is_empty());
    assert!(f.notify.sent().is_empty());
}
