// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: paths, PID lock, script provisioning, wiring.

use fs2::FileExt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use wd_adapters::{
    DiscordNotifier, HttpCalendarFetcher, ReleaseModDepot, RsyncMirror, ShellScriptRunner,
    SteamCmdDepot,
};
use wd_core::{Config, ConfigError, SystemClock};
use wd_engine::{
    BatchExecutor, BranchLocks, BucketScheduler, CalendarPoller, ScriptPaths, Supervisor,
    SupervisorDeps, SyncWorker, TreeManager,
};

/// Steam app id of the dedicated game server
const GAME_APP_ID: &str = "258550";
const STEAMCMD_URL: &str =
    "https://steamcdn-a.akamaihd.net/client/installer/steamcmd_linux.tar.gz";

const MOD_FEED_URL: &str = "https://api.carbonmod.gg/meta/carbon/changelogs.json";
const MOD_MAIN_URL: &str =
    "https://github.com/CarbonCommunity/Carbon/releases/download/production_build/Carbon.Linux.Release.tar.gz";
const MOD_STAGING_URL: &str =
    "https://github.com/CarbonCommunity/Carbon/releases/download/rustbeta_staging_build/Carbon.Linux.Debug.tar.gz";
const MOD_EXTENSION_URL: &str =
    "https://github.com/k1lly0u/Oxide.Ext.RustEdit/raw/master/Oxide.Ext.RustEdit.dll";

/// Shared tree bases and the operator script directory
const GAME_TREE_BASE: &str = "/opt/rust";
const MOD_TREE_BASE: &str = "/opt/carbon";
const SCRIPT_DIR: &str = "/opt/warden";

/// Concrete adapter wiring for the production daemon
pub type DaemonExecutor = BatchExecutor<RsyncMirror, ShellScriptRunner, DiscordNotifier>;
pub type DaemonScheduler = BucketScheduler<DaemonExecutor, SystemClock>;
pub type DaemonSupervisor = Supervisor<
    HttpCalendarFetcher,
    ShellScriptRunner,
    DiscordNotifier,
    SystemClock,
    DaemonExecutor,
    SteamCmdDepot,
    ReleaseModDepot,
>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine home directory")]
    NoHome,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("io error at {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to acquire pid lock at {0}: daemon already running?")]
    LockFailed(PathBuf),
}

/// A started daemon: the supervisor plus handles for shutdown
pub struct Daemon {
    pub supervisor: DaemonSupervisor,
    pub scheduler: DaemonScheduler,
    // NOTE(lifetime): held to maintain the exclusive pid lock; released on drop
    #[allow(dead_code)]
    pid_lock: File,
    pub pid_path: PathBuf,
}

/// Default config location: `~/.config/warden/config.yaml`
pub fn default_config_path() -> Result<PathBuf, LifecycleError> {
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoHome)?;
    Ok(PathBuf::from(home).join(".config/warden/config.yaml"))
}

/// Build the daemon: load config, take the PID lock, provision scripts,
/// wire the components.
pub fn startup(config_path: &Path) -> Result<Daemon, LifecycleError> {
    let config = Config::load(config_path)?;

    let pid_path = config_path.with_file_name("wardend.pid");
    let pid_lock = acquire_pid_lock(&pid_path)?;

    let script_paths = ScriptPaths::under(Path::new(SCRIPT_DIR));
    if let Err(e) = ensure_scripts(&script_paths) {
        tracing::warn!(error = %e, "failed to provision lifecycle scripts");
    }

    let notify = DiscordNotifier::new(config.discord_webhook.clone()).with_mentions(
        config.discord_mention_users.clone(),
        config.discord_mention_roles.clone(),
    );
    let clock = SystemClock;
    let locks = Arc::new(BranchLocks::new());

    let game_depot = SteamCmdDepot::new(
        GAME_APP_ID,
        Path::new(GAME_TREE_BASE).join("steamcmd"),
        STEAMCMD_URL,
    );
    let mod_depot = ReleaseModDepot::new(MOD_FEED_URL, MOD_MAIN_URL, MOD_STAGING_URL)
        .with_extension(MOD_EXTENSION_URL);
    let trees = Arc::new(TreeManager::new(
        GAME_TREE_BASE,
        MOD_TREE_BASE,
        game_depot,
        mod_depot,
        notify.clone(),
        Arc::clone(&locks),
    ));

    let sync = SyncWorker::new(GAME_TREE_BASE, MOD_TREE_BASE, locks, RsyncMirror::new());
    let executor = BatchExecutor::new(
        sync,
        ShellScriptRunner::new(),
        notify.clone(),
        script_paths.clone(),
        std::time::Duration::from_secs(config.event_delay),
    );
    let scheduler = BucketScheduler::new(executor, clock.clone());

    let poller = CalendarPoller::new(
        HttpCalendarFetcher::new(),
        notify.clone(),
        clock.clone(),
        config.lookahead_hours,
    );

    let supervisor = Supervisor::new(
        config_path.to_path_buf(),
        config,
        SupervisorDeps {
            poller,
            scheduler: scheduler.clone(),
            trees,
            scripts: ShellScriptRunner::new(),
            script_paths,
            notify,
            clock,
        },
    );

    Ok(Daemon {
        supervisor,
        scheduler,
        pid_lock,
        pid_path,
    })
}

/// Take an exclusive flock on the PID file and record our pid in it
pub fn acquire_pid_lock(path: &Path) -> Result<File, LifecycleError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LifecycleError::Io(parent.to_path_buf(), e))?;
    }

    let file = File::create(path).map_err(|e| LifecycleError::Io(path.to_path_buf(), e))?;
    file.try_lock_exclusive()
        .map_err(|_| LifecycleError::LockFailed(path.to_path_buf()))?;

    use std::io::Write;
    let mut file = file;
    writeln!(file, "{}", std::process::id())
        .map_err(|e| LifecycleError::Io(path.to_path_buf(), e))?;

    Ok(file)
}

/// Remove the PID file on clean shutdown
pub fn remove_pid_file(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove pid file");
        }
    }
}

const STOP_SCRIPT_TEMPLATE: &str = r#"#!/bin/bash
# Stop Servers Script
#
# Called before updates and wipes with the affected server paths:
#   $@ - space-separated list of server paths
#
# Customize to match your server management approach, e.g.:
#   systemctl stop gs-$(basename "$SERVER_PATH")

for SERVER_PATH in "$@"; do
    echo "Stopping server: $(basename "$SERVER_PATH") (path: $SERVER_PATH)"
    # Add your stop logic here
done
"#;

const START_SCRIPT_TEMPLATE: &str = r#"#!/bin/bash
# Start Servers Script
#
# Called after updates and wipes with the affected server paths:
#   $@ - space-separated list of server paths

for SERVER_PATH in "$@"; do
    echo "Starting server: $(basename "$SERVER_PATH") (path: $SERVER_PATH)"
    # Add your start logic here
done
"#;

const HOOK_SCRIPT_TEMPLATE: &str = r#"#!/bin/bash
# Pre-start Hook Script
#
# Runs once after all servers are synced, before any are started:
#   $@ - space-separated list of server paths
#
# Useful for clearing caches, updating plugins, custom notifications.

echo "Pre-start hook executed for servers: $@"
"#;

const MAPS_SCRIPT_TEMPLATE: &str = r#"#!/bin/bash
# Generate Maps Script
#
# Called ahead of wipe events (see map_generation_hours) with the paths of
# servers that want a fresh map:
#   $@ - space-separated list of server paths
#
# Pick or generate a map and update each server's configuration before the
# wipe runs. Exit non-zero on failure.

for SERVER_PATH in "$@"; do
    echo "Preparing map for: $(basename "$SERVER_PATH")"
    # Add your map preparation logic here
done
"#;

/// Write commented template scripts for any that are missing
pub fn ensure_scripts(paths: &ScriptPaths) -> std::io::Result<()> {
    let scripts = [
        (&paths.stop, STOP_SCRIPT_TEMPLATE),
        (&paths.start, START_SCRIPT_TEMPLATE),
        (&paths.pre_start_hook, HOOK_SCRIPT_TEMPLATE),
        (&paths.generate_maps, MAPS_SCRIPT_TEMPLATE),
    ];

    for (path, template) in scripts {
        if path.exists() {
            continue;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, template)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
        }

        tracing::info!(path = %path.display(), "created template script");
    }

    Ok(())
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
