// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for external I/O

pub mod calendar;
pub mod depot;
pub mod mirror;
pub mod notify;
pub mod script;

pub use calendar::{CalendarFetcher, FetchError, HttpCalendarFetcher};
pub use depot::{DepotError, GameDepot, ModDepot, ReleaseModDepot, SteamCmdDepot};
pub use mirror::{Mirror, MirrorError, RsyncMirror};
pub use notify::{DiscordNotifier, Notification, NotifyAdapter, NotifyLevel};
pub use script::{ScriptError, ScriptRunner, ShellScriptRunner};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use calendar::FakeCalendarFetcher;
#[cfg(any(test, feature = "test-support"))]
pub use depot::FakeDepot;
#[cfg(any(test, feature = "test-support"))]
pub use mirror::FakeMirror;
#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeNotifyAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use script::{FakeScriptRunner, ScriptCall};
