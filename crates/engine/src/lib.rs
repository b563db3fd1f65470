// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! warden execution engine

pub mod branch_lock;
pub mod executor;
pub mod poller;
pub mod scheduler;
pub mod supervisor;
pub mod sync;
pub mod trees;

pub use branch_lock::BranchLocks;
pub use executor::{BatchError, BatchExecutor, ScriptPaths};
pub use poller::CalendarPoller;
pub use scheduler::{BatchRunner, BucketScheduler, BucketView};
pub use supervisor::{Supervisor, SupervisorDeps};
pub use sync::{SyncError, SyncWorker};
pub use trees::{TreeError, TreeKind, TreeManager};
