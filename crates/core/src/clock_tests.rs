// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

#[test]
fn fake_clock_advances() {
    let start = Utc.with_ymd_and_hms(2025, 11, 16, 18, 0, 0).unwrap();
    let clock = FakeClock::at(start);
    assert_eq!(clock.now_utc(), start);

    clock.advance(Duration::seconds(90));
    assert_eq!(clock.now_utc(), start + Duration::seconds(90));
}

#[test]
fn fake_clock_set_overrides() {
    let clock = FakeClock::new();
    let target = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    clock.set(target);
    assert_eq!(clock.now_utc(), target);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::at(Utc.with_ymd_and_hms(2025, 11, 16, 18, 0, 0).unwrap());
    let other = clock.clone();
    clock.advance(Duration::minutes(5));
    assert_eq!(other.now_utc(), clock.now_utc());
}

#[test]
fn system_clock_moves_forward() {
    let clock = SystemClock;
    let a = clock.now_utc();
    let b = clock.now_utc();
    assert!(b >= a);
}
