// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_moves_forward() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}

#[test]
fn fake_clock_starts_fixed() {
    let clock = FakeClock::new();
    let a = clock.now();
    let b = clock.now();
    assert_eq!(a, b);
}

#[test]
fn fake_clock_advances_by_delta() {
    let clock = FakeClock::new();
    let before = clock.now();
    clock.advance(chrono::Duration::seconds(30));
    let after = clock.now();
    assert_eq!((after - before).num_seconds(), 30);
}

#[test]
fn fake_clock_set_is_absolute() {
    let clock = FakeClock::new();
    let target: DateTime<Utc> = "2030-06-15T12:00:00Z".parse().unwrap();
    clock.set(target);
    assert_eq!(clock.now(), target);
}

#[test]
fn fake_clock_shared_across_clones() {
    let clock = FakeClock::new();
    let clone = clock.clone();
    clock.advance(chrono::Duration::seconds(5));
    assert_eq!(clock.now(), clone.now());
}
