use std::time::{Duration, Instant};

use crate::limiter::WindowTracker;

fn tracker(second: u32, minute: u32, hour: u32) -> (WindowTracker, Instant) {
    let now = Instant::now();
    (WindowTracker::new([second, minute, hour], now), now)
}

#[test]
fn try_consume_stops_at_the_second_cap() {
    let (tracker, _) = tracker(3, 0, 0);

    assert!(tracker.try_consume());
    assert!(tracker.try_consume());
    assert!(tracker.try_consume());
    assert!(!tracker.try_consume());
}

#[test]
fn failed_consume_changes_nothing() {
    let (tracker, _) = tracker(1, 0, 0);

    assert!(tracker.try_consume());
    assert_eq!(tracker.leftover(), 0);

    assert!(!tracker.try_consume());
    assert_eq!(tracker.leftover(), 0);
}

#[test]
fn leftover_reports_the_tightest_window() {
    let (tracker, _) = tracker(5, 2, 0);
    assert_eq!(tracker.leftover(), 2);

    assert!(tracker.try_consume());
    assert_eq!(tracker.leftover(), 1);

    assert!(tracker.try_consume());
    assert_eq!(tracker.leftover(), 0);
}

#[test]
fn roll_resets_the_second_without_touching_the_minute() {
    let (tracker, start) = tracker(1, 2, 0);

    assert!(tracker.try_consume());
    assert!(!tracker.try_consume());

    assert!(tracker.roll(start + Duration::from_millis(1_100)));
    assert!(tracker.try_consume());

    // The second rolls again, but the minute budget is now spent; if the
    // second-window rollover had reset the minute too, this would succeed.
    assert!(tracker.roll(start + Duration::from_millis(2_200)));
    assert!(!tracker.try_consume());
}

#[test]
fn minute_rolls_after_its_own_duration() {
    let (tracker, start) = tracker(1, 1, 0);

    assert!(tracker.try_consume());
    assert!(tracker.roll(start + Duration::from_secs(2)));
    assert!(!tracker.try_consume());

    assert!(tracker.roll(start + Duration::from_secs(61)));
    assert!(tracker.try_consume());
}

#[test]
fn roll_is_a_noop_without_elapsed_time() {
    let (tracker, start) = tracker(2, 0, 0);

    assert!(!tracker.roll(start));
    assert!(!tracker.roll(start + Duration::from_millis(999)));
}

#[test]
fn second_epoch_advances_to_the_rolling_instant() {
    let (tracker, start) = tracker(1, 0, 0);
    assert_eq!(tracker.second_epoch(), start);

    let later = start + Duration::from_millis(1_050);
    assert!(tracker.roll(later));
    assert_eq!(tracker.second_epoch(), later);
}

#[test]
fn unconstrained_windows_are_ignored() {
    let (tracker, _) = tracker(2, 0, 0);

    assert!(tracker.try_consume());
    assert!(tracker.try_consume());
    assert!(!tracker.try_consume());
    assert_eq!(tracker.leftover(), 0);
}
