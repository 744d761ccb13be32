//! Tests for the simulation clock and time-of-day helpers

use fleet_dispatch_core_rs::core::time::{
    hour_of_day, in_rush_hour, tick_to_clock_string, TickWindow, MINUTES_PER_DAY,
};
use fleet_dispatch_core_rs::TimeManager;

#[test]
fn test_time_manager_new() {
    let time = TimeManager::new(MINUTES_PER_DAY);
    assert_eq!(time.current_tick(), 0);
    assert_eq!(time.current_day(), 0);
    assert_eq!(time.ticks_per_day(), 1440);
}

#[test]
fn test_advance_tick() {
    let mut time = TimeManager::new(MINUTES_PER_DAY);

    time.advance_tick();
    assert_eq!(time.current_tick(), 1);

    time.advance_tick();
    assert_eq!(time.current_tick(), 2);
    assert_eq!(time.current_day(), 0);
}

#[test]
fn test_day_boundary() {
    let mut time = TimeManager::new(MINUTES_PER_DAY);
    for _ in 0..1439 {
        time.advance_tick();
    }
    assert_eq!(time.current_day(), 0);
    assert_eq!(time.tick_within_day(), 1439);

    time.advance_tick();
    assert_eq!(time.current_tick(), 1440);
    assert_eq!(time.current_day(), 1);
    assert_eq!(time.tick_within_day(), 0);
}

#[test]
fn test_hour_of_day_clamps_to_last_hour() {
    assert_eq!(hour_of_day(59), 0);
    assert_eq!(hour_of_day(60), 1);
    assert_eq!(hour_of_day(1439), 23);
    // Drain phase past midnight keeps the late-evening tables
    assert_eq!(hour_of_day(1500), 23);
}

#[test]
fn test_rush_hour_windows() {
    let windows = [TickWindow::new(420, 540), TickWindow::new(960, 1080)];

    assert!(!in_rush_hour(419, &windows));
    assert!(in_rush_hour(420, &windows));
    assert!(in_rush_hour(1000, &windows));
    assert!(!in_rush_hour(1200, &windows));
    // Minute of day wraps on the second day
    assert!(in_rush_hour(1440 + 450, &windows));
    assert!(!in_rush_hour(500, &[]));
}

#[test]
fn test_clock_string() {
    assert_eq!(tick_to_clock_string(0), "00:00");
    assert_eq!(tick_to_clock_string(59), "00:59");
    assert_eq!(tick_to_clock_string(1439), "23:59");
    assert_eq!(tick_to_clock_string(1440 + 61), "01:01");
}
