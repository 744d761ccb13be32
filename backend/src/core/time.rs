//! Time management for the simulation
//!
//! The simulation operates in discrete one-minute ticks. 1440 ticks form a day.
//! This module provides deterministic time advancement and the calendar
//! helpers (hour of day, rush-hour windows) that cost lookups and the delay
//! model depend on.

use serde::{Deserialize, Serialize};

/// Number of one-minute ticks in a simulated day
pub const MINUTES_PER_DAY: usize = 1440;

/// Last hour index available in hourly cost tables
const LAST_HOUR: usize = 23;

/// Half-open window `[start, end)` expressed in minutes of the day
///
/// # Example
/// ```
/// use fleet_dispatch_core_rs::core::time::TickWindow;
///
/// let morning = TickWindow::new(420, 540); // 07:00 - 09:00
/// assert!(morning.contains(420));
/// assert!(!morning.contains(540));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickWindow {
    pub start: usize,
    pub end: usize,
}

impl TickWindow {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Whether a minute-of-day falls inside the window
    pub fn contains(&self, minute_of_day: usize) -> bool {
        minute_of_day >= self.start && minute_of_day < self.end
    }
}

/// Manages simulation time in discrete ticks
///
/// # Example
/// ```
/// use fleet_dispatch_core_rs::TimeManager;
///
/// let mut time = TimeManager::new(1440);
/// assert_eq!(time.current_tick(), 0);
///
/// time.advance_tick();
/// assert_eq!(time.current_tick(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeManager {
    /// Total ticks elapsed since simulation start
    current_tick: usize,
    /// Number of ticks in one day
    ticks_per_day: usize,
}

impl TimeManager {
    /// Create a new TimeManager
    ///
    /// # Arguments
    /// * `ticks_per_day` - Number of ticks in one simulated day
    pub fn new(ticks_per_day: usize) -> Self {
        assert!(ticks_per_day > 0, "ticks_per_day must be positive");
        Self {
            current_tick: 0,
            ticks_per_day,
        }
    }

    /// Advance time by one tick
    pub fn advance_tick(&mut self) {
        self.current_tick += 1;
    }

    /// Get the current tick (total ticks since start)
    pub fn current_tick(&self) -> usize {
        self.current_tick
    }

    /// Get the current day (0-indexed)
    pub fn current_day(&self) -> usize {
        self.current_tick / self.ticks_per_day
    }

    /// Get the tick within the current day (0-indexed)
    ///
    /// # Example
    /// ```
    /// use fleet_dispatch_core_rs::TimeManager;
    ///
    /// let mut time = TimeManager::new(1440);
    /// for _ in 0..1450 {
    ///     time.advance_tick();
    /// }
    /// assert_eq!(time.tick_within_day(), 10);
    /// ```
    pub fn tick_within_day(&self) -> usize {
        self.current_tick % self.ticks_per_day
    }

    /// Get ticks per day
    pub fn ticks_per_day(&self) -> usize {
        self.ticks_per_day
    }
}

/// Hour of day used to index hourly cost tables
///
/// Ticks past the end of the first day stay on the last hour rather than
/// wrapping, so legs planned during the drain phase reuse late-evening tables.
///
/// # Example
/// ```
/// use fleet_dispatch_core_rs::core::time::hour_of_day;
///
/// assert_eq!(hour_of_day(0), 0);
/// assert_eq!(hour_of_day(125), 2);
/// assert_eq!(hour_of_day(3000), 23);
/// ```
pub fn hour_of_day(tick: usize) -> usize {
    (tick / 60).min(LAST_HOUR)
}

/// Whether a tick falls in any of the configured rush-hour windows
pub fn in_rush_hour(tick: usize, windows: &[TickWindow]) -> bool {
    let minute = tick % MINUTES_PER_DAY;
    windows.iter().any(|w| w.contains(minute))
}

/// Format a tick as a wall-clock `HH:MM` string
///
/// # Example
/// ```
/// use fleet_dispatch_core_rs::core::time::tick_to_clock_string;
///
/// assert_eq!(tick_to_clock_string(0), "00:00");
/// assert_eq!(tick_to_clock_string(605), "10:05");
/// assert_eq!(tick_to_clock_string(1450), "00:10");
/// ```
pub fn tick_to_clock_string(tick: usize) -> String {
    let minute = tick % MINUTES_PER_DAY;
    format!("{:02}:{:02}", minute / 60, minute % 60)
}
