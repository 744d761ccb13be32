//! Location (client site) model
//!
//! A location is a fixed point where requests originate and terminate. Its
//! index doubles as the row/column into every cost matrix. The location also
//! carries the open-demand counter presentation collaborators display per
//! client.

use serde::{Deserialize, Serialize};

/// Planar position used for display interpolation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation towards `other` at `fraction` in `[0, 1]`
    ///
    /// # Example
    /// ```
    /// use fleet_dispatch_core_rs::models::location::Point;
    ///
    /// let a = Point::new(0.0, 0.0);
    /// let b = Point::new(10.0, -4.0);
    /// assert_eq!(a.lerp(b, 0.5), Point::new(5.0, -2.0));
    /// ```
    pub fn lerp(&self, other: Point, fraction: f64) -> Point {
        Point {
            x: self.x + (other.x - self.x) * fraction,
            y: self.y + (other.y - self.y) * fraction,
        }
    }
}

/// A client site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    /// Matrix index, equal to the position in the state's location list
    index: usize,
    name: String,
    position: Point,
    /// Requests created here that are not yet completed or abandoned
    open_demand: usize,
    /// `deadline - completion tick` for every request fulfilled from here
    fulfilled_margins: Vec<i64>,
}

impl Location {
    pub fn new(index: usize, name: impl Into<String>, position: Point) -> Self {
        Self {
            index,
            name: name.into(),
            position,
            open_demand: 0,
            fulfilled_margins: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn open_demand(&self) -> usize {
        self.open_demand
    }

    pub fn fulfilled_margins(&self) -> &[i64] {
        &self.fulfilled_margins
    }

    pub(crate) fn open_request(&mut self) {
        self.open_demand += 1;
    }

    /// Close one open request; `margin` is recorded when it was fulfilled
    pub(crate) fn close_request(&mut self, margin: Option<i64>) {
        debug_assert!(self.open_demand > 0, "open demand underflow at {}", self.name);
        self.open_demand = self.open_demand.saturating_sub(1);
        if let Some(margin) = margin {
            self.fulfilled_margins.push(margin);
        }
    }
}
