//! Travel Cost Tables
//!
//! Read-only lookups of distance, travel time, risk and emission between two
//! location indices. The tables are produced by an external pre-processing
//! step and injected into the orchestrator; the engine never computes routes.
//!
//! Aerial tables are keyed by `(mode, origin, destination)`. Ground tables add
//! the hour of day of the departure, since road travel times vary with traffic.
//!
//! A travel time of `-1` marks a hop that cannot be flown or driven in that
//! mode (for example no risk-averse corridor exists between two sites).

use crate::policy::DeliveryMode;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use thiserror::Error;

/// Travel-time sentinel marking an infeasible hop
pub const INFEASIBLE: i64 = -1;

/// Errors raised when a table does not match the location set
#[derive(Debug, Error, PartialEq)]
pub enum CostTableError {
    #[error("{table}: expected {expected} entries, found {actual}")]
    DimensionMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("{table}: hourly table has no matrices")]
    EmptyHourly { table: String },
}

/// One cell of a route matrix
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteCost {
    pub distance_km: f64,
    /// Travel time in whole minutes, or [`INFEASIBLE`]
    pub travel_minutes: i64,
    /// Expected injuries
    pub risk: f64,
    /// kg CO2
    pub emission_kg: f64,
}

impl RouteCost {
    pub fn new(distance_km: f64, travel_minutes: i64, risk: f64, emission_kg: f64) -> Self {
        Self {
            distance_km,
            travel_minutes,
            risk,
            emission_kg,
        }
    }

    pub fn infeasible() -> Self {
        Self {
            travel_minutes: INFEASIBLE,
            ..Self::default()
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.travel_minutes >= 0
    }
}

/// Dense `size × size` matrix of [`RouteCost`], row-major by origin
///
/// # Example
/// ```
/// use fleet_dispatch_core_rs::costs::{RouteCost, RouteMatrix};
///
/// let matrix = RouteMatrix::from_fn(2, |o, d| {
///     if o == d { RouteCost::default() } else { RouteCost::new(3.0, 6, 1e-7, 0.05) }
/// });
/// assert_eq!(matrix.lookup(0, 1).unwrap().travel_minutes, 6);
/// assert!(matrix.lookup(0, 5).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteMatrix {
    size: usize,
    entries: Vec<RouteCost>,
}

impl RouteMatrix {
    pub fn new(size: usize, entries: Vec<RouteCost>) -> Result<Self, CostTableError> {
        let matrix = Self { size, entries };
        matrix.validate("route matrix", size)?;
        Ok(matrix)
    }

    pub fn from_fn(size: usize, mut f: impl FnMut(usize, usize) -> RouteCost) -> Self {
        let mut entries = Vec::with_capacity(size * size);
        for origin in 0..size {
            for destination in 0..size {
                entries.push(f(origin, destination));
            }
        }
        Self { size, entries }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Raw cell, including infeasible ones
    pub fn entry(&self, origin: usize, destination: usize) -> Option<&RouteCost> {
        if origin >= self.size || destination >= self.size {
            return None;
        }
        self.entries.get(origin * self.size + destination)
    }

    /// Feasible cell only
    pub fn lookup(&self, origin: usize, destination: usize) -> Option<RouteCost> {
        self.entry(origin, destination)
            .copied()
            .filter(RouteCost::is_feasible)
    }

    /// Check the matrix covers exactly `locations` sites
    pub fn validate(&self, table: &str, locations: usize) -> Result<(), CostTableError> {
        if self.size != locations {
            return Err(CostTableError::DimensionMismatch {
                table: table.to_string(),
                expected: locations,
                actual: self.size,
            });
        }
        if self.entries.len() != locations * locations {
            return Err(CostTableError::DimensionMismatch {
                table: table.to_string(),
                expected: locations * locations,
                actual: self.entries.len(),
            });
        }
        Ok(())
    }
}

/// Route matrices indexed by hour of day
///
/// Fewer than 24 matrices is allowed: hours past the end reuse the last one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HourlyRouteMatrices(pub Vec<RouteMatrix>);

impl HourlyRouteMatrices {
    /// Same matrix for every hour
    pub fn constant(matrix: RouteMatrix) -> Self {
        Self(vec![matrix])
    }

    pub fn for_hour(&self, hour: usize) -> Option<&RouteMatrix> {
        let last = self.0.len().checked_sub(1)?;
        self.0.get(hour.min(last))
    }

    pub fn validate(&self, table: &str, locations: usize) -> Result<(), CostTableError> {
        if self.0.is_empty() {
            return Err(CostTableError::EmptyHourly {
                table: table.to_string(),
            });
        }
        for (hour, matrix) in self.0.iter().enumerate() {
            matrix.validate(&format!("{table}[{hour}]"), locations)?;
        }
        Ok(())
    }
}

/// A safe and a fast variant of some table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeTables<T> {
    pub safe: T,
    pub fast: T,
}

impl<T> ModeTables<T> {
    pub fn get(&self, mode: DeliveryMode) -> &T {
        match mode {
            DeliveryMode::Safe => &self.safe,
            DeliveryMode::Fast => &self.fast,
        }
    }
}

/// All injected cost tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostTables {
    pub aerial: ModeTables<RouteMatrix>,
    pub ground: ModeTables<HourlyRouteMatrices>,
}

impl CostTables {
    pub fn validate(&self, locations: usize) -> Result<(), CostTableError> {
        self.aerial.safe.validate("aerial.safe", locations)?;
        self.aerial.fast.validate("aerial.fast", locations)?;
        self.ground.safe.validate("ground.safe", locations)?;
        self.ground.fast.validate("ground.fast", locations)?;
        Ok(())
    }
}

/// Resource usage accrued by one leg, or summed over the legs of a bid
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LegCost {
    pub distance_km: f64,
    pub cost: f64,
    pub risk: f64,
    pub emission_kg: f64,
}

impl LegCost {
    /// Price a table cell for a vehicle with the given variable cost
    pub fn from_route(route: &RouteCost, cost_per_km: f64) -> Self {
        Self {
            distance_km: route.distance_km,
            cost: route.distance_km * cost_per_km,
            risk: route.risk,
            emission_kg: route.emission_kg,
        }
    }

    /// Even share carried by each of `n` requests
    pub fn split(&self, n: usize) -> Self {
        if n == 0 {
            return *self;
        }
        let n = n as f64;
        Self {
            distance_km: self.distance_km / n,
            cost: self.cost / n,
            risk: self.risk / n,
            emission_kg: self.emission_kg / n,
        }
    }
}

/// A priced hop as seen by one vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    /// Travel time in ticks, never below one
    pub travel_ticks: usize,
    pub cost: LegCost,
}

impl Quote {
    /// Price a feasible cell; `None` when the cell is infeasible
    ///
    /// # Example
    /// ```
    /// use fleet_dispatch_core_rs::costs::{Quote, RouteCost};
    ///
    /// let quote = Quote::price(&RouteCost::new(0.4, 0, 0.0, 0.01), 2.0).unwrap();
    /// assert_eq!(quote.travel_ticks, 1);
    /// assert_eq!(quote.cost.cost, 0.8);
    /// assert!(Quote::price(&RouteCost::infeasible(), 2.0).is_none());
    /// ```
    pub fn price(route: &RouteCost, cost_per_km: f64) -> Option<Self> {
        if !route.is_feasible() {
            return None;
        }
        Some(Self {
            travel_ticks: (route.travel_minutes as usize).max(1),
            cost: LegCost::from_route(route, cost_per_km),
        })
    }
}

impl AddAssign for LegCost {
    fn add_assign(&mut self, other: Self) {
        self.distance_km += other.distance_km;
        self.cost += other.cost;
        self.risk += other.risk;
        self.emission_kg += other.emission_kg;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(size: usize) -> RouteMatrix {
        RouteMatrix::from_fn(size, |o, d| {
            if o == d {
                RouteCost::default()
            } else {
                RouteCost::new((o + d) as f64, 10, 0.0, 0.0)
            }
        })
    }

    #[test]
    fn test_infeasible_cell_is_hidden_from_lookup() {
        let mut matrix = sample(2);
        matrix.entries[1] = RouteCost::infeasible();
        assert!(matrix.entry(0, 1).is_some());
        assert!(matrix.lookup(0, 1).is_none());
        assert!(matrix.lookup(1, 0).is_some());
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        let result = RouteMatrix::new(2, vec![RouteCost::default(); 3]);
        assert!(matches!(
            result,
            Err(CostTableError::DimensionMismatch { expected: 4, actual: 3, .. })
        ));
    }

    #[test]
    fn test_hourly_lookup_clamps_to_last_hour() {
        let hourly = HourlyRouteMatrices(vec![sample(2), sample(3)]);
        assert_eq!(hourly.for_hour(0).unwrap().size(), 2);
        assert_eq!(hourly.for_hour(17).unwrap().size(), 3);
        assert!(HourlyRouteMatrices(vec![]).for_hour(0).is_none());
    }

    #[test]
    fn test_leg_cost_split_evenly() {
        let cost = LegCost {
            distance_km: 8.0,
            cost: 2.0,
            risk: 4e-6,
            emission_kg: 1.0,
        };
        let share = cost.split(4);
        assert_eq!(share.cost, 0.5);
        assert_eq!(share.emission_kg, 0.25);
        assert_eq!(cost.split(0), cost);
    }
}
