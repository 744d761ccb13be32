//! Tests for bid scoring and per-vehicle bid construction

use fleet_dispatch_core_rs::auction::{rank_bids, score, AuctionContext, Bid, LATE_PENALTY};
use fleet_dispatch_core_rs::costs::{
    CostTables, HourlyRouteMatrices, LegCost, ModeTables, RouteCost, RouteMatrix,
};
use fleet_dispatch_core_rs::models::request::{Request, RequestId, Urgency};
use fleet_dispatch_core_rs::models::vehicle::{
    capability_for, Vehicle, VehicleClass, VehicleId, VehicleProfile,
};
use fleet_dispatch_core_rs::policy::{DecisionWeights, DeliveryMode, DeliveryPolicy};
use proptest::prelude::*;

// ============================================================================
// Fixtures
// ============================================================================

fn uniform(n: usize, minutes: i64, km: f64, risk: f64, emission: f64) -> RouteMatrix {
    RouteMatrix::from_fn(n, |o, d| {
        if o == d {
            RouteCost::default()
        } else {
            RouteCost::new(km, minutes, risk, emission)
        }
    })
}

/// Aerial safe: 20 min, low risk. Aerial fast: 10 min, higher risk.
/// Ground: 15 min in hour 0, 30 min from hour 1 on.
fn tables() -> CostTables {
    let ground = HourlyRouteMatrices(vec![
        uniform(3, 15, 12.0, 2e-6, 2.0),
        uniform(3, 30, 12.0, 2e-6, 2.0),
    ]);
    CostTables {
        aerial: ModeTables {
            safe: uniform(3, 20, 10.0, 1e-7, 0.1),
            fast: uniform(3, 10, 8.0, 5e-7, 0.2),
        },
        ground: ModeTables {
            safe: ground.clone(),
            fast: ground,
        },
    }
}

fn drone(location: usize) -> Vehicle {
    Vehicle::new(
        VehicleId(0),
        capability_for(VehicleClass::Aerial, VehicleProfile::aerial_default()),
        location,
    )
}

fn car(location: usize) -> Vehicle {
    Vehicle::new(
        VehicleId(1),
        capability_for(VehicleClass::Ground, VehicleProfile::ground_default()),
        location,
    )
}

fn request(origin: usize, destination: usize, created: usize, deadline: usize) -> Request {
    Request::new(
        RequestId(1),
        origin,
        destination,
        created,
        deadline,
        Urgency::Urgent,
        1.0,
        1.0,
    )
    .unwrap()
}

fn ctx(tables: &CostTables, policy: DeliveryPolicy, now: usize) -> AuctionContext<'_> {
    AuctionContext {
        tables,
        policy,
        weights: DecisionWeights::default(),
        now,
    }
}

fn bid(vehicle: usize, score: f64) -> Bid {
    Bid {
        vehicle: VehicleId(vehicle),
        request: RequestId(1),
        mode: DeliveryMode::Safe,
        eta: 10,
        delivery_time: 10,
        totals: LegCost::default(),
        legs: vec![],
        score,
    }
}

// ============================================================================
// Scoring
// ============================================================================

#[test]
fn test_late_penalty_only_past_deadline() {
    let totals = LegCost::default();
    let w = DecisionWeights::default();
    assert_eq!(score(60, 60, &totals, 30, &w, DeliveryPolicy::Fast), 30.0);
    assert_eq!(
        score(61, 60, &totals, 31, &w, DeliveryPolicy::Fast),
        LATE_PENALTY + 31.0
    );
}

#[test]
fn test_safe_policy_scores_risk_only() {
    let totals = LegCost {
        distance_km: 5.0,
        cost: 9.0,
        risk: 3e-6,
        emission_kg: 4.0,
    };
    let w = DecisionWeights::default();
    assert_eq!(score(10, 60, &totals, 10, &w, DeliveryPolicy::Safe), 3e-6);
    assert_eq!(score(50, 60, &totals, 50, &w, DeliveryPolicy::Safe), 3e-6);
}

#[test]
fn test_combi_weights_each_kpi() {
    let totals = LegCost {
        distance_km: 5.0,
        cost: 4.0,
        risk: 2e-6,
        emission_kg: 3.0,
    };
    let w = DecisionWeights {
        risk: 1.0,
        emission: 2.0,
        delivery_time: 0.5,
        cost: 0.25,
    };
    let s = score(20, 60, &totals, 20, &w, DeliveryPolicy::Combi);
    // 2 (risk × 10^6) + 6 (emission) + 10 (time) + 1 (cost)
    assert!((s - 19.0).abs() < 1e-9);
}

#[test]
fn test_rank_bids_is_stable_on_ties() {
    let mut bids = vec![bid(0, 5.0), bid(1, 2.0), bid(2, 5.0), bid(3, 2.0)];
    rank_bids(&mut bids);
    let order: Vec<usize> = bids.iter().map(|b| b.vehicle.0).collect();
    assert_eq!(order, vec![1, 3, 0, 2]);
}

proptest! {
    #[test]
    fn prop_combi_score_monotone_in_delivery_time(
        dt in 0usize..2000,
        extra in 1usize..500,
        w_time in 0.01f64..10.0,
        risk in 0.0f64..1e-5,
        emission in 0.0f64..10.0,
    ) {
        let totals = LegCost { distance_km: 1.0, cost: 1.0, risk, emission_kg: emission };
        let w = DecisionWeights { delivery_time: w_time, ..DecisionWeights::default() };
        let fast = score(dt, 10_000, &totals, dt, &w, DeliveryPolicy::Combi);
        let slow = score(dt + extra, 10_000, &totals, dt + extra, &w, DeliveryPolicy::Combi);
        prop_assert!(slow > fast);
    }

    #[test]
    fn prop_combi_score_monotone_in_risk_and_emission(
        risk in 0.0f64..1e-5,
        d_risk in 1e-8f64..1e-5,
        emission in 0.0f64..10.0,
        d_emission in 0.0f64..10.0,
    ) {
        let w = DecisionWeights::default();
        let low = LegCost { distance_km: 0.0, cost: 0.0, risk, emission_kg: emission };
        let high = LegCost { risk: risk + d_risk, emission_kg: emission + d_emission, ..low };
        prop_assert!(
            score(5, 10, &high, 5, &w, DeliveryPolicy::Combi)
                > score(5, 10, &low, 5, &w, DeliveryPolicy::Combi)
        );
    }

    #[test]
    fn prop_late_bid_never_beats_on_time_bid(dt in 0usize..1000, late_dt in 0usize..1000) {
        let w = DecisionWeights::default();
        let totals = LegCost::default();
        let on_time = score(100, 100, &totals, dt, &w, DeliveryPolicy::Fast);
        let late = score(101, 100, &totals, late_dt, &w, DeliveryPolicy::Fast);
        prop_assert!(late > on_time);
    }
}

// ============================================================================
// Bid construction
// ============================================================================

#[test]
fn test_policy_selects_mode() {
    let tables = tables();
    let vehicle = drone(0);
    let req = request(0, 1, 0, 120);

    let safe = vehicle.propose(&req, &ctx(&tables, DeliveryPolicy::Safe, 0)).unwrap();
    assert_eq!(safe.mode, DeliveryMode::Safe);
    assert_eq!(safe.eta, 25);

    let fast = vehicle.propose(&req, &ctx(&tables, DeliveryPolicy::Fast, 0)).unwrap();
    assert_eq!(fast.mode, DeliveryMode::Fast);
    assert_eq!(fast.eta, 15);
    assert_eq!(fast.delivery_time, 15);
}

#[test]
fn test_combi_picks_lower_composite_score() {
    let tables = tables();
    let vehicle = drone(0);
    let req = request(0, 1, 0, 120);

    // fast: 0.5 + 0.2 + 15 beats safe: 0.1 + 0.1 + 25
    let bid = vehicle.propose(&req, &ctx(&tables, DeliveryPolicy::Combi, 0)).unwrap();
    assert_eq!(bid.mode, DeliveryMode::Fast);

    // Without the time term the lower-risk safe plan wins
    let mut risk_only = ctx(&tables, DeliveryPolicy::Combi, 0);
    risk_only.weights = DecisionWeights {
        risk: 1.0,
        emission: 1.0,
        delivery_time: 0.0,
        cost: 0.0,
    };
    let bid = vehicle.propose(&req, &risk_only).unwrap();
    assert_eq!(bid.mode, DeliveryMode::Safe);
}

#[test]
fn test_positioning_leg_precedes_delivery() {
    let tables = tables();
    let vehicle = drone(2);
    let req = request(0, 1, 0, 120);

    let bid = vehicle.propose(&req, &ctx(&tables, DeliveryPolicy::Fast, 0)).unwrap();
    assert_eq!(bid.legs.len(), 2);

    let positioning = &bid.legs[0];
    assert_eq!((positioning.origin, positioning.destination), (2, 0));
    assert_eq!((positioning.departure, positioning.arrival), (5, 15));
    assert!(!positioning.carries_request);

    let delivery = &bid.legs[1];
    assert_eq!((delivery.origin, delivery.destination), (0, 1));
    // Positioning arrival plus turnaround
    assert_eq!(delivery.departure, 20);
    assert_eq!(bid.eta, 30);
    assert!((bid.totals.distance_km - 16.0).abs() < 1e-9);
}

#[test]
fn test_infeasible_mode_skipped() {
    let mut tables = tables();
    tables.aerial.fast = RouteMatrix::from_fn(3, |o, d| {
        if o == d {
            RouteCost::default()
        } else {
            RouteCost::infeasible()
        }
    });
    let vehicle = drone(0);
    let req = request(0, 1, 0, 120);

    let bid = vehicle.propose(&req, &ctx(&tables, DeliveryPolicy::Combi, 0)).unwrap();
    assert_eq!(bid.mode, DeliveryMode::Safe);
    assert!(vehicle.propose(&req, &ctx(&tables, DeliveryPolicy::Fast, 0)).is_none());
}

#[test]
fn test_ground_uses_departure_hour_table() {
    let tables = tables();
    let vehicle = car(0);

    let early = vehicle
        .propose(&request(0, 1, 0, 200), &ctx(&tables, DeliveryPolicy::Safe, 0))
        .unwrap();
    // departs 3 (hour 0): 15 minutes
    assert_eq!(early.eta, 18);

    let later = vehicle
        .propose(&request(0, 1, 57, 200), &ctx(&tables, DeliveryPolicy::Safe, 57))
        .unwrap();
    // departs 60 (hour 1): 30 minutes
    assert_eq!(later.eta, 90);
    assert_eq!(later.delivery_time, 33);
}

#[test]
fn test_zero_minute_hop_takes_one_tick() {
    let mut tables = tables();
    tables.aerial.safe = uniform(3, 0, 0.5, 0.0, 0.0);
    let bid = drone(0)
        .propose(&request(0, 1, 0, 60), &ctx(&tables, DeliveryPolicy::Safe, 0))
        .unwrap();
    assert_eq!(bid.eta, 6);
    assert_eq!(bid.legs[0].arrival - bid.legs[0].departure, 1);
}

#[test]
fn test_proposal_leaves_vehicle_untouched() {
    let tables = tables();
    let vehicle = drone(2);
    let before = format!("{:?}", vehicle);
    let _ = vehicle.propose(&request(0, 1, 0, 120), &ctx(&tables, DeliveryPolicy::Combi, 0));
    assert_eq!(format!("{:?}", vehicle), before);
    assert!(vehicle.itinerary().is_empty());
}
