//! Tests for the vehicle state machine, driven through the orchestrator

use fleet_dispatch_core_rs::arrivals::DemandEntry;
use fleet_dispatch_core_rs::core::time::TickWindow;
use fleet_dispatch_core_rs::costs::{
    CostTables, HourlyRouteMatrices, ModeTables, RouteCost, RouteMatrix,
};
use fleet_dispatch_core_rs::delay::DelayConfig;
use fleet_dispatch_core_rs::models::location::Point;
use fleet_dispatch_core_rs::models::request::Urgency;
use fleet_dispatch_core_rs::models::vehicle::{DelayFractions, VehicleStatus};
use fleet_dispatch_core_rs::orchestrator::{FleetConfig, LocationConfig};
use fleet_dispatch_core_rs::{
    Event, Orchestrator, OrchestratorConfig, VehicleClass, VehicleId, VehicleProfile,
};

fn tables(minutes: i64) -> CostTables {
    let matrix = RouteMatrix::from_fn(3, |o, d| {
        if o == d {
            RouteCost::default()
        } else {
            RouteCost::new(10.0, minutes, 1e-7, 1.0)
        }
    });
    CostTables {
        aerial: ModeTables {
            safe: matrix.clone(),
            fast: matrix.clone(),
        },
        ground: ModeTables {
            safe: HourlyRouteMatrices::constant(matrix.clone()),
            fast: HourlyRouteMatrices::constant(matrix),
        },
    }
}

fn entry(id: u64, tick: usize, origin: usize, destination: usize, deadline: usize) -> DemandEntry {
    DemandEntry {
        id,
        tick,
        origin,
        destination,
        deadline,
        urgency: Urgency::Urgent,
        mass: 1.0,
        volume: 1.0,
    }
}

/// One ground vehicle parked at location 0
fn config(demand: Vec<DemandEntry>, profile: VehicleProfile) -> OrchestratorConfig {
    let positions = [(0.0, 0.0), (100.0, 50.0), (200.0, 0.0)];
    OrchestratorConfig {
        rng_seed: 42,
        max_ticks: 30,
        drain_ticks: 600,
        delivery_policy: Default::default(),
        decision_weights: Default::default(),
        delays: DelayConfig::default(),
        track_heatmap: false,
        locations: positions
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| LocationConfig {
                name: format!("L{i}"),
                position: Point::new(x, y),
            })
            .collect(),
        fleets: vec![FleetConfig {
            class: VehicleClass::Ground,
            count: 1,
            profile,
            spawn: Some(vec![0]),
        }],
        infrastructure: None,
        demand,
    }
}

fn run_until(orch: &mut Orchestrator, tick: usize) {
    while orch.current_tick() < tick {
        orch.tick().unwrap();
    }
}

#[test]
fn test_idle_in_transit_idle_with_midpoint() {
    // Anchor tick 0 + turnaround 3; ten-minute leg 0 -> 1, arrival at 13
    let cfg = config(vec![entry(1, 0, 0, 1, 60)], VehicleProfile::ground_default());
    let mut orch = Orchestrator::new(cfg, tables(10)).unwrap();

    run_until(&mut orch, 3);
    let view = &orch.vehicle_views()[0];
    assert_eq!(view.status, VehicleStatus::Idle);
    assert_eq!(view.position, Point::new(0.0, 0.0));

    // Departure happens on tick 3
    run_until(&mut orch, 4);
    assert_eq!(orch.vehicle_views()[0].status, VehicleStatus::InTransit);

    // Half the planned duration elapsed
    run_until(&mut orch, 8);
    let view = &orch.vehicle_views()[0];
    assert_eq!(view.status, VehicleStatus::InTransit);
    assert_eq!(view.position, Point::new(50.0, 25.0));
    assert_eq!(view.eta, Some(13));
    assert_eq!(view.mode, Some(fleet_dispatch_core_rs::DeliveryMode::Safe));

    run_until(&mut orch, 14);
    let view = &orch.vehicle_views()[0];
    assert_eq!(view.status, VehicleStatus::Idle);
    assert_eq!(view.location, 1);
    assert_eq!(view.position, Point::new(100.0, 50.0));
    assert_eq!(view.eta, None);

    let log = orch.event_log();
    assert!(matches!(
        log.events_of_type("VehicleDeparted").as_slice(),
        [Event::VehicleDeparted { tick: 3, loaded: true, .. }]
    ));
    assert!(matches!(
        log.events_of_type("RequestCompleted").as_slice(),
        [Event::RequestCompleted { tick: 13, delivery_time: 13, overdue: false, .. }]
    ));
}

#[test]
fn test_idle_vehicle_without_work_waits() {
    let cfg = config(vec![], VehicleProfile::ground_default());
    let mut orch = Orchestrator::new(cfg, tables(10)).unwrap();
    run_until(&mut orch, 20);

    let view = &orch.vehicle_views()[0];
    assert_eq!(view.status, VehicleStatus::Idle);
    assert_eq!(view.legs, 0);
    assert_eq!(orch.metrics().class(VehicleClass::Ground).idle_ticks, 20);
    assert!(orch.event_log().events_for_vehicle(VehicleId(0)).is_empty());
}

#[test]
fn test_positioning_leg_flies_empty() {
    // Request from location 2 while the vehicle sits at 0
    let cfg = config(vec![entry(1, 0, 2, 1, 200)], VehicleProfile::ground_default());
    let mut orch = Orchestrator::new(cfg, tables(10)).unwrap();
    orch.run().unwrap();

    let departures = orch.event_log().events_of_type("VehicleDeparted");
    assert!(matches!(
        departures.as_slice(),
        [
            Event::VehicleDeparted { loaded: false, .. },
            Event::VehicleDeparted { loaded: true, .. }
        ]
    ));
    let ground = orch.metrics().class(VehicleClass::Ground);
    assert_eq!(ground.legs_completed, 2);
    assert_eq!(ground.consolidation.single, 1);
    assert!(ground.empty_ticks.values().sum::<usize>() > 0);
    assert!(ground.loaded_ticks.values().sum::<usize>() > 0);
}

#[test]
fn test_delays_move_vehicles_through_delayed_state() {
    // Capacity 1 keeps every request on its own leg
    let profile = VehicleProfile {
        capacity: 1,
        delay_fractions: DelayFractions {
            normal: 0.9,
            rush_hour: 0.9,
        },
        ..VehicleProfile::ground_default()
    };
    // A long chain of requests back and forth between 0 and 1
    let demand = (0..30)
        .map(|i| entry(i, 0, (i % 2) as usize, ((i + 1) % 2) as usize, 5000))
        .collect();
    let mut cfg = config(demand, profile);
    cfg.max_ticks = 1;
    cfg.drain_ticks = 8000;
    cfg.delays = DelayConfig {
        enabled: true,
        rush_hours: vec![TickWindow::new(0, 1440)],
    };
    let mut orch = Orchestrator::new(cfg, tables(100)).unwrap();
    orch.run().unwrap();

    let delays = orch.event_log().events_of_type("VehicleDelayed");
    assert!(!delays.is_empty());
    let ground = orch.metrics().class(VehicleClass::Ground);
    assert_eq!(ground.delays_sampled, delays.len());
    assert!(ground.delayed_ticks > 0);

    // Every delayed leg still completed, shifted by its sampled delay
    for event in delays {
        if let Event::VehicleDelayed { leg, delay, .. } = event {
            let completed = orch
                .state()
                .completed_legs()
                .iter()
                .find(|l| l.id() == *leg)
                .unwrap();
            assert_eq!(completed.delay(), *delay);
        }
    }
    assert_eq!(orch.metrics().fulfilled, 30);
}
