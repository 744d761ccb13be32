//! Tests for delay sampling and cascade propagation

use fleet_dispatch_core_rs::costs::LegCost;
use fleet_dispatch_core_rs::delay::{propagate_delay, sample_delay, CascadeError};
use fleet_dispatch_core_rs::models::schedule::{LegId, ScheduleItem};
use fleet_dispatch_core_rs::models::vehicle::VehicleId;
use fleet_dispatch_core_rs::policy::DeliveryMode;
use fleet_dispatch_core_rs::RngManager;
use proptest::prelude::*;
use std::collections::VecDeque;

const TURNAROUND: usize = 5;

/// Build a valid itinerary from `(duration, slack)` pairs
fn itinerary(spans: &[(usize, usize)]) -> VecDeque<ScheduleItem> {
    let mut departure = 0;
    let mut legs = VecDeque::new();
    for (i, &(duration, slack)) in spans.iter().enumerate() {
        let arrival = departure + duration;
        legs.push_back(ScheduleItem::new(
            LegId(i as u64),
            VehicleId(0),
            i % 3,
            (i + 1) % 3,
            departure,
            arrival,
            DeliveryMode::Safe,
            LegCost::default(),
            vec![],
        ));
        departure = arrival + TURNAROUND + slack;
    }
    legs
}

#[test]
fn test_delay_absorbed_by_generous_slack() {
    let mut legs = itinerary(&[(10, 20), (10, 0)]);
    let prop = propagate_delay(&mut legs, 8, TURNAROUND).unwrap();

    assert_eq!(legs[0].arrival(), 18);
    assert_eq!(legs[1].departure(), 35);
    assert_eq!(legs[1].total_delay(), 0);
    assert_eq!(prop.absorbed, vec![8]);
    assert_eq!(prop.residual, 0);
}

#[test]
fn test_in_progress_leg_keeps_departure() {
    let mut legs = itinerary(&[(10, 0), (10, 0)]);
    propagate_delay(&mut legs, 4, TURNAROUND).unwrap();

    assert_eq!(legs[0].departure(), 0);
    assert_eq!(legs[0].arrival(), 14);
    assert_eq!(legs[0].delay(), 4);
    // Later legs move as a whole
    assert_eq!((legs[1].departure(), legs[1].arrival()), (19, 29));
    assert_eq!(legs[1].delay(), 0);
    assert_eq!(legs[1].total_delay(), 4);
    assert_eq!(legs[1].duration(), 10);
}

#[test]
fn test_empty_itinerary_rejected() {
    let mut legs = VecDeque::new();
    assert_eq!(
        propagate_delay(&mut legs, 3, TURNAROUND),
        Err(CascadeError::EmptyItinerary)
    );
}

#[test]
fn test_sample_delay_zero_fraction_is_zero() {
    let mut rng = RngManager::new(5);
    for duration in [1, 10, 100] {
        assert_eq!(sample_delay(&mut rng, duration, 0.0), 0);
    }
}

#[test]
fn test_sample_delay_consumes_one_draw() {
    let mut a = RngManager::new(77);
    let mut b = RngManager::new(77);
    sample_delay(&mut a, 40, 0.2);
    b.next();
    assert_eq!(a.get_state(), b.get_state());
}

proptest! {
    #[test]
    fn prop_cascade_conserves_delay(
        spans in proptest::collection::vec((1usize..60, 0usize..30), 1..12),
        delay in 1usize..200,
    ) {
        let mut legs = itinerary(&spans);
        let original: Vec<(usize, usize)> =
            legs.iter().map(|l| (l.departure(), l.arrival())).collect();

        let prop = propagate_delay(&mut legs, delay, TURNAROUND).unwrap();

        prop_assert!(prop.is_conserved());
        prop_assert_eq!(prop.sampled, delay);
        prop_assert_eq!(legs[0].arrival(), original[0].1 + delay);

        // Order and turnaround spacing survive the cascade
        for pair in legs.iter().collect::<Vec<_>>().windows(2) {
            prop_assert!(pair[0].arrival() + TURNAROUND <= pair[1].departure());
        }
        // Later legs only ever move later, never shrink
        for (leg, &(dep, arr)) in legs.iter().zip(&original).skip(1) {
            prop_assert!(leg.departure() >= dep);
            prop_assert_eq!(leg.arrival() - leg.departure(), arr - dep);
        }
        // The last leg carries exactly the residual
        if legs.len() > 1 {
            prop_assert_eq!(legs[legs.len() - 1].total_delay(), prop.residual);
        }
    }

    #[test]
    fn prop_sample_delay_within_fraction(
        seed in any::<u64>(),
        duration in 1usize..500,
        fraction in 0.0f64..0.99,
    ) {
        let mut rng = RngManager::new(seed);
        let bound = (fraction * duration as f64).ceil() as i64;
        for _ in 0..20 {
            let delay = sample_delay(&mut rng, duration, fraction);
            prop_assert!(delay.abs() <= bound);
            prop_assert!(delay >= -(duration as i64));
        }
    }
}
