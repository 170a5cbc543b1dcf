//! Objective terms and their independent recomputation.
//!
//! # Net value
//!
//! ```text
//! value(a, r, t) = base_value(a) × multiplier(period(t))
//!                − cost_per_slot(r) × duration(a)
//!                − setup_cost_per_slot(r) × setup_time(r)
//!                − hourly_cost(actor(a)) × hours(duration(a))
//! ```
//!
//! The period is taken at the span's first slot. Coefficients are scaled to
//! integer minor units with round-half-away-from-zero.
//!
//! # Placement cost
//!
//! ```text
//! cost(a, r) = duration(a) + preparation_time(a) + distance(a, r)
//! ```
//!
//! Minimized over the chosen placements. Independent of day and slot.
//!
//! # Temporal objectives
//!
//! Ends live on the global slot axis (`day · S + slot`).
//! `Makespan = max end`; `WeightedCompletion = w · makespan + Σ priority · end`.

use crate::config::ObjectiveKind;
use crate::models::Catalog;

/// Financial breakdown of one placement.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueBreakdown {
    /// Pricing period of the start slot.
    pub period: Option<String>,
    /// Activity base value.
    pub base_value: f64,
    /// Multiplier of that period.
    pub multiplier: f64,
    /// Usage cost of the resource.
    pub resource_cost: f64,
    /// Setup cost of the resource.
    pub setup_cost: f64,
    /// Cost of the assigned actor.
    pub actor_cost: f64,
    /// `base × multiplier − costs`.
    pub net_value: f64,
}

/// Breaks down the value of placing `activity` on `resource` at `start_slot`.
pub fn placement_value(
    catalog: &Catalog<'_>,
    activity: usize,
    resource: usize,
    start_slot: i64,
) -> ValueBreakdown {
    let grid = catalog.grid();
    let act = &catalog.activities()[activity];
    let res = &catalog.resources()[resource];

    let period = grid.period(start_slot);
    let multiplier = period.map_or(1.0, |p| p.multiplier);
    let resource_cost = res.usage_cost(act.duration);
    let setup_cost = res.setup_cost();
    let actor_cost = catalog
        .assigned_actor(activity)
        .map_or(0.0, |p| p.cost_for_hours(grid.slots_to_hours(act.duration)));

    ValueBreakdown {
        period: period.map(|p| p.name.clone()),
        base_value: act.base_value,
        multiplier,
        resource_cost,
        setup_cost,
        actor_cost,
        net_value: act.base_value * multiplier - resource_cost - setup_cost - actor_cost,
    }
}

/// Scales a currency amount to integer minor units.
///
/// `f64::round` rounds half away from zero. `None` when the result is not
/// finite or does not fit an `i64`.
#[inline]
pub fn to_minor_units(amount: f64, money_scale: i64) -> Option<i64> {
    let scaled = (amount * money_scale as f64).round();
    // 2^63 itself is out of range.
    (scaled.is_finite() && scaled.abs() < 9_223_372_036_854_775_808.0).then_some(scaled as i64)
}

/// Cost of placing `activity` on `resource` under the placement-cost
/// objective.
pub fn placement_cost(catalog: &Catalog<'_>, activity: usize, resource: usize) -> i64 {
    let act = &catalog.activities()[activity];
    let res = &catalog.resources()[resource];
    act.duration
        .saturating_add(act.preparation_time)
        .saturating_add(act.distance_to(&res.id))
}

/// Tolerance when comparing a recomputed net value against the engine's
/// scaled objective over `placements` terms.
pub fn net_value_tolerance(placements: usize, money_scale: i64, total: f64) -> f64 {
    0.5 * placements as f64 / money_scale as f64 + 1e-6 * total.abs().max(1.0)
}

/// Value of a temporal objective from per-activity `(priority weight, end)`.
///
/// Returns `None` for the placement-based objectives.
pub fn temporal_value(kind: ObjectiveKind, ends: &[(i64, i64)], makespan_weight: i64) -> Option<i64> {
    let makespan = ends.iter().map(|&(_, end)| end).max().unwrap_or(0);
    match kind {
        ObjectiveKind::NetValue | ObjectiveKind::PlacementCost => None,
        ObjectiveKind::Makespan => Some(makespan),
        ObjectiveKind::WeightedCompletion => Some(
            makespan_weight * makespan + ends.iter().map(|&(w, end)| w * end).sum::<i64>(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Activity, Actor, ProblemInstance, Resource, TimeGrid};

    fn instance() -> ProblemInstance {
        let grid = TimeGrid::new(1, 16, 30)
            .with_day_start(8, 0)
            .with_clock_period("morning", 8, 0, 1.0)
            .with_clock_period("afternoon", 12, 0, 1.1);
        ProblemInstance::new("value", grid)
            .with_activity(Activity::new("Math101", 4).with_base_value(5000.0))
            .with_activity(Activity::new("Free", 2).with_base_value(100.0))
            .with_resource(Resource::new("Room101").with_setup_time(2).with_costs(150.0, 50.0))
            .with_actor(Actor::new("Prof_Smith").with_hourly_cost(400.0).with_claim("Math101", 4))
    }

    #[test]
    fn test_afternoon_breakdown() {
        let inst = instance();
        let cat = Catalog::new(&inst).unwrap();
        let v = placement_value(&cat, 0, 0, 8);
        assert_eq!(v.period.as_deref(), Some("afternoon"));
        assert!((v.multiplier - 1.1).abs() < 1e-12);
        assert!((v.resource_cost - 600.0).abs() < 1e-9);
        assert!((v.setup_cost - 100.0).abs() < 1e-9);
        assert!((v.actor_cost - 800.0).abs() < 1e-9);
        assert!((v.net_value - 4000.0).abs() < 1e-6);
    }

    #[test]
    fn test_morning_and_no_actor() {
        let inst = instance();
        let cat = Catalog::new(&inst).unwrap();
        let v = placement_value(&cat, 0, 0, 7);
        assert_eq!(v.period.as_deref(), Some("morning"));
        assert!((v.net_value - 3500.0).abs() < 1e-9);

        let free = placement_value(&cat, 1, 0, 0);
        assert_eq!(free.actor_cost, 0.0);
        assert!((free.net_value - (100.0 - 300.0 - 100.0)).abs() < 1e-9);
    }

    #[test]
    fn test_minor_units_rounding() {
        assert_eq!(to_minor_units(4000.0, 100), Some(400_000));
        assert_eq!(to_minor_units(0.125, 100), Some(13));
        assert_eq!(to_minor_units(-0.125, 100), Some(-13));
        assert_eq!(to_minor_units(1.004, 100), Some(100));
    }

    #[test]
    fn test_minor_units_out_of_range() {
        assert_eq!(to_minor_units(1e17, 100), None);
        assert_eq!(to_minor_units(f64::INFINITY, 100), None);
        assert_eq!(to_minor_units(f64::NAN, 100), None);
        assert!(to_minor_units(1e16, 100).is_some());
    }

    #[test]
    fn test_placement_cost() {
        let inst = ProblemInstance::new("cost", TimeGrid::new(1, 8, 60))
            .with_activity(
                Activity::new("Math101", 4)
                    .with_preparation_time(2)
                    .with_distance("Room102", 5),
            )
            .with_resource(Resource::new("Room101"))
            .with_resource(Resource::new("Room102"));
        let cat = Catalog::new(&inst).unwrap();
        assert_eq!(placement_cost(&cat, 0, 0), 6);
        assert_eq!(placement_cost(&cat, 0, 1), 11);
    }

    #[test]
    fn test_temporal_values() {
        let ends = [(1, 5), (4, 9)];
        assert_eq!(temporal_value(ObjectiveKind::NetValue, &ends, 100), None);
        assert_eq!(temporal_value(ObjectiveKind::PlacementCost, &ends, 100), None);
        assert_eq!(temporal_value(ObjectiveKind::Makespan, &ends, 100), Some(9));
        assert_eq!(
            temporal_value(ObjectiveKind::WeightedCompletion, &ends, 10),
            Some(90 + 5 + 36)
        );
        assert_eq!(temporal_value(ObjectiveKind::Makespan, &[], 100), Some(0));
    }

    #[test]
    fn test_tolerance_grows_with_terms() {
        assert!(net_value_tolerance(4, 100, 20090.0) > net_value_tolerance(1, 100, 20090.0));
        assert!(net_value_tolerance(0, 100, 0.0) > 0.0);
    }
}
