//! Schedule quality metrics (KPIs).
//!
//! Computes utilization, actor load, makespan and financial totals from a
//! finished schedule and its catalog.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan | Latest span end on the global slot axis |
//! | Utilization | Busy slots (setup included) / total slots, per resource |
//! | Setup share | Setup slots / busy slots |
//! | Actor load | Claimed slots / total slots, per actor |
//! | Gross revenue | Σ base value × multiplier |
//! | Total cost | Σ resource + setup + actor cost |
//! | Net value | Gross revenue − total cost |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use std::collections::HashMap;

use crate::models::{Catalog, Schedule};

/// Schedule performance indicators.
///
/// Time values are in slots.
#[derive(Debug, Clone)]
pub struct ScheduleKpi {
    /// Latest span end on the global slot axis.
    pub makespan_slots: i64,
    /// Average resource utilization (0.0..1.0).
    pub avg_utilization: f64,
    /// Per-resource utilization.
    pub utilization_by_resource: HashMap<String, f64>,
    /// Fraction of busy resource time spent on setup.
    pub setup_share: f64,
    /// Per-actor share of the horizon claimed.
    pub actor_load: HashMap<String, f64>,
    /// Σ base value × multiplier.
    pub gross_revenue: f64,
    /// Σ resource, setup and actor costs.
    pub total_cost: f64,
    /// Gross revenue minus total cost.
    pub net_value: f64,
}

impl ScheduleKpi {
    /// Computes KPIs from a schedule and the catalog it was built from.
    ///
    /// Resources and actors without placements appear with zero load.
    pub fn calculate(schedule: &Schedule, catalog: &Catalog<'_>) -> Self {
        let grid = catalog.grid();
        let horizon = grid.total_slots().max(1) as f64;

        let makespan_slots = schedule
            .records
            .iter()
            .map(|p| grid.global_slot(p.day, p.end_slot))
            .max()
            .unwrap_or(0);

        let busy = schedule.busy_slots_by_resource();
        let utilization_by_resource: HashMap<String, f64> = catalog
            .resources()
            .iter()
            .map(|r| {
                let slots = busy.get(&r.id).copied().unwrap_or(0);
                (r.id.clone(), slots as f64 / horizon)
            })
            .collect();
        let avg_utilization = if utilization_by_resource.is_empty() {
            0.0
        } else {
            utilization_by_resource.values().sum::<f64>() / utilization_by_resource.len() as f64
        };

        let busy_total: i64 = busy.values().sum();
        let setup_total: i64 = schedule.records.iter().map(|p| p.setup_slots).sum();
        let setup_share = if busy_total == 0 {
            0.0
        } else {
            setup_total as f64 / busy_total as f64
        };

        let mut claimed: HashMap<&str, i64> = HashMap::new();
        for p in &schedule.records {
            let (Some(a), Some(r)) = (
                catalog.activity_idx(&p.activity_id),
                catalog.resource_idx(&p.resource_id),
            ) else {
                continue;
            };
            if let (Some(actor), Some(len)) = (catalog.assigned_actor(a), catalog.actor_span_len(a, r))
            {
                *claimed.entry(actor.id.as_str()).or_insert(0) += len;
            }
        }
        let actor_load = catalog
            .actors()
            .iter()
            .map(|p| {
                let slots = claimed.get(p.id.as_str()).copied().unwrap_or(0);
                (p.id.clone(), slots as f64 / horizon)
            })
            .collect();

        let gross_revenue: f64 = schedule.records.iter().map(|p| p.gross_value()).sum();
        let total_cost: f64 = schedule
            .records
            .iter()
            .map(|p| p.resource_cost + p.setup_cost + p.actor_cost)
            .sum();

        Self {
            makespan_slots,
            avg_utilization,
            utilization_by_resource,
            setup_share,
            actor_load,
            gross_revenue,
            total_cost,
            net_value: gross_revenue - total_cost,
        }
    }

    /// Whether the schedule meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_makespan: i64, min_utilization: f64) -> bool {
        self.makespan_slots <= max_makespan && self.avg_utilization >= min_utilization
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolveConfig;
    use crate::engine::SolveStatus;
    use crate::models::{Activity, Actor, Placement, ProblemInstance, Resource, TimeGrid};
    use crate::scheduler::CpScheduler;

    fn instance() -> ProblemInstance {
        ProblemInstance::new("kpi", TimeGrid::new(1, 10, 60))
            .with_activity(Activity::new("A", 4).with_base_value(100.0))
            .with_activity(Activity::new("B", 2).with_base_value(40.0))
            .with_resource(Resource::new("M1").with_setup_time(1).with_costs(5.0, 2.0))
            .with_resource(Resource::new("M2"))
            .with_actor(Actor::new("W").with_hourly_cost(3.0).with_claim("A", 4))
    }

    #[test]
    fn test_kpi_from_solved_schedule() {
        let inst = instance();
        let outcome = CpScheduler::new(SolveConfig::default()).solve(&inst).unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
        let schedule = outcome.schedule.unwrap();
        let cat = Catalog::new(&inst).unwrap();
        let kpi = ScheduleKpi::calculate(&schedule, &cat);

        // Both go on cost-free M2: A 100 − 12, B 40.
        assert!((kpi.net_value - 128.0).abs() < 1e-9);
        assert!((kpi.net_value - schedule.total_objective_value).abs() < 1e-9);
        assert!((kpi.utilization_by_resource["M2"] - 0.6).abs() < 1e-9);
        assert_eq!(kpi.utilization_by_resource["M1"], 0.0);
        assert!((kpi.avg_utilization - 0.3).abs() < 1e-9);
        assert!((kpi.actor_load["W"] - 0.4).abs() < 1e-9);
        assert_eq!(kpi.setup_share, 0.0);
        assert!((6..=10).contains(&kpi.makespan_slots));
    }

    #[test]
    fn test_kpi_setup_and_costs() {
        let inst = instance();
        let cat = Catalog::new(&inst).unwrap();
        let mut schedule = Schedule::new(SolveStatus::Feasible, Default::default());
        schedule.add_placement(Placement {
            activity_id: "A".into(),
            resource_id: "M1".into(),
            actor_id: Some("W".into()),
            day: 0,
            start_slot: 0,
            end_slot: 5,
            setup_slots: 1,
            period: None,
            base_value: 100.0,
            multiplier_applied: 1.0,
            resource_cost: 20.0,
            setup_cost: 2.0,
            actor_cost: 12.0,
            net_value: 66.0,
        });

        let kpi = ScheduleKpi::calculate(&schedule, &cat);
        assert!((kpi.setup_share - 0.2).abs() < 1e-9);
        assert!((kpi.total_cost - 34.0).abs() < 1e-9);
        assert!((kpi.gross_revenue - 100.0).abs() < 1e-9);
        assert_eq!(kpi.makespan_slots, 5);
        assert!(kpi.meets_thresholds(5, 0.2));
        assert!(!kpi.meets_thresholds(4, 0.0));
    }

    #[test]
    fn test_kpi_empty() {
        let inst = instance();
        let cat = Catalog::new(&inst).unwrap();
        let schedule = Schedule::new(SolveStatus::Optimal, Default::default());
        let kpi = ScheduleKpi::calculate(&schedule, &cat);
        assert_eq!(kpi.makespan_slots, 0);
        assert_eq!(kpi.avg_utilization, 0.0);
        assert_eq!(kpi.actor_load["W"], 0.0);
        assert_eq!(kpi.net_value, 0.0);
    }
}
