//! Solution extraction and objective cross-check.
//!
//! Reads the engine's assignment back into a [`Schedule`], recomputes the
//! objective from the chosen placements alone, and compares it against the
//! value the engine reports. Any disagreement means the model and its
//! interpretation have drifted apart, which is a defect rather than a
//! solving outcome.

use super::arena::PlacementKey;
use super::builder::BuiltModel;
use super::objective::{net_value_tolerance, placement_cost, placement_value, temporal_value};
use crate::config::{ObjectiveKind, SolveConfig};
use crate::engine::EngineSolution;
use crate::error::{Result, ScheduleError};
use crate::models::{Catalog, Placement, Schedule};

/// Converts an engine assignment into a schedule.
pub struct SolutionExtractor<'c, 'a> {
    catalog: &'c Catalog<'a>,
    config: &'c SolveConfig,
}

impl<'c, 'a> SolutionExtractor<'c, 'a> {
    /// Creates an extractor.
    pub fn new(catalog: &'c Catalog<'a>, config: &'c SolveConfig) -> Self {
        Self { catalog, config }
    }

    /// Extracts and cross-checks the schedule.
    ///
    /// # Errors
    /// [`ScheduleError::InternalConsistency`] when an activity has zero or
    /// several true placements, when start/end values disagree with the
    /// chosen placement, or when the recomputed objective differs from the
    /// engine's.
    pub fn extract(&self, model: &BuiltModel, solution: &EngineSolution) -> Result<Schedule> {
        let keys = self.chosen_keys(model, solution)?;
        self.check_temporal_links(model, solution, &keys)?;

        let mut schedule = Schedule::new(solution.status, model.objective);
        for &key in &keys {
            schedule.add_placement(self.placement(key));
        }

        schedule.total_objective_value = match model.objective {
            ObjectiveKind::NetValue => self.check_net_value(&schedule, solution)?,
            ObjectiveKind::PlacementCost => self.check_placement_cost(&keys, solution)? as f64,
            kind => self.check_temporal(kind, &keys, solution)? as f64,
        };
        schedule.sort_records();
        Ok(schedule)
    }

    fn chosen_keys(&self, model: &BuiltModel, solution: &EngineSolution) -> Result<Vec<PlacementKey>> {
        let mut keys = Vec::with_capacity(self.catalog.activities().len());
        for (a, activity) in self.catalog.activities().iter().enumerate() {
            let chosen: Vec<PlacementKey> = model
                .arena
                .activity_vars(a)
                .filter(|&(_, v)| solution.is_true(v))
                .map(|(k, _)| k)
                .collect();
            match chosen.as_slice() {
                [key] => keys.push(*key),
                _ => {
                    return Err(ScheduleError::consistency(
                        self.catalog.id(),
                        "exactly-once",
                        format!(
                            "activity '{}' has {} true placements",
                            activity.id,
                            chosen.len()
                        ),
                    ))
                }
            }
        }
        Ok(keys)
    }

    fn check_temporal_links(
        &self,
        model: &BuiltModel,
        solution: &EngineSolution,
        keys: &[PlacementKey],
    ) -> Result<()> {
        let Some(temporal) = &model.temporal else {
            return Ok(());
        };
        let grid = self.catalog.grid();
        for (a, key) in keys.iter().enumerate() {
            let start = grid.global_slot(key.day, key.start_slot);
            let end = start + self.catalog.span_len(key.activity, key.resource);
            let got = (
                solution.value(temporal.starts[a]),
                solution.value(temporal.ends[a]),
            );
            if got != (Some(start), Some(end)) {
                return Err(ScheduleError::consistency(
                    self.catalog.id(),
                    "temporal-link",
                    format!(
                        "activity '{}' placed at [{start}, {end}) but engine reports {:?}",
                        self.catalog.activities()[a].id,
                        got
                    ),
                ));
            }
        }
        Ok(())
    }

    fn placement(&self, key: PlacementKey) -> Placement {
        let activity = &self.catalog.activities()[key.activity];
        let resource = &self.catalog.resources()[key.resource];
        let value = placement_value(self.catalog, key.activity, key.resource, key.start_slot);
        Placement {
            activity_id: activity.id.clone(),
            resource_id: resource.id.clone(),
            actor_id: self
                .catalog
                .assigned_actor(key.activity)
                .map(|p| p.id.clone()),
            day: key.day,
            start_slot: key.start_slot,
            end_slot: key.start_slot + self.catalog.span_len(key.activity, key.resource),
            setup_slots: resource.setup_time,
            period: value.period,
            base_value: value.base_value,
            multiplier_applied: value.multiplier,
            resource_cost: value.resource_cost,
            setup_cost: value.setup_cost,
            actor_cost: value.actor_cost,
            net_value: value.net_value,
        }
    }

    fn reported_objective(&self, solution: &EngineSolution) -> Result<i64> {
        solution.objective_value.ok_or_else(|| {
            ScheduleError::consistency(
                self.catalog.id(),
                "objective",
                "engine returned an assignment without an objective value",
            )
        })
    }

    fn check_net_value(&self, schedule: &Schedule, solution: &EngineSolution) -> Result<f64> {
        let scale = self.config.money_scale;
        let total = schedule.total_net_value();
        let reported = self.reported_objective(solution)? as f64 / scale as f64;
        let tolerance = net_value_tolerance(schedule.placement_count(), scale, total);
        if (total - reported).abs() > tolerance {
            return Err(ScheduleError::consistency(
                self.catalog.id(),
                "objective",
                format!("recomputed net value {total:.4} differs from engine value {reported:.4}"),
            ));
        }
        Ok(total)
    }

    /// Recomputes the placement cost. The objective depends on the chosen
    /// placements alone, so any assignment must match exactly.
    fn check_placement_cost(&self, keys: &[PlacementKey], solution: &EngineSolution) -> Result<i64> {
        let recomputed: i64 = keys
            .iter()
            .map(|k| placement_cost(self.catalog, k.activity, k.resource))
            .sum();
        let reported = self.reported_objective(solution)?;
        if reported != recomputed {
            return Err(ScheduleError::consistency(
                self.catalog.id(),
                "objective",
                format!("recomputed placement cost {recomputed} differs from engine value {reported}"),
            ));
        }
        Ok(recomputed)
    }

    /// Recomputes a temporal objective.
    ///
    /// A proven optimum must match exactly. A merely feasible assignment may
    /// carry a makespan variable above the latest end, so the engine value
    /// may only exceed the recomputed one.
    fn check_temporal(
        &self,
        kind: ObjectiveKind,
        keys: &[PlacementKey],
        solution: &EngineSolution,
    ) -> Result<i64> {
        let grid = self.catalog.grid();
        let ends: Vec<(i64, i64)> = keys
            .iter()
            .map(|k| {
                let end = grid.global_slot(k.day, k.start_slot)
                    + self.catalog.span_len(k.activity, k.resource);
                (self.catalog.activities()[k.activity].priority.weight(), end)
            })
            .collect();
        let recomputed = temporal_value(kind, &ends, self.config.makespan_weight).unwrap_or(0);
        let reported = self.reported_objective(solution)?;

        let consistent = if solution.status.is_optimal() {
            reported == recomputed
        } else {
            reported >= recomputed
        };
        if !consistent {
            return Err(ScheduleError::consistency(
                self.catalog.id(),
                "objective",
                format!("recomputed {kind:?} {recomputed} differs from engine value {reported}"),
            ));
        }
        Ok(recomputed)
    }
}
