//! Build-solve-extract pipeline and KPI evaluation.
//!
//! [`CpScheduler`] runs one stateless cycle per call:
//!
//! 1. Validate and index the instance ([`Catalog`]).
//! 2. Build the constraint model on a fresh engine ([`ModelBuilder`]).
//! 3. Solve within the configured time budget.
//! 4. Extract the schedule and cross-check the objective
//!    ([`SolutionExtractor`]).
//! 5. Verify the schedule independently ([`verify_schedule`]).
//!
//! `Infeasible` and `Timeout` are ordinary outcomes and come back in
//! [`SolveOutcome::status`] with no schedule. Construction failures and
//! consistency failures are errors.
//!
//! # KPI
//!
//! [`ScheduleKpi`] computes utilization, actor load, makespan and financial
//! totals for a finished schedule.

mod kpi;

pub use kpi::ScheduleKpi;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::SolveConfig;
use crate::cp::{ModelBuilder, ModelStats, SolutionExtractor};
use crate::engine::{ConstraintEngine, PumpkinEngine, SolveStatus};
use crate::error::{Result, ScheduleError};
use crate::models::{Catalog, ProblemInstance, Schedule};
use crate::validation::ConstructionWarning;
use crate::verify::verify_schedule;

/// Result of one solve cycle.
#[derive(Debug, Clone, Serialize)]
pub struct SolveOutcome {
    /// Engine status.
    pub status: SolveStatus,
    /// The schedule, when the status carries one.
    pub schedule: Option<Schedule>,
    /// Non-fatal construction warnings.
    pub warnings: Vec<ConstructionWarning>,
    /// Constraint counts of the model that was solved.
    #[serde(skip)]
    pub stats: ModelStats,
}

impl SolveOutcome {
    /// Whether the schedule is proven optimal.
    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }

    /// Recomputed objective value of the schedule, if any.
    pub fn objective_value(&self) -> Option<f64> {
        self.schedule.as_ref().map(|s| s.total_objective_value)
    }
}

/// Constraint-programming scheduler.
///
/// # Example
///
/// ```
/// use u_timetable::config::SolveConfig;
/// use u_timetable::engine::SolveStatus;
/// use u_timetable::models::{Activity, ProblemInstance, Resource, TimeGrid};
/// use u_timetable::scheduler::CpScheduler;
///
/// let instance = ProblemInstance::new("demo", TimeGrid::new(1, 8, 60))
///     .with_activity(Activity::new("A", 3).with_base_value(100.0))
///     .with_activity(Activity::new("B", 2).with_base_value(50.0))
///     .with_resource(Resource::new("R").with_costs(5.0, 0.0));
///
/// let outcome = CpScheduler::new(SolveConfig::default()).solve(&instance).unwrap();
/// assert_eq!(outcome.status, SolveStatus::Optimal);
/// assert_eq!(outcome.objective_value(), Some(125.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CpScheduler {
    config: SolveConfig,
}

impl CpScheduler {
    /// Creates a scheduler.
    pub fn new(config: SolveConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &SolveConfig {
        &self.config
    }

    /// Runs one cycle on the bundled [`PumpkinEngine`].
    ///
    /// # Errors
    /// - [`ScheduleError::Config`] for an out-of-range configuration.
    /// - [`ScheduleError::Construction`] for malformed input, before solving.
    /// - [`ScheduleError::Engine`] if the engine rejects the model.
    /// - [`ScheduleError::InternalConsistency`] if extraction or
    ///   verification disagrees with the engine.
    pub fn solve(&self, instance: &ProblemInstance) -> Result<SolveOutcome> {
        self.solve_with(instance, PumpkinEngine::new())
    }

    /// Runs one cycle on a caller-supplied engine. The engine must be fresh.
    ///
    /// # Errors
    /// As [`solve`](Self::solve).
    pub fn solve_with<E: ConstraintEngine>(
        &self,
        instance: &ProblemInstance,
        mut engine: E,
    ) -> Result<SolveOutcome> {
        self.config.validate()?;
        info!(
            event = "solve_start",
            instance = %instance.id,
            activities = instance.activities.len(),
            resources = instance.resources.len(),
            actors = instance.actors.len(),
        );

        let catalog = Catalog::new(instance)?;
        let model = ModelBuilder::new(&catalog, &self.config).build(&mut engine)?;
        for w in &model.warnings {
            warn!(kind = ?w.kind, entity = %w.entity_id, "{}", w.message);
        }

        let solution = engine.solve(self.config.time_limit());
        let status = solution.status;

        let schedule = match status {
            SolveStatus::Error => {
                let message = solution
                    .message
                    .clone()
                    .unwrap_or_else(|| "engine reported an error".to_string());
                return Err(ScheduleError::Engine(message));
            }
            SolveStatus::Infeasible | SolveStatus::Timeout => None,
            SolveStatus::Optimal | SolveStatus::Feasible => {
                let schedule =
                    SolutionExtractor::new(&catalog, &self.config).extract(&model, &solution)?;
                let violations = verify_schedule(&catalog, &schedule, &self.config.rules);
                if let Some(first) = violations.first() {
                    return Err(ScheduleError::consistency(
                        catalog.id(),
                        "verification",
                        format!(
                            "{} violation(s), first: {:?} on '{}': {}",
                            violations.len(),
                            first.violation_type,
                            first.entity_id,
                            first.message
                        ),
                    ));
                }
                Some(schedule)
            }
        };

        info!(
            event = "solve_end",
            instance = %instance.id,
            status = %status,
            objective = ?schedule.as_ref().map(|s| s.total_objective_value),
            variables = engine.var_count(),
            constraints = engine.constraint_count(),
        );

        Ok(SolveOutcome {
            status,
            schedule,
            warnings: model.warnings,
            stats: model.stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ObjectiveKind, OverlapEncoding, RuleSet};
    use crate::engine::{
        Direction, EngineSolution, LinearConstraint, Literal, VarHandle,
    };
    use crate::error::{ConfigError, ConstructionErrorKind};
    use crate::models::{Activity, Actor, Resource, TimeGrid};
    use std::time::Duration;

    /// Pins named variables before solving and reports any assignment as
    /// merely feasible. `slack` is added to the `makespan` variable.
    struct PinnedEngine {
        inner: PumpkinEngine,
        pins: Vec<(&'static str, i64)>,
        slack: i64,
    }

    impl PinnedEngine {
        fn new(pins: Vec<(&'static str, i64)>, slack: i64) -> Self {
            Self {
                inner: PumpkinEngine::new(),
                pins,
                slack,
            }
        }

        fn find(&self, name: &str) -> VarHandle {
            (0..self.inner.var_count())
                .map(VarHandle::new)
                .find(|&v| self.inner.var_name(v) == Some(name))
                .unwrap()
        }
    }

    impl ConstraintEngine for PinnedEngine {
        fn new_bool_var(&mut self, name: &str) -> VarHandle {
            self.inner.new_bool_var(name)
        }

        fn new_int_var(&mut self, lb: i64, ub: i64, name: &str) -> VarHandle {
            self.inner.new_int_var(lb, ub, name)
        }

        fn add_linear_constraint(&mut self, constraint: LinearConstraint) {
            self.inner.add_linear_constraint(constraint);
        }

        fn add_conditional_constraint(&mut self, condition: Literal, constraint: LinearConstraint) {
            self.inner.add_conditional_constraint(condition, constraint);
        }

        fn set_objective(&mut self, terms: Vec<(VarHandle, i64)>, direction: Direction) {
            self.inner.set_objective(terms, direction);
        }

        fn solve(&mut self, time_limit: Duration) -> EngineSolution {
            for (name, value) in self.pins.clone() {
                let var = self.find(name);
                self.inner.add_linear_constraint(LinearConstraint::fix(var, value));
            }
            let mut solution = self.inner.solve(time_limit);
            assert!(solution.status.has_solution());
            solution.status = SolveStatus::Feasible;
            if self.slack != 0 {
                let makespan = self.find("makespan");
                solution.values[makespan.index()] += self.slack;
                solution.objective_value = solution.objective_value.map(|v| v + self.slack);
            }
            solution
        }

        fn var_count(&self) -> usize {
            self.inner.var_count()
        }

        fn constraint_count(&self) -> usize {
            self.inner.constraint_count()
        }
    }

    /// Two days of 16 half-hour slots from 08:00; three professors, two
    /// rooms, four courses.
    fn university() -> ProblemInstance {
        let grid = TimeGrid::new(2, 16, 30)
            .with_day_start(8, 0)
            .with_clock_period("morning", 8, 0, 1.0)
            .with_clock_period("afternoon", 12, 0, 1.1)
            .with_clock_period("night", 17, 0, 1.5);

        ProblemInstance::new("university", grid)
            .with_activity(
                Activity::new("Math101", 4)
                    .with_capability("basic")
                    .with_base_value(5000.0),
            )
            .with_activity(
                Activity::new("Physics101", 6)
                    .with_capability("basic")
                    .with_capability("lab_equipment")
                    .with_base_value(7500.0),
            )
            .with_activity(
                Activity::new("Chemistry101", 12)
                    .with_capability("basic")
                    .with_capability("lab_equipment")
                    .with_base_value(12000.0),
            )
            .with_activity(
                Activity::new("Biology101", 10)
                    .with_capability("basic")
                    .with_base_value(9000.0),
            )
            .with_resource(
                Resource::new("Room101")
                    .with_capability("basic")
                    .with_capability("projector")
                    .with_setup_time(2)
                    .with_costs(150.0, 50.0),
            )
            .with_resource(
                Resource::new("Room102")
                    .with_capability("basic")
                    .with_capability("lab_equipment")
                    .with_setup_time(3)
                    .with_costs(200.0, 60.0),
            )
            .with_actor(Actor::new("Prof_Smith").with_hourly_cost(400.0).with_claim("Math101", 4))
            .with_actor(Actor::new("Prof_Jones").with_hourly_cost(450.0).with_claim("Physics101", 6))
            .with_actor(
                Actor::new("Prof_Cohen")
                    .with_hourly_cost(500.0)
                    .with_claim("Chemistry101", 13)
                    .with_claim("Biology101", 7),
            )
    }

    fn config() -> SolveConfig {
        SolveConfig::default().with_time_limit(Duration::from_secs(30))
    }

    #[test]
    fn test_university_net_value() {
        let outcome = CpScheduler::new(config()).solve(&university()).unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
        let schedule = outcome.schedule.unwrap();
        assert!((schedule.total_objective_value - 20090.0).abs() < 1e-6);
        assert_eq!(schedule.placement_count(), 4);

        let chem = schedule.placement_for_activity("Chemistry101").unwrap();
        let bio = schedule.placement_for_activity("Biology101").unwrap();
        let math = schedule.placement_for_activity("Math101").unwrap();
        assert_eq!(chem.resource_id, "Room102");
        assert_eq!(bio.resource_id, "Room101");
        assert_ne!(chem.day, bio.day);
        assert_eq!(math.period.as_deref(), Some("afternoon"));
        assert_eq!(math.actor_id.as_deref(), Some("Prof_Smith"));
        assert!((math.net_value - 4000.0).abs() < 1e-6);

        // Records come back ordered by (day, start_slot).
        let order: Vec<_> = schedule.records.iter().map(|p| (p.day, p.start_slot)).collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
    }

    #[test]
    fn test_university_slot_cover_agrees() {
        let config = config().with_overlap_encoding(OverlapEncoding::SlotCover);
        let outcome = CpScheduler::new(config).solve(&university()).unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert!((outcome.objective_value().unwrap() - 20090.0).abs() < 1e-6);
    }

    #[test]
    fn test_idempotent() {
        let scheduler = CpScheduler::new(config());
        let first = scheduler.solve(&university()).unwrap();
        let second = scheduler.solve(&university()).unwrap();
        assert_eq!(first.objective_value(), second.objective_value());
        let ids = |o: &SolveOutcome| {
            o.schedule
                .as_ref()
                .map(|s| {
                    s.records
                        .iter()
                        .map(|p| (p.activity_id.clone(), p.resource_id.clone(), p.day, p.start_slot))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_exactly_filled_horizon() {
        let inst = ProblemInstance::new("filled", TimeGrid::new(1, 6, 60))
            .with_activity(Activity::new("A", 6).with_base_value(10.0))
            .with_activity(Activity::new("B", 3).with_base_value(10.0))
            .with_activity(Activity::new("C", 3).with_base_value(10.0))
            .with_resource(Resource::new("R1"))
            .with_resource(Resource::new("R2"));
        let outcome = CpScheduler::new(config()).solve(&inst).unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
        let schedule = outcome.schedule.unwrap();
        let busy = schedule.busy_slots_by_resource();
        assert_eq!(busy.values().copied().collect::<Vec<_>>(), vec![6, 6]);
        assert!((schedule.total_objective_value - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_unsatisfiable_capability() {
        let inst = ProblemInstance::new("cap", TimeGrid::new(1, 8, 60))
            .with_activity(Activity::new("A", 2).with_capability("cryo"))
            .with_activity(Activity::new("B", 2))
            .with_resource(Resource::new("R").with_capability("basic"));
        let outcome = CpScheduler::new(config()).solve(&inst).unwrap();
        assert_eq!(outcome.status, SolveStatus::Infeasible);
        assert!(outcome.schedule.is_none());
    }

    #[test]
    fn test_actor_overflow() {
        let inst = ProblemInstance::new("overflow", TimeGrid::new(1, 8, 60))
            .with_activity(Activity::new("A", 5))
            .with_activity(Activity::new("B", 5))
            .with_resource(Resource::new("R1"))
            .with_resource(Resource::new("R2"))
            .with_actor(Actor::new("P").with_claim("A", 5).with_claim("B", 5));
        let outcome = CpScheduler::new(config()).solve(&inst).unwrap();
        assert_eq!(outcome.status, SolveStatus::Infeasible);

        // Without actor exclusivity both fit, one per resource.
        let relaxed = config().with_rules(RuleSet {
            actor_exclusivity: false,
            ..RuleSet::default()
        });
        let outcome = CpScheduler::new(relaxed).solve(&inst).unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
    }

    #[test]
    fn test_dependency_chain_makespan() {
        let inst = ProblemInstance::new("chain", TimeGrid::new(1, 12, 60))
            .with_activity(Activity::new("A", 2))
            .with_activity(Activity::new("B", 3).with_dependency("A"))
            .with_activity(Activity::new("C", 1).with_dependency("B"))
            .with_activity(Activity::new("D", 4))
            .with_resource(Resource::new("R1"))
            .with_resource(Resource::new("R2"));
        let config = config().with_objective(ObjectiveKind::Makespan);
        let outcome = CpScheduler::new(config).solve(&inst).unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
        let schedule = outcome.schedule.unwrap();
        assert_eq!(schedule.total_objective_value, 6.0);

        let end = |id: &str| schedule.placement_for_activity(id).map(|p| p.end_slot).unwrap();
        let start = |id: &str| schedule.placement_for_activity(id).map(|p| p.start_slot).unwrap();
        assert!(end("A") <= start("B"));
        assert!(end("B") <= start("C"));
    }

    #[test]
    fn test_weighted_completion_prefers_priority() {
        use crate::models::Priority;
        let inst = ProblemInstance::new("weighted", TimeGrid::new(1, 8, 60))
            .with_activity(Activity::new("Low", 2).with_priority(Priority::Low))
            .with_activity(Activity::new("Hot", 2).with_priority(Priority::Critical))
            .with_resource(Resource::new("R"));
        let config = config().with_objective(ObjectiveKind::WeightedCompletion);
        let outcome = CpScheduler::new(config).solve(&inst).unwrap();
        let schedule = outcome.schedule.unwrap();
        // Hot first: 100·4 + 4·2 + 1·4 = 412
        assert_eq!(schedule.total_objective_value, 412.0);
        assert_eq!(schedule.records[0].activity_id, "Hot");
    }

    #[test]
    fn test_construction_errors_skip_solve() {
        let inst = ProblemInstance::new("broken", TimeGrid::new(1, 8, 60))
            .with_activity(Activity::new("A", 2).with_dependency("Ghost"))
            .with_activity(Activity::new("A", 0))
            .with_resource(Resource::new("R"));
        let err = CpScheduler::new(config()).solve(&inst).unwrap_err();
        let kinds: Vec<_> = err.construction_errors().iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&ConstructionErrorKind::DuplicateId));
        assert!(kinds.contains(&ConstructionErrorKind::InvalidDuration));
        assert!(kinds.contains(&ConstructionErrorKind::UnknownDependency));
    }

    #[test]
    fn test_zero_time_limit() {
        let config = SolveConfig::default().with_time_limit(Duration::ZERO);
        let outcome = CpScheduler::new(config).solve(&university()).unwrap();
        assert!(matches!(
            outcome.status,
            SolveStatus::Timeout | SolveStatus::Feasible
        ));
        assert!(!outcome.is_optimal());
    }

    #[test]
    fn test_feasible_net_value_is_cross_checked() {
        let grid = TimeGrid::new(1, 6, 60)
            .with_period("early", 0, 1.0)
            .with_period("late", 3, 2.0);
        let inst = ProblemInstance::new("pinned", grid)
            .with_activity(Activity::new("A", 2).with_base_value(10.0))
            .with_resource(Resource::new("R"));

        let best = CpScheduler::new(config()).solve(&inst).unwrap();
        assert_eq!(best.objective_value(), Some(20.0));

        // A pinned to the early period is worth only 10.
        let engine = PinnedEngine::new(vec![("x[A,R,0,0]", 1)], 0);
        let outcome = CpScheduler::new(config()).solve_with(&inst, engine).unwrap();
        assert!(!outcome.is_optimal());
        let schedule = outcome.schedule.unwrap();
        assert_eq!(schedule.status, SolveStatus::Feasible);
        assert!((schedule.total_objective_value - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_feasible_makespan_is_cross_checked() {
        let inst = ProblemInstance::new("pinned", TimeGrid::new(1, 8, 60))
            .with_activity(Activity::new("A", 2))
            .with_activity(Activity::new("B", 3))
            .with_resource(Resource::new("R"));
        let config = config().with_objective(ObjectiveKind::Makespan);

        // B pinned to [4,7) pushes the makespan to 7; the engine reports 8.
        let engine = PinnedEngine::new(vec![("x[B,R,0,4]", 1)], 1);
        let outcome = CpScheduler::new(config).solve_with(&inst, engine).unwrap();
        assert!(!outcome.is_optimal());
        let schedule = outcome.schedule.unwrap();
        assert_eq!(schedule.status, SolveStatus::Feasible);
        assert_eq!(schedule.total_objective_value, 7.0);
    }

    #[test]
    fn test_reported_below_recomputed_is_inconsistent() {
        let inst = ProblemInstance::new("pinned", TimeGrid::new(1, 8, 60))
            .with_activity(Activity::new("A", 2))
            .with_activity(Activity::new("B", 3))
            .with_resource(Resource::new("R"));
        let config = config().with_objective(ObjectiveKind::Makespan);
        let engine = PinnedEngine::new(vec![("x[B,R,0,4]", 1)], -1);
        let err = CpScheduler::new(config).solve_with(&inst, engine).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InternalConsistency { rule: "objective", .. }
        ));
    }

    #[test]
    fn test_invalid_config_rejected_before_solving() {
        let mut config = config();
        config.money_scale = 0;
        let err = CpScheduler::new(config).solve(&university()).unwrap_err();
        assert!(matches!(err, ScheduleError::Config(ConfigError::Invalid(_))));

        let mut config = SolveConfig::default();
        config.time_limit_secs = f64::NAN;
        let err = CpScheduler::new(config).solve(&university()).unwrap_err();
        assert!(matches!(err, ScheduleError::Config(_)));
    }

    #[test]
    fn test_huge_time_limit_solves() {
        let mut config = SolveConfig::default();
        config.time_limit_secs = 1e20;
        let outcome = CpScheduler::new(config).solve(&university()).unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
    }

    #[test]
    fn test_huge_amounts_are_construction_errors() {
        let inst = ProblemInstance::new("huge", TimeGrid::new(1, 4, 60))
            .with_activity(Activity::new("A", 1).with_base_value(1e17))
            .with_activity(Activity::new("B", 1).with_base_value(1e17))
            .with_resource(Resource::new("R"));
        let err = CpScheduler::new(config()).solve(&inst).unwrap_err();
        let kinds: Vec<_> = err.construction_errors().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ConstructionErrorKind::InvalidAmount]);
    }

    #[test]
    fn test_placement_cost_objective() {
        let inst = university()
            .with_activity(
                Activity::new("Seminar", 2)
                    .with_preparation_time(1)
                    .with_distance("Room101", 4)
                    .with_distance("Room102", 1),
            );
        let config = config().with_objective(ObjectiveKind::PlacementCost);
        let outcome = CpScheduler::new(config).solve(&inst).unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
        let schedule = outcome.schedule.unwrap();
        // Durations 4 + 6 + 12 + 10 + 2, one preparation slot, distance 1.
        assert_eq!(schedule.total_objective_value, 36.0);
        assert_eq!(
            schedule.placement_for_activity("Seminar").map(|p| p.resource_id.as_str()),
            Some("Room102")
        );
    }

    #[test]
    fn test_outcome_serializes_warnings() {
        let inst = ProblemInstance::new("warn", TimeGrid::new(1, 8, 60))
            .with_activity(Activity::new("A", 2).with_capability("lab"))
            .with_resource(Resource::new("Lab").with_capability("lab"))
            .with_resource(Resource::new("Hall"));
        let outcome = CpScheduler::new(config()).solve(&inst).unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["warnings"][0]["kind"], "unusable_resource");
        assert_eq!(json["warnings"][0]["entity_id"], "Hall");
        assert_eq!(json["status"], "OPTIMAL");
    }

    #[test]
    fn test_warnings_returned() {
        let inst = ProblemInstance::new("warn", TimeGrid::new(1, 8, 60))
            .with_activity(Activity::new("A", 2).with_capability("lab"))
            .with_activity(Activity::new("B", 2).with_capability("lab").with_dependency("A"))
            .with_resource(Resource::new("Lab").with_capability("lab"))
            .with_resource(Resource::new("Hall"));
        let config = config().with_rules(RuleSet {
            dependency_ordering: false,
            ..RuleSet::default()
        });
        let outcome = CpScheduler::new(config).solve(&inst).unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert_eq!(outcome.warnings.len(), 2);
    }
}
