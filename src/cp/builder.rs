//! Constraint-model builder.
//!
//! Translates a validated [`Catalog`] into engine variables, constraints and
//! an objective. Nothing is evaluated here: the builder only states the
//! model.
//!
//! # Rule families
//!
//! | Rule | Toggle | Encoding |
//! |------|--------|----------|
//! | Exactly-once assignment | always | `Σ x(a,·,·,·) = 1` |
//! | Capability compatibility | `capability_pruning` | `Σ x(a,r,·,·) ≤ 0` per incompatible pair |
//! | Horizon-fit | always | `x = 0` when `t + dur + setup > S` |
//! | Resource no-overlap | always | [`ExclusiveSpans`] per resource |
//! | Actor no-overlap | `actor_exclusivity` | [`ExclusiveSpans`] per actor |
//! | Dependency ordering | `dependency_ordering` | `start_a ≥ end_p` over integers |
//!
//! # Reference
//! - Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"

use tracing::debug;

use super::arena::{PlacementArena, PlacementKey};
use super::objective::{placement_cost, placement_value, to_minor_units};
use super::rules::ExclusiveSpans;
use crate::config::{ObjectiveKind, SolveConfig};
use crate::engine::{ConstraintEngine, Direction, LinearConstraint, VarHandle, VALUE_LIMIT};
use crate::error::{ConstructionError, ConstructionErrorKind, Result, ScheduleError};
use crate::models::{Catalog, SlotSpan};
use crate::validation::{ConstructionWarning, WarningKind};

/// Integer start/end variables on the global slot axis.
#[derive(Debug, Clone)]
pub struct TemporalVars {
    /// `start_a = Σ (day·S + t)·x`, per activity.
    pub starts: Vec<VarHandle>,
    /// `end_a = start_a + duration_a + Σ setup_r·x`, per activity.
    pub ends: Vec<VarHandle>,
    /// `makespan ≥ end_a`; present only for temporal objectives.
    pub makespan: Option<VarHandle>,
}

/// Constraint counts per rule family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelStats {
    pub exactly_once: usize,
    pub capability: usize,
    pub horizon: usize,
    pub resource_overlap: usize,
    pub actor_overlap: usize,
    pub temporal_links: usize,
    pub dependencies: usize,
    pub makespan: usize,
}

impl ModelStats {
    /// Total constraints posted.
    pub fn total(&self) -> usize {
        self.exactly_once
            + self.capability
            + self.horizon
            + self.resource_overlap
            + self.actor_overlap
            + self.temporal_links
            + self.dependencies
            + self.makespan
    }
}

/// Handles and metadata of a built model.
#[derive(Debug, Clone)]
pub struct BuiltModel {
    /// Placement variables.
    pub arena: PlacementArena,
    /// Start/end variables, when ordering or a temporal objective needs them.
    pub temporal: Option<TemporalVars>,
    /// Objective the model optimizes.
    pub objective: ObjectiveKind,
    /// Optimization direction.
    pub direction: Direction,
    /// Number of objective terms.
    pub objective_terms: usize,
    /// Construction warnings, validation's included.
    pub warnings: Vec<ConstructionWarning>,
    /// Constraint counts.
    pub stats: ModelStats,
}

/// Builds the constraint model for one solve cycle.
///
/// # Example
/// ```
/// use u_timetable::config::SolveConfig;
/// use u_timetable::cp::ModelBuilder;
/// use u_timetable::engine::{PumpkinEngine, ConstraintEngine};
/// use u_timetable::models::{Activity, Catalog, ProblemInstance, Resource, TimeGrid};
///
/// let instance = ProblemInstance::new("demo", TimeGrid::new(1, 8, 60))
///     .with_activity(Activity::new("A", 3).with_base_value(10.0))
///     .with_resource(Resource::new("R"));
/// let catalog = Catalog::new(&instance).unwrap();
/// let config = SolveConfig::default();
///
/// let mut engine = PumpkinEngine::new();
/// let model = ModelBuilder::new(&catalog, &config).build(&mut engine).unwrap();
/// assert_eq!(model.arena.len(), 8);
/// assert_eq!(engine.constraint_count(), model.stats.total());
/// ```
pub struct ModelBuilder<'c, 'a> {
    catalog: &'c Catalog<'a>,
    config: &'c SolveConfig,
}

impl<'c, 'a> ModelBuilder<'c, 'a> {
    /// Creates a builder.
    pub fn new(catalog: &'c Catalog<'a>, config: &'c SolveConfig) -> Self {
        Self { catalog, config }
    }

    /// Whether integer start/end variables are needed.
    fn needs_temporal(&self) -> bool {
        let has_dependencies =
            (0..self.catalog.activities().len()).any(|a| !self.catalog.dependencies(a).is_empty());
        self.config.objective.is_temporal()
            || (self.config.rules.dependency_ordering && has_dependencies)
    }

    /// Whether a placement is ruled out by capability or horizon.
    fn is_forbidden(&self, key: PlacementKey) -> bool {
        let rules = &self.config.rules;
        (rules.capability_pruning && !self.catalog.is_compatible(key.activity, key.resource))
            || !self
                .catalog
                .grid()
                .fits(key.start_slot, self.catalog.span_len(key.activity, key.resource))
    }

    /// Creates variables and posts every active rule family.
    ///
    /// # Errors
    /// [`ScheduleError::Construction`] with [`ConstructionErrorKind::InvalidAmount`]
    /// when objective coefficients cannot be represented within
    /// [`VALUE_LIMIT`].
    pub fn build<E: ConstraintEngine>(&self, engine: &mut E) -> Result<BuiltModel> {
        let catalog = self.catalog;
        let rules = self.config.rules;
        let arena = PlacementArena::create(engine, catalog);
        let open: Vec<bool> = arena.iter().map(|(k, _)| !self.is_forbidden(k)).collect();
        let mut stats = ModelStats::default();

        // 1. Exactly-once assignment
        for a in 0..catalog.activities().len() {
            engine.add_linear_constraint(LinearConstraint::exactly_one(
                arena.activity_vars(a).map(|(_, v)| v),
            ));
            stats.exactly_once += 1;
        }

        // 2. Capability compatibility
        if rules.capability_pruning {
            for a in 0..catalog.activities().len() {
                for r in 0..catalog.resources().len() {
                    if catalog.is_compatible(a, r) {
                        continue;
                    }
                    let vars: Vec<(VarHandle, i64)> = arena
                        .activity_vars(a)
                        .filter(|(k, _)| k.resource == r)
                        .map(|(_, v)| (v, 1))
                        .collect();
                    engine.add_linear_constraint(LinearConstraint::le(vars, 0));
                    stats.capability += 1;
                }
            }
        }

        // 3. Horizon-fit
        let grid = catalog.grid();
        for (key, var) in arena.iter() {
            let len = catalog.span_len(key.activity, key.resource);
            if !grid.fits(key.start_slot, len) {
                engine.add_linear_constraint(LinearConstraint::fix(var, 0));
                stats.horizon += 1;
            }
        }

        // 4. Resource no-overlap
        let mut by_resource = vec![ExclusiveSpans::new(); catalog.resources().len()];
        for (i, (key, var)) in arena.iter().enumerate() {
            if open[i] {
                let len = catalog.span_len(key.activity, key.resource);
                by_resource[key.resource].push(
                    key.activity,
                    key.day,
                    SlotSpan::new(key.start_slot, len),
                    var,
                );
            }
        }
        for spans in &by_resource {
            stats.resource_overlap += spans.post(engine, self.config.overlap_encoding);
        }

        // 5. Actor no-overlap
        if rules.actor_exclusivity {
            let mut by_actor = vec![ExclusiveSpans::new(); catalog.actors().len()];
            for (i, (key, var)) in arena.iter().enumerate() {
                let Some(actor) = catalog.assigned_actor_idx(key.activity) else {
                    continue;
                };
                if let (true, Some(len)) =
                    (open[i], catalog.actor_span_len(key.activity, key.resource))
                {
                    by_actor[actor].push(
                        key.activity,
                        key.day,
                        SlotSpan::new(key.start_slot, len),
                        var,
                    );
                }
            }
            for spans in &by_actor {
                stats.actor_overlap += spans.post(engine, self.config.overlap_encoding);
            }
        }

        // 6. Start/end variables and dependency ordering
        let mut warnings = catalog.warnings().to_vec();
        let temporal = self
            .needs_temporal()
            .then(|| self.post_temporal(engine, &arena, &open, &mut stats));

        if !rules.dependency_ordering {
            for (a, activity) in catalog.activities().iter().enumerate() {
                if !catalog.dependencies(a).is_empty() {
                    warnings.push(ConstructionWarning::new(
                        WarningKind::DependenciesIgnored,
                        &activity.id,
                        format!(
                            "{} dependencies ignored: dependency ordering is disabled",
                            catalog.dependencies(a).len()
                        ),
                    ));
                }
            }
        }

        // 7. Objective
        let (terms, direction) = match self.config.objective {
            ObjectiveKind::NetValue => (self.net_value_terms(&arena, &open)?, Direction::Maximize),
            ObjectiveKind::PlacementCost => {
                let terms: Vec<(VarHandle, i64)> = arena
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| open[i])
                    .map(|(_, (key, var))| (var, placement_cost(catalog, key.activity, key.resource)))
                    .filter(|&(_, c)| c != 0)
                    .collect();
                (terms, Direction::Minimize)
            }
            ObjectiveKind::Makespan | ObjectiveKind::WeightedCompletion => {
                let mut terms = Vec::new();
                if let Some(t) = &temporal {
                    if let Some(m) = t.makespan {
                        let weight = match self.config.objective {
                            ObjectiveKind::Makespan => 1,
                            _ => self.config.makespan_weight,
                        };
                        terms.push((m, weight));
                    }
                    if self.config.objective == ObjectiveKind::WeightedCompletion {
                        for (activity, &end) in catalog.activities().iter().zip(&t.ends) {
                            terms.push((end, activity.priority.weight()));
                        }
                    }
                }
                (terms, Direction::Minimize)
            }
        };
        self.check_objective_range(&terms)?;
        let objective_terms = terms.len();
        engine.set_objective(terms, direction);

        debug!(
            instance = catalog.id(),
            placements = arena.len(),
            open = open.iter().filter(|&&o| o).count(),
            exactly_once = stats.exactly_once,
            capability = stats.capability,
            horizon = stats.horizon,
            resource_overlap = stats.resource_overlap,
            actor_overlap = stats.actor_overlap,
            dependencies = stats.dependencies,
            objective_terms,
            "model built"
        );

        Ok(BuiltModel {
            arena,
            temporal,
            objective: self.config.objective,
            direction,
            objective_terms,
            warnings,
            stats,
        })
    }

    fn amount_error(&self, entity_id: &str, field: &'static str, message: String) -> ScheduleError {
        ScheduleError::Construction {
            instance: self.catalog.id().to_string(),
            errors: vec![ConstructionError::new(
                ConstructionErrorKind::InvalidAmount,
                entity_id,
                field,
                message,
            )],
        }
    }

    /// Net value per open placement in minor units.
    fn net_value_terms(&self, arena: &PlacementArena, open: &[bool]) -> Result<Vec<(VarHandle, i64)>> {
        let catalog = self.catalog;
        let scale = self.config.money_scale;
        let mut terms = Vec::new();
        for (i, (key, var)) in arena.iter().enumerate() {
            if !open[i] {
                continue;
            }
            let value = placement_value(catalog, key.activity, key.resource, key.start_slot);
            let coefficient = to_minor_units(value.net_value, scale)
                .filter(|c| c.abs() <= VALUE_LIMIT)
                .ok_or_else(|| {
                    self.amount_error(
                        &catalog.activities()[key.activity].id,
                        "base_value",
                        format!(
                            "net value {} × money_scale {scale} exceeds ±{VALUE_LIMIT} minor units",
                            value.net_value
                        ),
                    )
                })?;
            if coefficient != 0 {
                terms.push((var, coefficient));
            }
        }
        Ok(terms)
    }

    /// Rejects objectives whose summed coefficients leave the engine range.
    fn check_objective_range(&self, terms: &[(VarHandle, i64)]) -> Result<()> {
        let horizon = i128::from(self.catalog.grid().total_slots());
        let reach = match self.config.objective {
            ObjectiveKind::NetValue | ObjectiveKind::PlacementCost => 1,
            ObjectiveKind::Makespan | ObjectiveKind::WeightedCompletion => horizon,
        };
        let total: i128 = terms.iter().map(|&(_, c)| i128::from(c).abs() * reach).sum();
        if total > i128::from(VALUE_LIMIT) {
            let field = match self.config.objective {
                ObjectiveKind::NetValue => "base_value",
                ObjectiveKind::PlacementCost => "preparation_time",
                ObjectiveKind::Makespan | ObjectiveKind::WeightedCompletion => "makespan_weight",
            };
            return Err(self.amount_error(
                self.catalog.id(),
                field,
                format!(
                    "{:?} objective reaches {total}, beyond ±{VALUE_LIMIT}",
                    self.config.objective
                ),
            ));
        }
        Ok(())
    }

    fn post_temporal<E: ConstraintEngine>(
        &self,
        engine: &mut E,
        arena: &PlacementArena,
        open: &[bool],
        stats: &mut ModelStats,
    ) -> TemporalVars {
        let catalog = self.catalog;
        let grid = catalog.grid();
        let horizon = grid.total_slots();
        let n = catalog.activities().len();

        let mut starts = Vec::with_capacity(n);
        let mut ends = Vec::with_capacity(n);
        for activity in catalog.activities() {
            starts.push(engine.new_int_var(0, horizon, &format!("start[{}]", activity.id)));
            ends.push(engine.new_int_var(0, horizon, &format!("end[{}]", activity.id)));
        }

        let block = arena.len() / arena.num_activities().max(1);
        for (a, activity) in catalog.activities().iter().enumerate() {
            let offset = a * block;
            let placed: Vec<(PlacementKey, VarHandle)> = arena
                .activity_vars(a)
                .enumerate()
                .filter(|&(i, _)| open[offset + i])
                .map(|(_, kv)| kv)
                .collect();

            // start_a − Σ (day·S + t)·x = 0
            let mut start_terms = vec![(starts[a], 1)];
            start_terms.extend(
                placed
                    .iter()
                    .map(|(k, v)| (*v, -grid.global_slot(k.day, k.start_slot)))
                    .filter(|&(_, c)| c != 0),
            );
            engine.add_linear_constraint(LinearConstraint::eq(start_terms, 0));

            // end_a − start_a − Σ setup_r·x = duration_a
            let mut end_terms = vec![(ends[a], 1), (starts[a], -1)];
            end_terms.extend(
                placed
                    .iter()
                    .map(|(k, v)| (*v, -catalog.resources()[k.resource].setup_time))
                    .filter(|&(_, c)| c != 0),
            );
            engine.add_linear_constraint(LinearConstraint::eq(end_terms, activity.duration));
            stats.temporal_links += 2;
        }

        if self.config.rules.dependency_ordering {
            for a in 0..n {
                for &p in catalog.dependencies(a) {
                    engine.add_linear_constraint(LinearConstraint::ge(
                        vec![(starts[a], 1), (ends[p], -1)],
                        0,
                    ));
                    stats.dependencies += 1;
                }
            }
        }

        let makespan = self.config.objective.is_temporal().then(|| {
            let m = engine.new_int_var(0, horizon, "makespan");
            for &end in &ends {
                engine.add_linear_constraint(LinearConstraint::ge(vec![(m, 1), (end, -1)], 0));
                stats.makespan += 1;
            }
            m
        });

        TemporalVars {
            starts,
            ends,
            makespan,
        }
    }
}
