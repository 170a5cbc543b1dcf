//! [`ConstraintEngine`] over the Pumpkin lazy-clause-generation solver.
//!
//! Posted variables and constraints are recorded as they arrive and replayed
//! into a fresh [`Solver`] on every [`solve`](ConstraintEngine::solve), so a
//! call never sees state from an earlier one.
//!
//! # Mapping
//!
//! | Model | Pumpkin |
//! |-------|---------|
//! | Boolean variable | integer domain `[0, 1]` |
//! | `Σ ≤ b`, `Σ ≥ b` | `less_than_or_equals` (negated for `≥`) |
//! | `Σ = b` | `equals` |
//! | Conditional constraint | `implied_by` on the literal `[x ≥ 1]` or its negation |
//! | Objective | `Σ c·x − obj = 0`, then linear SAT-UNSAT search on `obj` |
//! | Time limit | `TimeBudget` termination |
//!
//! Pumpkin domains are 32-bit. Bounds, coefficients and the objective range
//! must fit within [`VALUE_LIMIT`]; anything larger is reported as
//! [`SolveStatus::Error`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use pumpkin_solver::constraints::{self, Constraint};
use pumpkin_solver::optimisation::linear_sat_unsat::LinearSatUnsat;
use pumpkin_solver::optimisation::OptimisationDirection;
use pumpkin_solver::predicate;
use pumpkin_solver::results::{
    OptimisationResult, ProblemSolution, SatisfactionResult, SolutionReference,
};
use pumpkin_solver::termination::TimeBudget;
use pumpkin_solver::variables::{DomainId, Literal as Reified, TransformableVariable};
use pumpkin_solver::Solver;
use tracing::debug;

use super::{
    ConstraintEngine, Direction, EngineSolution, LinearConstraint, Literal, Relation, SolveStatus,
    VarHandle, VALUE_LIMIT,
};

#[derive(Debug, Clone)]
struct VarDecl {
    name: String,
    lb: i64,
    ub: i64,
    is_bool: bool,
}

#[derive(Debug, Clone)]
struct Posted {
    condition: Option<Literal>,
    constraint: LinearConstraint,
}

/// Why a recorded model never reached the search.
enum Rejected {
    Invalid(String),
    Infeasible,
}

/// Engine backed by [`pumpkin_solver`].
///
/// # Example
/// ```
/// use std::time::Duration;
/// use u_timetable::engine::{ConstraintEngine, Direction, LinearConstraint, PumpkinEngine, SolveStatus};
///
/// let mut engine = PumpkinEngine::new();
/// let a = engine.new_bool_var("a");
/// let b = engine.new_bool_var("b");
/// engine.add_linear_constraint(LinearConstraint::at_most_one([a, b]));
/// engine.set_objective(vec![(a, 3), (b, 5)], Direction::Maximize);
///
/// let solution = engine.solve(Duration::from_secs(5));
/// assert_eq!(solution.status, SolveStatus::Optimal);
/// assert_eq!(solution.objective_value, Some(5));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PumpkinEngine {
    vars: Vec<VarDecl>,
    posted: Vec<Posted>,
    objective: Option<(Vec<(VarHandle, i64)>, Direction)>,
    invalid: Option<String>,
}

impl PumpkinEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name given at creation.
    pub fn var_name(&self, var: VarHandle) -> Option<&str> {
        self.vars.get(var.index()).map(|v| v.name.as_str())
    }

    fn new_var(&mut self, lb: i64, ub: i64, is_bool: bool, name: &str) -> VarHandle {
        let handle = VarHandle::new(self.vars.len());
        self.vars.push(VarDecl {
            name: name.to_string(),
            lb,
            ub,
            is_bool,
        });
        handle
    }

    fn reject(&mut self, message: String) {
        if self.invalid.is_none() {
            self.invalid = Some(message);
        }
    }

    fn check_handle(&mut self, var: VarHandle) -> bool {
        if var.index() < self.vars.len() {
            return true;
        }
        let message = format!("unknown variable {var} ({} variables exist)", self.vars.len());
        self.reject(message);
        false
    }

    fn post(&mut self, condition: Option<Literal>, constraint: LinearConstraint) {
        let mut valid = true;
        for &(v, _) in &constraint.terms {
            valid &= self.check_handle(v);
        }
        if let Some(lit) = condition {
            if !self.check_handle(lit.var) {
                valid = false;
            } else if !self.vars[lit.var.index()].is_bool {
                self.reject(format!("condition {} is not a boolean", lit.var));
                valid = false;
            }
        }
        if valid {
            self.posted.push(Posted {
                condition,
                constraint,
            });
        }
    }

    /// Objective coefficients summed per variable, zeros dropped.
    fn objective_coefficients(terms: &[(VarHandle, i64)]) -> Vec<(usize, i64)> {
        let mut merged: HashMap<usize, i64> = HashMap::new();
        for &(v, c) in terms {
            let entry = merged.entry(v.index()).or_insert(0);
            *entry = entry.saturating_add(c);
        }
        let mut merged: Vec<(usize, i64)> = merged.into_iter().filter(|&(_, c)| c != 0).collect();
        merged.sort_unstable();
        merged
    }

    /// Largest magnitude a linear row over `terms` can reach, with `extra`
    /// added. Pumpkin's linear propagators sum bounds in 32 bits, so every
    /// row must stay within [`VALUE_LIMIT`].
    fn row_magnitude(&self, terms: impl Iterator<Item = (usize, i64)>, extra: i128) -> i128 {
        terms
            .map(|(v, c)| {
                let reach = i128::from(self.vars[v].lb.abs().max(self.vars[v].ub.abs()));
                i128::from(c).abs() * reach
            })
            .sum::<i128>()
            + extra
    }

    /// Range the objective can take over the variable domains.
    fn objective_range(&self, coefficients: &[(usize, i64)]) -> (i128, i128) {
        coefficients.iter().fold((0i128, 0i128), |(lo, hi), &(v, c)| {
            let (a, b) = (
                i128::from(c) * i128::from(self.vars[v].lb),
                i128::from(c) * i128::from(self.vars[v].ub),
            );
            (lo + a.min(b), hi + a.max(b))
        })
    }

    /// Replays the recorded model into `solver`.
    fn load(&self, solver: &mut Solver) -> Result<Vec<DomainId>, Rejected> {
        if let Some(message) = &self.invalid {
            return Err(Rejected::Invalid(message.clone()));
        }
        let mut domains = Vec::with_capacity(self.vars.len());
        for v in &self.vars {
            if v.lb > v.ub {
                return Err(Rejected::Infeasible);
            }
            let lb = narrow(v.lb, || format!("lower bound of '{}'", v.name))?;
            let ub = narrow(v.ub, || format!("upper bound of '{}'", v.name))?;
            domains.push(solver.new_named_bounded_integer(lb, ub, v.name.as_str()));
        }

        let mut conditions: HashMap<usize, Reified> = HashMap::new();
        for (i, p) in self.posted.iter().enumerate() {
            let magnitude = self.row_magnitude(
                p.constraint.terms.iter().map(|&(v, c)| (v.index(), c)),
                i128::from(p.constraint.bound).abs(),
            );
            if magnitude > i128::from(VALUE_LIMIT) {
                return Err(Rejected::Invalid(format!(
                    "constraint {i} reaches magnitude {magnitude}, beyond the engine range ±{VALUE_LIMIT}"
                )));
            }
            let mut terms = Vec::with_capacity(p.constraint.terms.len());
            for &(v, c) in &p.constraint.terms {
                if c == 0 {
                    continue;
                }
                let c = match p.constraint.relation {
                    Relation::Ge => c.checked_neg().unwrap_or(i64::MAX),
                    Relation::Le | Relation::Eq => c,
                };
                let c = narrow(c, || format!("coefficient of {v} in constraint {i}"))?;
                terms.push(domains[v.index()].scaled(c));
            }
            let bound = match p.constraint.relation {
                Relation::Ge => p.constraint.bound.checked_neg().unwrap_or(i64::MAX),
                Relation::Le | Relation::Eq => p.constraint.bound,
            };
            let bound = narrow(bound, || format!("bound of constraint {i}"))?;

            let condition = p.condition.map(|lit| {
                let positive = *conditions.entry(lit.var.index()).or_insert_with(|| {
                    let var = domains[lit.var.index()];
                    solver.new_literal_for_predicate(predicate![var >= 1])
                });
                if lit.positive {
                    positive
                } else {
                    !positive
                }
            });

            if terms.is_empty() {
                let holds = match p.constraint.relation {
                    Relation::Le | Relation::Ge => 0 <= bound,
                    Relation::Eq => bound == 0,
                };
                if holds {
                    continue;
                }
                // A failing empty body forbids its condition.
                let Some(lit) = p.condition else {
                    return Err(Rejected::Infeasible);
                };
                let var = domains[lit.var.index()];
                let forbid = if lit.positive {
                    constraints::less_than_or_equals(vec![var.scaled(1)], 0)
                } else {
                    constraints::less_than_or_equals(vec![var.scaled(-1)], -1)
                };
                if !post(solver, forbid, None) {
                    return Err(Rejected::Infeasible);
                }
                continue;
            }

            let ok = match p.constraint.relation {
                Relation::Le | Relation::Ge => {
                    post(solver, constraints::less_than_or_equals(terms, bound), condition)
                }
                Relation::Eq => post(solver, constraints::equals(terms, bound), condition),
            };
            if !ok {
                return Err(Rejected::Infeasible);
            }
        }
        Ok(domains)
    }

    fn read(domains: &[DomainId], solution: &impl ProblemSolution) -> Vec<i64> {
        domains
            .iter()
            .map(|&d| i64::from(solution.get_integer_value(d)))
            .collect()
    }
}

/// Posts a constraint, half-reified when a condition is given. `false`
/// means the root is already inconsistent.
fn post<C: Constraint>(solver: &mut Solver, constraint: C, condition: Option<Reified>) -> bool {
    let poster = solver.add_constraint(constraint);
    match condition {
        Some(literal) => poster.implied_by(literal).is_ok(),
        None => poster.post().is_ok(),
    }
}

fn narrow(value: i64, what: impl FnOnce() -> String) -> Result<i32, Rejected> {
    if value.abs() > VALUE_LIMIT {
        return Err(Rejected::Invalid(format!(
            "{} ({value}) exceeds the engine range ±{VALUE_LIMIT}",
            what()
        )));
    }
    i32::try_from(value).map_err(|_| Rejected::Invalid(format!("{} ({value}) is out of range", what())))
}

impl ConstraintEngine for PumpkinEngine {
    fn new_bool_var(&mut self, name: &str) -> VarHandle {
        self.new_var(0, 1, true, name)
    }

    fn new_int_var(&mut self, lb: i64, ub: i64, name: &str) -> VarHandle {
        self.new_var(lb, ub, false, name)
    }

    fn add_linear_constraint(&mut self, constraint: LinearConstraint) {
        self.post(None, constraint);
    }

    fn add_conditional_constraint(&mut self, condition: Literal, constraint: LinearConstraint) {
        self.post(Some(condition), constraint);
    }

    fn set_objective(&mut self, terms: Vec<(VarHandle, i64)>, direction: Direction) {
        for &(v, _) in &terms {
            self.check_handle(v);
        }
        self.objective = Some((terms, direction));
    }

    fn solve(&mut self, time_limit: Duration) -> EngineSolution {
        let started = Instant::now();
        let mut solver = Solver::default();

        let domains = match self.load(&mut solver) {
            Ok(domains) => domains,
            Err(Rejected::Invalid(message)) => {
                return EngineSolution {
                    message: Some(message),
                    ..EngineSolution::without_assignment(SolveStatus::Error)
                };
            }
            Err(Rejected::Infeasible) => {
                debug!("infeasible at root");
                return EngineSolution::without_assignment(SolveStatus::Infeasible);
            }
        };

        let objective = match &self.objective {
            Some((terms, direction)) => {
                let coefficients = Self::objective_coefficients(terms);
                let (lo, hi) = self.objective_range(&coefficients);
                let limit = i128::from(VALUE_LIMIT);
                let magnitude =
                    self.row_magnitude(coefficients.iter().copied(), lo.abs().max(hi.abs()));
                if lo < -limit || hi > limit || magnitude > limit {
                    return EngineSolution {
                        message: Some(format!(
                            "objective range [{lo}, {hi}] exceeds the engine range ±{VALUE_LIMIT}"
                        )),
                        ..EngineSolution::without_assignment(SolveStatus::Error)
                    };
                }
                // Both ends lie within ±VALUE_LIMIT.
                let (lo, hi) = (lo as i32, hi as i32);
                let objective_var = solver.new_named_bounded_integer(lo, hi, "objective");
                let mut terms = Vec::with_capacity(coefficients.len() + 1);
                for &(v, c) in &coefficients {
                    match narrow(c, || format!("objective coefficient of '{}'", self.vars[v].name)) {
                        Ok(c) => terms.push(domains[v].scaled(c)),
                        Err(Rejected::Invalid(message)) => {
                            return EngineSolution {
                                message: Some(message),
                                ..EngineSolution::without_assignment(SolveStatus::Error)
                            };
                        }
                        Err(Rejected::Infeasible) => {
                            return EngineSolution::without_assignment(SolveStatus::Infeasible);
                        }
                    }
                }
                terms.push(objective_var.scaled(-1));
                if !post(&mut solver, constraints::equals(terms, 0), None) {
                    return EngineSolution::without_assignment(SolveStatus::Infeasible);
                }
                Some((coefficients, *direction, objective_var))
            }
            None => None,
        };

        debug!(
            variables = self.vars.len(),
            constraints = self.posted.len(),
            "pumpkin search started"
        );

        let mut brancher = solver.default_brancher();
        let mut termination = TimeBudget::starting_now(time_limit);

        let (status, values) = match &objective {
            Some((_, direction, objective_var)) => {
                let objective_var = *objective_var;
                let direction = match direction {
                    Direction::Maximize => OptimisationDirection::Maximise,
                    Direction::Minimize => OptimisationDirection::Minimise,
                };
                let callback = move |_: &Solver, solution: SolutionReference<'_>, _: &_| {
                    debug!(
                        objective = solution.get_integer_value(objective_var),
                        "incumbent found"
                    );
                };
                match solver.optimise(
                    &mut brancher,
                    &mut termination,
                    LinearSatUnsat::new(direction, objective_var, callback),
                ) {
                    OptimisationResult::Optimal(solution) => {
                        (SolveStatus::Optimal, Self::read(&domains, &solution))
                    }
                    OptimisationResult::Satisfiable(solution) => {
                        (SolveStatus::Feasible, Self::read(&domains, &solution))
                    }
                    OptimisationResult::Unsatisfiable { .. } => {
                        (SolveStatus::Infeasible, Vec::new())
                    }
                    OptimisationResult::Unknown { .. } => (SolveStatus::Timeout, Vec::new()),
                }
            }
            None => match solver.satisfy(&mut brancher, &mut termination) {
                SatisfactionResult::Satisfiable(solution) => {
                    (SolveStatus::Optimal, Self::read(&domains, &solution))
                }
                SatisfactionResult::Unsatisfiable { .. } => (SolveStatus::Infeasible, Vec::new()),
                SatisfactionResult::Unknown { .. } => (SolveStatus::Timeout, Vec::new()),
            },
        };

        debug!(
            %status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pumpkin search finished"
        );

        if values.is_empty() && !self.vars.is_empty() {
            return EngineSolution::without_assignment(status);
        }
        let objective_value = objective.as_ref().map(|(coefficients, _, _)| {
            coefficients.iter().map(|&(v, c)| c * values[v]).sum()
        });
        EngineSolution {
            status,
            values,
            objective_value,
            message: None,
        }
    }

    fn var_count(&self) -> usize {
        self.vars.len()
    }

    fn constraint_count(&self) -> usize {
        self.posted.len()
    }
}
