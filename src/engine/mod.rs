//! Solving adapter.
//!
//! [`ConstraintEngine`] is the only boundary between model building and
//! combinatorial search. The builder talks to it in terms of variables,
//! linear (in)equalities, conditional constraints and an objective, and
//! gets back a status plus one value per variable. The engine does no
//! domain logic.
//!
//! [`PumpkinEngine`] is the bundled implementation, backed by the Pumpkin
//! lazy-clause-generation solver. Any engine that honours the trait can
//! replace it.
//!
//! # Reference
//! - Rossi, van Beek, Walsh (2006), "Handbook of Constraint Programming", Ch. 3-4
//! - Ohrimenko, Stuckey, Codish (2009), "Propagation via lazy clause generation"

mod pumpkin;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use pumpkin::PumpkinEngine;

/// Largest magnitude of a bound, coefficient or objective value the bundled
/// engine accepts.
pub const VALUE_LIMIT: i64 = i32::MAX as i64;

/// Handle to an engine variable. Dense, in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarHandle(u32);

impl VarHandle {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position in creation order.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Literal that holds when this variable is 1.
    pub fn is_true(self) -> Literal {
        Literal {
            var: self,
            positive: true,
        }
    }

    /// Literal that holds when this variable is 0.
    pub fn is_false(self) -> Literal {
        Literal {
            var: self,
            positive: false,
        }
    }
}

impl fmt::Display for VarHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A boolean variable or its negation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Literal {
    /// Underlying boolean variable.
    pub var: VarHandle,
    /// `true` = holds when var is 1, `false` = holds when var is 0.
    pub positive: bool,
}

impl Literal {
    /// The opposite literal.
    pub fn negated(self) -> Self {
        Self {
            var: self.var,
            positive: !self.positive,
        }
    }
}

/// Comparison of a linear expression against its bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `Σ ≤ bound`
    Le,
    /// `Σ = bound`
    Eq,
    /// `Σ ≥ bound`
    Ge,
}

/// `Σ coefficient · var  (≤ | = | ≥)  bound`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearConstraint {
    /// Terms of the expression.
    pub terms: Vec<(VarHandle, i64)>,
    /// Comparison.
    pub relation: Relation,
    /// Right-hand side.
    pub bound: i64,
}

impl LinearConstraint {
    /// Creates a constraint.
    pub fn new(terms: Vec<(VarHandle, i64)>, relation: Relation, bound: i64) -> Self {
        Self {
            terms,
            relation,
            bound,
        }
    }

    /// `Σ ≤ bound`.
    pub fn le(terms: Vec<(VarHandle, i64)>, bound: i64) -> Self {
        Self::new(terms, Relation::Le, bound)
    }

    /// `Σ = bound`.
    pub fn eq(terms: Vec<(VarHandle, i64)>, bound: i64) -> Self {
        Self::new(terms, Relation::Eq, bound)
    }

    /// `Σ ≥ bound`.
    pub fn ge(terms: Vec<(VarHandle, i64)>, bound: i64) -> Self {
        Self::new(terms, Relation::Ge, bound)
    }

    /// `Σ vars = 1`.
    pub fn exactly_one(vars: impl IntoIterator<Item = VarHandle>) -> Self {
        Self::eq(vars.into_iter().map(|v| (v, 1)).collect(), 1)
    }

    /// `Σ vars ≤ 1`.
    pub fn at_most_one(vars: impl IntoIterator<Item = VarHandle>) -> Self {
        Self::le(vars.into_iter().map(|v| (v, 1)).collect(), 1)
    }

    /// `var = value`.
    pub fn fix(var: VarHandle, value: i64) -> Self {
        Self::eq(vec![(var, 1)], value)
    }
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Maximize,
    Minimize,
}

/// Outcome of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    /// Search completed; the assignment is proven best.
    Optimal,
    /// An assignment was found, but optimality was not proven in time.
    Feasible,
    /// Search completed; no assignment satisfies the model.
    Infeasible,
    /// Time ran out before any assignment was found.
    Timeout,
    /// The engine could not process the model.
    Error,
}

impl SolveStatus {
    /// Whether an assignment accompanies this status.
    pub fn has_solution(self) -> bool {
        matches!(self, Self::Optimal | Self::Feasible)
    }

    /// Whether the assignment is proven optimal.
    pub fn is_optimal(self) -> bool {
        matches!(self, Self::Optimal)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Optimal => "OPTIMAL",
            Self::Feasible => "FEASIBLE",
            Self::Infeasible => "INFEASIBLE",
            Self::Timeout => "TIMEOUT",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Result of [`ConstraintEngine::solve`].
#[derive(Debug, Clone)]
pub struct EngineSolution {
    /// Solve outcome.
    pub status: SolveStatus,
    /// One value per variable, indexed by [`VarHandle::index`]. Empty when
    /// `status` carries no solution.
    pub values: Vec<i64>,
    /// Objective value of the assignment, if an objective was set.
    pub objective_value: Option<i64>,
    /// Human-readable detail for `Error`.
    pub message: Option<String>,
}

impl EngineSolution {
    /// A solution-less outcome.
    pub fn without_assignment(status: SolveStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective_value: None,
            message: None,
        }
    }

    /// Value of a variable. `None` when there is no assignment.
    pub fn value(&self, var: VarHandle) -> Option<i64> {
        self.values.get(var.index()).copied()
    }

    /// Whether a boolean variable is assigned true.
    pub fn is_true(&self, var: VarHandle) -> bool {
        self.value(var) == Some(1)
    }
}

/// Contract between the model builder and a constraint-solving engine.
///
/// Variables are created before the constraints that mention them. The
/// engine owns all variables until [`solve`](Self::solve) returns.
pub trait ConstraintEngine {
    /// Creates a 0/1 variable.
    fn new_bool_var(&mut self, name: &str) -> VarHandle;

    /// Creates an integer variable with domain `[lb, ub]`.
    fn new_int_var(&mut self, lb: i64, ub: i64, name: &str) -> VarHandle;

    /// Posts a linear constraint.
    fn add_linear_constraint(&mut self, constraint: LinearConstraint);

    /// Posts a constraint that must hold only when `condition` holds.
    fn add_conditional_constraint(&mut self, condition: Literal, constraint: LinearConstraint);

    /// Sets the objective, replacing any previous one.
    fn set_objective(&mut self, terms: Vec<(VarHandle, i64)>, direction: Direction);

    /// Searches for an assignment within the time limit. Blocking.
    fn solve(&mut self, time_limit: Duration) -> EngineSolution;

    /// Number of variables created.
    fn var_count(&self) -> usize;

    /// Number of constraints posted (each call counts once).
    fn constraint_count(&self) -> usize;
}
