//! Dense arena of placement variables.

use std::fmt;

use crate::engine::{ConstraintEngine, VarHandle};
use crate::models::Catalog;

/// Key of one placement variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlacementKey {
    /// Activity index.
    pub activity: usize,
    /// Resource index.
    pub resource: usize,
    /// Day index.
    pub day: i64,
    /// First slot of the span.
    pub start_slot: i64,
}

impl fmt::Display for PlacementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.activity, self.resource, self.day, self.start_slot
        )
    }
}

/// One boolean per `(activity, resource, day, start_slot)`, laid out as
/// `((a·R + r)·D + d)·S + t`.
///
/// Iteration follows the layout, so variable creation and every loop
/// over the arena are deterministic.
#[derive(Debug, Clone)]
pub struct PlacementArena {
    num_activities: usize,
    num_resources: usize,
    num_days: usize,
    num_slots: usize,
    vars: Vec<VarHandle>,
}

impl PlacementArena {
    /// Creates every placement variable in layout order.
    pub fn create<E: ConstraintEngine>(engine: &mut E, catalog: &Catalog<'_>) -> Self {
        let grid = catalog.grid();
        let num_activities = catalog.activities().len();
        let num_resources = catalog.resources().len();
        let num_days = grid.num_days.max(0) as usize;
        let num_slots = grid.num_slots_per_day.max(0) as usize;

        // Validation bounds the product; an overflow only loses the reservation.
        let capacity = [num_resources, num_days, num_slots]
            .into_iter()
            .try_fold(num_activities, usize::checked_mul)
            .unwrap_or(0);
        let mut vars = Vec::with_capacity(capacity);
        for activity in catalog.activities() {
            for resource in catalog.resources() {
                for d in 0..num_days {
                    for t in 0..num_slots {
                        let name = format!("x[{},{},{},{}]", activity.id, resource.id, d, t);
                        vars.push(engine.new_bool_var(&name));
                    }
                }
            }
        }

        Self {
            num_activities,
            num_resources,
            num_days,
            num_slots,
            vars,
        }
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the arena holds no variables.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Dense index of a key.
    #[inline]
    pub fn index_of(&self, key: PlacementKey) -> usize {
        ((key.activity * self.num_resources + key.resource) * self.num_days + key.day as usize)
            * self.num_slots
            + key.start_slot as usize
    }

    /// Key stored at a dense index.
    pub fn key_at(&self, index: usize) -> PlacementKey {
        let start_slot = index % self.num_slots;
        let rest = index / self.num_slots;
        let day = rest % self.num_days;
        let rest = rest / self.num_days;
        PlacementKey {
            activity: rest / self.num_resources,
            resource: rest % self.num_resources,
            day: day as i64,
            start_slot: start_slot as i64,
        }
    }

    /// Variable for a key.
    #[inline]
    pub fn var(&self, key: PlacementKey) -> VarHandle {
        self.vars[self.index_of(key)]
    }

    /// Every `(key, var)` in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (PlacementKey, VarHandle)> + '_ {
        self.vars
            .iter()
            .enumerate()
            .map(|(i, &v)| (self.key_at(i), v))
    }

    /// The contiguous block of one activity, in layout order.
    pub fn activity_vars(
        &self,
        activity: usize,
    ) -> impl Iterator<Item = (PlacementKey, VarHandle)> + '_ {
        let block = self.num_resources * self.num_days * self.num_slots;
        let from = activity * block;
        self.vars[from..from + block]
            .iter()
            .enumerate()
            .map(move |(i, &v)| (self.key_at(from + i), v))
    }

    /// Number of activities covered.
    pub fn num_activities(&self) -> usize {
        self.num_activities
    }
}
