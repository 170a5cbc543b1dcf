//! CP-based timetabling formulation.
//!
//! Bridges the scheduling domain to a [`ConstraintEngine`]: the
//! [`ModelBuilder`] states the placement model, the engine searches it, and
//! the [`SolutionExtractor`] reads the assignment back into a
//! [`Schedule`](crate::models::Schedule).
//!
//! # Formulation
//!
//! One boolean per `(activity, resource, day, start_slot)` in a dense
//! [`PlacementArena`]. A true variable occupies the half-open span
//! `[t, t + setup + duration)` on that resource and day. Integer
//! start/end variables on the global slot axis are added only when
//! dependency ordering or a temporal objective needs them.
//!
//! [`ConstraintEngine`]: crate::engine::ConstraintEngine

mod arena;
mod builder;
mod extract;
mod objective;
mod rules;

pub use arena::{PlacementArena, PlacementKey};
pub use builder::{BuiltModel, ModelBuilder, ModelStats, TemporalVars};
pub use extract::SolutionExtractor;
pub use objective::{placement_cost, placement_value, to_minor_units, ValueBreakdown};
pub use rules::ExclusiveSpans;
