//! Schedule (solution) model.
//!
//! A schedule holds one placement record per activity, read back from a
//! solved model. Each record carries its financial breakdown. The schedule
//! also carries the solve status, so a time-limited result is never mistaken
//! for a proven optimum.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::SlotSpan;
use crate::config::ObjectiveKind;
use crate::engine::SolveStatus;

/// One activity placed on a resource, day and start slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    /// Placed activity.
    pub activity_id: String,
    /// Hosting resource.
    pub resource_id: String,
    /// Actor running the activity, if any.
    pub actor_id: Option<String>,
    /// Day index.
    pub day: i64,
    /// First slot of the span (setup begins here).
    pub start_slot: i64,
    /// End of the span (exclusive): start + setup + duration.
    pub end_slot: i64,
    /// Leading setup slots within the span.
    pub setup_slots: i64,
    /// Pricing period of the start slot.
    pub period: Option<String>,
    /// Activity base value.
    pub base_value: f64,
    /// Period multiplier applied to the base value.
    pub multiplier_applied: f64,
    /// Resource usage cost.
    pub resource_cost: f64,
    /// Setup cost.
    pub setup_cost: f64,
    /// Actor cost.
    pub actor_cost: f64,
    /// `base_value × multiplier − costs`.
    pub net_value: f64,
}

impl Placement {
    /// The occupied span `[start_slot, end_slot)`.
    #[inline]
    pub fn span(&self) -> SlotSpan {
        SlotSpan {
            start: self.start_slot,
            end: self.end_slot,
        }
    }

    /// Slot at which the activity itself starts, after setup.
    #[inline]
    pub fn activity_start_slot(&self) -> i64 {
        self.start_slot + self.setup_slots
    }

    /// Occupied slots including setup.
    #[inline]
    pub fn span_len(&self) -> i64 {
        self.end_slot - self.start_slot
    }

    /// Revenue after the period multiplier, before costs.
    pub fn gross_value(&self) -> f64 {
        self.base_value * self.multiplier_applied
    }
}

/// A schedule read back from a solved model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    /// Placements ordered by day, start slot, then activity input order.
    pub records: Vec<Placement>,
    /// Objective value recomputed from the placements.
    pub total_objective_value: f64,
    /// Status of the solve that produced this schedule.
    pub status: SolveStatus,
    /// Objective the value refers to.
    pub objective: ObjectiveKind,
}

/// A property violation found in a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Related entity ID (activity, resource or actor).
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
}

/// Classification of schedule violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// An activity is missing or placed more than once.
    Coverage,
    /// Two spans overlap on one resource.
    CapacityExceeded,
    /// Two spans overlap for one actor.
    ActorConflict,
    /// Activity started before a dependency finished.
    PrecedenceViolation,
    /// Resource lacks a required capability.
    SkillMismatch,
    /// Span leaves its day.
    OutOfHorizon,
}

impl Violation {
    pub(crate) fn new(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new(status: SolveStatus, objective: ObjectiveKind) -> Self {
        Self {
            records: Vec::new(),
            total_objective_value: 0.0,
            status,
            objective,
        }
    }

    /// Adds a placement.
    pub fn add_placement(&mut self, placement: Placement) {
        self.records.push(placement);
    }

    /// Whether the objective value is proven optimal.
    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }

    /// Sum of net values over all placements.
    pub fn total_net_value(&self) -> f64 {
        self.records.iter().map(|p| p.net_value).sum()
    }

    /// Finds the placement of an activity.
    pub fn placement_for_activity(&self, activity_id: &str) -> Option<&Placement> {
        self.records.iter().find(|p| p.activity_id == activity_id)
    }

    /// All placements on a resource.
    pub fn placements_for_resource(&self, resource_id: &str) -> Vec<&Placement> {
        self.records
            .iter()
            .filter(|p| p.resource_id == resource_id)
            .collect()
    }

    /// All placements run by an actor.
    pub fn placements_for_actor(&self, actor_id: &str) -> Vec<&Placement> {
        self.records
            .iter()
            .filter(|p| p.actor_id.as_deref() == Some(actor_id))
            .collect()
    }

    /// Busy slots (setup included) per resource.
    pub fn busy_slots_by_resource(&self) -> HashMap<String, i64> {
        let mut busy: HashMap<String, i64> = HashMap::new();
        for p in &self.records {
            *busy.entry(p.resource_id.clone()).or_insert(0) += p.span_len();
        }
        busy
    }

    /// Number of placements.
    pub fn placement_count(&self) -> usize {
        self.records.len()
    }

    /// Sorts records by day, then start slot; stable for equal keys.
    pub(crate) fn sort_records(&mut self) {
        self.records.sort_by_key(|p| (p.day, p.start_slot));
    }
}
