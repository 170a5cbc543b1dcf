//! Activity model.
//!
//! An activity is the atomic unit placed on the grid: a course, a job, a
//! project task. It occupies one resource for `duration` slots (plus that
//! resource's setup time) on a single day.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::SkillLevel;

/// Scheduling priority.
///
/// Ordered: `Low < Medium < High < Critical`. The weight feeds the
/// weighted-completion objective.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Objective weight (1..=4).
    pub fn weight(self) -> i64 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }
}

/// An activity to be placed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Unique activity identifier.
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Occupied slots, excluding the resource's setup time.
    pub duration: i64,
    /// Capability tags a resource must offer.
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    /// IDs of activities that must finish before this one starts.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Scheduling priority.
    #[serde(default)]
    pub priority: Priority,
    /// Revenue (or weight) before period multiplier and costs.
    #[serde(default)]
    pub base_value: f64,
    /// Minimum level of the actor who runs this activity.
    #[serde(default)]
    pub min_actor_level: Option<SkillLevel>,
    /// Preparation time charged by the placement-cost objective.
    #[serde(default)]
    pub preparation_time: i64,
    /// Travel distance to a resource, by resource ID. Absent means 0.
    #[serde(default)]
    pub distances: BTreeMap<String, i64>,
}

impl Activity {
    /// Creates an activity with the given duration in slots.
    pub fn new(id: impl Into<String>, duration: i64) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            duration,
            required_capabilities: Vec::new(),
            dependencies: Vec::new(),
            priority: Priority::default(),
            base_value: 0.0,
            min_actor_level: None,
            preparation_time: 0,
            distances: BTreeMap::new(),
        }
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a required capability.
    pub fn with_capability(mut self, tag: impl Into<String>) -> Self {
        self.required_capabilities.push(tag.into());
        self
    }

    /// Adds a dependency.
    pub fn with_dependency(mut self, activity_id: impl Into<String>) -> Self {
        self.dependencies.push(activity_id.into());
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the base value.
    pub fn with_base_value(mut self, value: f64) -> Self {
        self.base_value = value;
        self
    }

    /// Sets the minimum actor level.
    pub fn with_min_actor_level(mut self, level: SkillLevel) -> Self {
        self.min_actor_level = Some(level);
        self
    }

    /// Sets the preparation time.
    pub fn with_preparation_time(mut self, time: i64) -> Self {
        self.preparation_time = time;
        self
    }

    /// Sets the travel distance to a resource.
    pub fn with_distance(mut self, resource_id: impl Into<String>, distance: i64) -> Self {
        self.distances.insert(resource_id.into(), distance);
        self
    }

    /// Travel distance to `resource_id`.
    pub fn distance_to(&self, resource_id: &str) -> i64 {
        self.distances.get(resource_id).copied().unwrap_or(0)
    }

    /// Whether `offered` covers every required capability.
    pub fn is_satisfied_by(&self, offered: &[String]) -> bool {
        self.required_capabilities
            .iter()
            .all(|tag| offered.iter().any(|o| o == tag))
    }
}
