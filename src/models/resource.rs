//! Resource model.
//!
//! A resource is what an activity occupies exclusively: a classroom, a
//! machine, a role seat. It offers capability tags and charges for use and
//! for the setup that precedes every activity placed on it.

use serde::{Deserialize, Serialize};

/// A resource that activities can be placed on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource identifier.
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Offered capability tags (equipment, role).
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Slots consumed before each activity placed here.
    #[serde(default)]
    pub setup_time: i64,
    /// Usage cost per activity slot.
    #[serde(default)]
    pub cost_per_slot: f64,
    /// Cost per setup slot.
    #[serde(default)]
    pub setup_cost_per_slot: f64,
}

impl Resource {
    /// Creates a resource with no capabilities, setup or cost.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            capabilities: Vec::new(),
            setup_time: 0,
            cost_per_slot: 0.0,
            setup_cost_per_slot: 0.0,
        }
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a capability tag.
    pub fn with_capability(mut self, tag: impl Into<String>) -> Self {
        self.capabilities.push(tag.into());
        self
    }

    /// Sets the setup time in slots.
    pub fn with_setup_time(mut self, slots: i64) -> Self {
        self.setup_time = slots;
        self
    }

    /// Sets usage and setup costs per slot.
    pub fn with_costs(mut self, cost_per_slot: f64, setup_cost_per_slot: f64) -> Self {
        self.cost_per_slot = cost_per_slot;
        self.setup_cost_per_slot = setup_cost_per_slot;
        self
    }

    /// Whether this resource offers a tag.
    pub fn has_capability(&self, tag: &str) -> bool {
        self.capabilities.iter().any(|c| c == tag)
    }

    /// Cost of the setup preceding one activity.
    pub fn setup_cost(&self) -> f64 {
        self.setup_cost_per_slot * self.setup_time as f64
    }

    /// Usage cost for an activity of `duration` slots.
    pub fn usage_cost(&self, duration: i64) -> f64 {
        self.cost_per_slot * duration as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_builder() {
        let r = Resource::new("Room102")
            .with_name("Lab room")
            .with_capability("basic")
            .with_capability("lab_equipment")
            .with_setup_time(3)
            .with_costs(200.0, 60.0);

        assert_eq!(r.id, "Room102");
        assert!(r.has_capability("lab_equipment"));
        assert!(!r.has_capability("projector"));
        assert_eq!(r.setup_time, 3);
        assert!((r.setup_cost() - 180.0).abs() < 1e-10);
        assert!((r.usage_cost(4) - 800.0).abs() < 1e-10);
    }

    #[test]
    fn test_resource_defaults() {
        let r = Resource::new("M1");
        assert!(r.capabilities.is_empty());
        assert_eq!(r.setup_time, 0);
        assert!((r.setup_cost() - 0.0).abs() < 1e-10);
    }
}
