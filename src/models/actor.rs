//! Actor model.
//!
//! Actors (professors, workers) are pre-assigned to activities through
//! claims. A claim reserves a stretch of the actor's time whenever the
//! activity is placed, independently of which resource hosts it.

use serde::{Deserialize, Serialize};

/// Actor proficiency. Ordered `Junior < Intermediate < Senior < Expert`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Junior,
    #[default]
    Intermediate,
    Senior,
    Expert,
}

/// A claim of an actor's time for one activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorClaim {
    /// Claimed activity.
    pub activity_id: String,
    /// Resource this claim is specific to. `None` = any resource.
    #[serde(default)]
    pub resource_id: Option<String>,
    /// Slots of actor time reserved from the placement's start.
    pub slots: i64,
}

/// A person (or agent) whose time cannot be double-booked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    /// Unique actor identifier.
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Proficiency level.
    #[serde(default)]
    pub capability_level: SkillLevel,
    /// Cost per hour of activity time.
    #[serde(default)]
    pub hourly_cost: f64,
    /// Activities this actor runs.
    #[serde(default)]
    pub claims: Vec<ActorClaim>,
}

impl Actor {
    /// Creates an actor with no claims.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            capability_level: SkillLevel::default(),
            hourly_cost: 0.0,
            claims: Vec::new(),
        }
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the capability level.
    pub fn with_level(mut self, level: SkillLevel) -> Self {
        self.capability_level = level;
        self
    }

    /// Sets the hourly cost.
    pub fn with_hourly_cost(mut self, cost: f64) -> Self {
        self.hourly_cost = cost;
        self
    }

    /// Claims `slots` of time for an activity on any resource.
    pub fn with_claim(mut self, activity_id: impl Into<String>, slots: i64) -> Self {
        self.claims.push(ActorClaim {
            activity_id: activity_id.into(),
            resource_id: None,
            slots,
        });
        self
    }

    /// Claims `slots` of time for an activity on one specific resource.
    pub fn with_resource_claim(
        mut self,
        activity_id: impl Into<String>,
        resource_id: impl Into<String>,
        slots: i64,
    ) -> Self {
        self.claims.push(ActorClaim {
            activity_id: activity_id.into(),
            resource_id: Some(resource_id.into()),
            slots,
        });
        self
    }

    /// Whether this actor claims the activity at all.
    pub fn claims_activity(&self, activity_id: &str) -> bool {
        self.claims.iter().any(|c| c.activity_id == activity_id)
    }

    /// Claimed slots for `(activity, resource)`.
    ///
    /// A resource-specific claim wins over a generic one. `None` if the
    /// actor has no claim usable on that resource.
    pub fn claim_for(&self, activity_id: &str, resource_id: &str) -> Option<i64> {
        let mut generic = None;
        for claim in self.claims.iter().filter(|c| c.activity_id == activity_id) {
            match claim.resource_id.as_deref() {
                Some(r) if r == resource_id => return Some(claim.slots),
                None => generic = generic.or(Some(claim.slots)),
                Some(_) => {}
            }
        }
        generic
    }

    /// Cost of `hours` of this actor's time.
    pub fn cost_for_hours(&self, hours: f64) -> f64 {
        self.hourly_cost * hours
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_builder() {
        let a = Actor::new("Prof_Cohen")
            .with_name("Dr. Cohen")
            .with_level(SkillLevel::Expert)
            .with_hourly_cost(500.0)
            .with_claim("Chemistry101", 13)
            .with_claim("Biology101", 7);

        assert_eq!(a.capability_level, SkillLevel::Expert);
        assert!(a.claims_activity("Biology101"));
        assert!(!a.claims_activity("Math101"));
        assert!((a.cost_for_hours(6.0) - 3000.0).abs() < 1e-10);
    }

    #[test]
    fn test_resource_specific_claim_wins() {
        let a = Actor::new("W1")
            .with_claim("J1", 4)
            .with_resource_claim("J1", "M2", 6);

        assert_eq!(a.claim_for("J1", "M1"), Some(4));
        assert_eq!(a.claim_for("J1", "M2"), Some(6));
        assert_eq!(a.claim_for("J2", "M1"), None);
    }

    #[test]
    fn test_resource_only_claim() {
        let a = Actor::new("W1").with_resource_claim("J1", "M2", 3);
        assert_eq!(a.claim_for("J1", "M1"), None);
        assert_eq!(a.claim_for("J1", "M2"), Some(3));
    }

    #[test]
    fn test_skill_order() {
        assert!(SkillLevel::Junior < SkillLevel::Expert);
        assert!(SkillLevel::Senior > SkillLevel::Intermediate);
    }
}
