//! Problem instance and its indexed catalog.
//!
//! [`ProblemInstance`] is the serde-facing input. [`Catalog`] is the
//! validated, index-based view the model builder works from: activities,
//! resources and actors are addressed by position, and every derived lookup
//! (assigned actor, dependency indices, compatibility) is resolved once.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Activity, Actor, Resource, TimeGrid};
use crate::error::{Result, ScheduleError};
use crate::validation::{self, ConstructionWarning};

/// A complete problem instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemInstance {
    /// Instance identifier (used in error context).
    pub id: String,
    /// Activities to place.
    pub activities: Vec<Activity>,
    /// Resources available.
    pub resources: Vec<Resource>,
    /// Actors, if modeled.
    #[serde(default)]
    pub actors: Vec<Actor>,
    /// Scheduling horizon.
    pub grid: TimeGrid,
}

impl ProblemInstance {
    /// Creates an empty instance on a grid.
    pub fn new(id: impl Into<String>, grid: TimeGrid) -> Self {
        Self {
            id: id.into(),
            activities: Vec::new(),
            resources: Vec::new(),
            actors: Vec::new(),
            grid,
        }
    }

    /// Adds an activity.
    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activities.push(activity);
        self
    }

    /// Adds a resource.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Adds an actor.
    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actors.push(actor);
        self
    }
}

/// Validated, index-addressed view of an instance.
#[derive(Debug)]
pub struct Catalog<'a> {
    instance: &'a ProblemInstance,
    activity_index: HashMap<&'a str, usize>,
    resource_index: HashMap<&'a str, usize>,
    assigned_actor: Vec<Option<usize>>,
    dependencies: Vec<Vec<usize>>,
    warnings: Vec<ConstructionWarning>,
}

impl<'a> Catalog<'a> {
    /// Validates the instance and indexes it.
    ///
    /// # Errors
    /// [`ScheduleError::Construction`] listing every problem found.
    pub fn new(instance: &'a ProblemInstance) -> Result<Self> {
        let warnings = validation::validate_instance(instance).map_err(|errors| {
            ScheduleError::Construction {
                instance: instance.id.clone(),
                errors,
            }
        })?;

        let activity_index: HashMap<&str, usize> = instance
            .activities
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id.as_str(), i))
            .collect();
        let resource_index: HashMap<&str, usize> = instance
            .resources
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.as_str(), i))
            .collect();

        let assigned_actor = instance
            .activities
            .iter()
            .map(|a| instance.actors.iter().position(|p| p.claims_activity(&a.id)))
            .collect();

        let dependencies = instance
            .activities
            .iter()
            .map(|a| {
                a.dependencies
                    .iter()
                    .filter_map(|d| activity_index.get(d.as_str()).copied())
                    .collect()
            })
            .collect();

        Ok(Self {
            instance,
            activity_index,
            resource_index,
            assigned_actor,
            dependencies,
            warnings,
        })
    }

    /// The underlying instance.
    pub fn instance(&self) -> &'a ProblemInstance {
        self.instance
    }

    /// Instance identifier.
    pub fn id(&self) -> &'a str {
        &self.instance.id
    }

    /// Scheduling horizon.
    pub fn grid(&self) -> &'a TimeGrid {
        &self.instance.grid
    }

    /// All activities, in input order.
    pub fn activities(&self) -> &'a [Activity] {
        &self.instance.activities
    }

    /// All resources, in input order.
    pub fn resources(&self) -> &'a [Resource] {
        &self.instance.resources
    }

    /// All actors, in input order.
    pub fn actors(&self) -> &'a [Actor] {
        &self.instance.actors
    }

    /// Non-fatal findings from validation.
    pub fn warnings(&self) -> &[ConstructionWarning] {
        &self.warnings
    }

    /// Index of an activity by ID.
    pub fn activity_idx(&self, id: &str) -> Option<usize> {
        self.activity_index.get(id).copied()
    }

    /// Index of a resource by ID.
    pub fn resource_idx(&self, id: &str) -> Option<usize> {
        self.resource_index.get(id).copied()
    }

    /// Actor running an activity, if any.
    pub fn assigned_actor(&self, activity: usize) -> Option<&'a Actor> {
        self.assigned_actor[activity].map(|i| &self.instance.actors[i])
    }

    /// Index of the actor running an activity, if any.
    pub fn assigned_actor_idx(&self, activity: usize) -> Option<usize> {
        self.assigned_actor[activity]
    }

    /// Indices of an activity's dependencies.
    pub fn dependencies(&self, activity: usize) -> &[usize] {
        &self.dependencies[activity]
    }

    /// Whether the resource offers every capability the activity needs.
    pub fn is_compatible(&self, activity: usize, resource: usize) -> bool {
        let offered = &self.instance.resources[resource].capabilities;
        self.instance.activities[activity].is_satisfied_by(offered)
    }

    /// Slots occupied on the resource: setup plus duration.
    pub fn span_len(&self, activity: usize, resource: usize) -> i64 {
        self.instance.activities[activity].duration + self.instance.resources[resource].setup_time
    }

    /// Slots of actor time claimed when the activity runs on the resource.
    ///
    /// Falls back to the activity duration when the actor has no claim
    /// usable on that resource. `None` if no actor runs the activity.
    pub fn actor_span_len(&self, activity: usize, resource: usize) -> Option<i64> {
        let actor = self.assigned_actor(activity)?;
        let act = &self.instance.activities[activity];
        let res = &self.instance.resources[resource];
        Some(actor.claim_for(&act.id, &res.id).unwrap_or(act.duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SkillLevel;

    fn instance() -> ProblemInstance {
        ProblemInstance::new("t", TimeGrid::new(1, 10, 60))
            .with_activity(Activity::new("A", 2).with_capability("lab"))
            .with_activity(Activity::new("B", 3).with_dependency("A"))
            .with_resource(Resource::new("R1").with_setup_time(1))
            .with_resource(Resource::new("R2").with_capability("lab"))
            .with_actor(
                Actor::new("P1")
                    .with_level(SkillLevel::Senior)
                    .with_claim("A", 4)
                    .with_resource_claim("A", "R2", 5),
            )
    }

    #[test]
    fn test_catalog_indexing() {
        let inst = instance();
        let cat = Catalog::new(&inst).unwrap();
        assert_eq!(cat.activity_idx("B"), Some(1));
        assert_eq!(cat.resource_idx("R2"), Some(1));
        assert_eq!(cat.dependencies(1), &[0]);
        assert!(cat.dependencies(0).is_empty());
    }

    #[test]
    fn test_catalog_compatibility_and_spans() {
        let inst = instance();
        let cat = Catalog::new(&inst).unwrap();
        assert!(!cat.is_compatible(0, 0));
        assert!(cat.is_compatible(0, 1));
        assert!(cat.is_compatible(1, 0));
        assert_eq!(cat.span_len(0, 0), 3);
        assert_eq!(cat.span_len(0, 1), 2);
    }

    #[test]
    fn test_catalog_actor_claims() {
        let inst = instance();
        let cat = Catalog::new(&inst).unwrap();
        assert_eq!(cat.assigned_actor(0).map(|a| a.id.as_str()), Some("P1"));
        assert!(cat.assigned_actor(1).is_none());
        assert_eq!(cat.actor_span_len(0, 0), Some(4));
        assert_eq!(cat.actor_span_len(0, 1), Some(5));
        assert_eq!(cat.actor_span_len(1, 0), None);
    }

    #[test]
    fn test_catalog_rejects_invalid() {
        let inst = ProblemInstance::new("bad", TimeGrid::new(1, 10, 60))
            .with_activity(Activity::new("A", 0));
        let err = Catalog::new(&inst).unwrap_err();
        assert_eq!(err.construction_errors().len(), 1);
    }

    #[test]
    fn test_instance_from_json() {
        let json = r#"{
            "id": "json",
            "activities": [{"id": "A", "duration": 2, "priority": "critical"}],
            "resources": [{"id": "R", "setup_time": 1}],
            "grid": {"num_days": 1, "num_slots_per_day": 8, "slot_duration_minutes": 30,
                     "periods": [{"name": "all", "from_slot": 0, "multiplier": 1.0}]}
        }"#;
        let inst: ProblemInstance = serde_json::from_str(json).unwrap();
        assert!(inst.actors.is_empty());
        assert_eq!(inst.activities[0].priority, crate::models::Priority::Critical);
        assert!(Catalog::new(&inst).is_ok());
    }
}
