//! Construction-time validation of problem instances.
//!
//! Runs before any decision variable exists. Detects:
//! - Duplicate IDs
//! - Non-positive durations, negative setup times, bad actor claims
//! - Dangling and circular dependencies (DAG validation)
//! - Malformed grids and pricing periods
//! - Negative or non-finite money figures
//!
//! All problems are collected. The caller gets the whole list, not only the
//! first error.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::engine::VALUE_LIMIT;
use crate::error::{ConstructionError, ConstructionErrorKind};
use crate::models::{Activity, ProblemInstance};

/// Validation result: warnings on success, every error on failure.
pub type ValidationResult = Result<Vec<ConstructionWarning>, Vec<ConstructionError>>;

/// Upper bound on `activities × resources × days × slots`.
pub const MAX_PLACEMENTS: usize = 20_000_000;

/// A non-fatal finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstructionWarning {
    /// Warning category.
    pub kind: WarningKind,
    /// Related entity ID.
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
}

/// Categories of warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// No activity's capability requirements fit this resource.
    UnusableResource,
    /// Dependencies are present but dependency ordering is disabled.
    DependenciesIgnored,
}

impl ConstructionWarning {
    pub(crate) fn new(
        kind: WarningKind,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }
}

/// Validates a problem instance.
///
/// Checks:
/// 1. Grid dimensions are positive, the placement count stays within
///    [`MAX_PLACEMENTS`], and periods start at slot 0, increasing
/// 2. No duplicate activity, resource or actor IDs
/// 3. Durations > 0; setup, preparation times and distances ≥ 0; claims > 0
/// 4. Money figures are finite and non-negative
/// 5. Dependencies point to existing activities and form a DAG
/// 6. Claims reference existing activities/resources; one actor per activity
/// 7. Assigned actors meet the activity's minimum level
///
/// # Returns
/// `Ok(warnings)` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_instance(instance: &ProblemInstance) -> ValidationResult {
    let mut errors = Vec::new();

    validate_grid(instance, &mut errors);

    let mut activity_ids = HashSet::new();
    for act in &instance.activities {
        if !activity_ids.insert(act.id.as_str()) {
            errors.push(ConstructionError::new(
                ConstructionErrorKind::DuplicateId,
                &act.id,
                "id",
                format!("Duplicate activity ID: {}", act.id),
            ));
        }
        if act.duration <= 0 {
            errors.push(ConstructionError::new(
                ConstructionErrorKind::InvalidDuration,
                &act.id,
                "duration",
                format!("duration must be positive, got {}", act.duration),
            ));
        }
        if act.preparation_time < 0 {
            errors.push(ConstructionError::new(
                ConstructionErrorKind::InvalidDuration,
                &act.id,
                "preparation_time",
                format!("preparation time must not be negative, got {}", act.preparation_time),
            ));
        }
        for (resource_id, &distance) in &act.distances {
            if distance < 0 {
                errors.push(ConstructionError::new(
                    ConstructionErrorKind::InvalidAmount,
                    &act.id,
                    "distances",
                    format!("distance to '{resource_id}' must not be negative, got {distance}"),
                ));
            }
        }
        check_amount(&mut errors, &act.id, "base_value", act.base_value);
    }

    let mut resource_ids = HashSet::new();
    for res in &instance.resources {
        if !resource_ids.insert(res.id.as_str()) {
            errors.push(ConstructionError::new(
                ConstructionErrorKind::DuplicateId,
                &res.id,
                "id",
                format!("Duplicate resource ID: {}", res.id),
            ));
        }
        if res.setup_time < 0 {
            errors.push(ConstructionError::new(
                ConstructionErrorKind::InvalidDuration,
                &res.id,
                "setup_time",
                format!("setup time must not be negative, got {}", res.setup_time),
            ));
        }
        check_amount(&mut errors, &res.id, "cost_per_slot", res.cost_per_slot);
        check_amount(
            &mut errors,
            &res.id,
            "setup_cost_per_slot",
            res.setup_cost_per_slot,
        );
    }

    // Dependency references
    for act in &instance.activities {
        for dep in &act.dependencies {
            if !activity_ids.contains(dep.as_str()) {
                errors.push(ConstructionError::new(
                    ConstructionErrorKind::UnknownDependency,
                    &act.id,
                    "dependencies",
                    format!("Activity '{}' depends on unknown activity '{}'", act.id, dep),
                ));
            }
        }
    }

    if let Some(cycle_err) = detect_cycles(&instance.activities) {
        errors.push(cycle_err);
    }

    validate_actors(instance, &activity_ids, &resource_ids, &mut errors);

    if errors.is_empty() {
        Ok(unusable_resources(instance))
    } else {
        Err(errors)
    }
}

fn validate_grid(instance: &ProblemInstance, errors: &mut Vec<ConstructionError>) {
    let grid = &instance.grid;
    let mut bad = |field: &'static str, message: String| {
        errors.push(ConstructionError::new(
            ConstructionErrorKind::InvalidGrid,
            "grid",
            field,
            message,
        ));
    };

    if grid.num_days <= 0 {
        bad("num_days", format!("must be positive, got {}", grid.num_days));
    }
    if grid.num_slots_per_day <= 0 {
        bad(
            "num_slots_per_day",
            format!("must be positive, got {}", grid.num_slots_per_day),
        );
    }
    if grid.num_days > 0 && grid.num_slots_per_day > 0 {
        let total_slots = grid.num_days.checked_mul(grid.num_slots_per_day);
        let placements = [
            instance.activities.len(),
            instance.resources.len(),
            grid.num_days as usize,
            grid.num_slots_per_day as usize,
        ]
        .into_iter()
        .try_fold(1usize, usize::checked_mul);
        let oversized = total_slots.map_or(true, |t| t > VALUE_LIMIT)
            || placements.map_or(true, |n| n > MAX_PLACEMENTS);
        if oversized {
            bad(
                "num_slots_per_day",
                format!(
                    "{} days × {} slots with {} activities and {} resources exceeds {MAX_PLACEMENTS} placements",
                    grid.num_days,
                    grid.num_slots_per_day,
                    instance.activities.len(),
                    instance.resources.len()
                ),
            );
        }
    }
    if grid.slot_duration_minutes <= 0 {
        bad(
            "slot_duration_minutes",
            format!("must be positive, got {}", grid.slot_duration_minutes),
        );
    }
    if !(0..24 * 60).contains(&grid.day_start_minutes) {
        bad(
            "day_start_minutes",
            format!("must lie within one day, got {}", grid.day_start_minutes),
        );
    }

    if let Some(first) = grid.periods.first() {
        if first.from_slot != 0 {
            bad(
                "periods",
                format!("first period '{}' must start at slot 0", first.name),
            );
        }
    }
    for pair in grid.periods.windows(2) {
        if pair[1].from_slot <= pair[0].from_slot {
            bad(
                "periods",
                format!(
                    "period '{}' must start after '{}'",
                    pair[1].name, pair[0].name
                ),
            );
        }
    }
    for p in &grid.periods {
        if !p.multiplier.is_finite() || p.multiplier < 0.0 {
            bad(
                "periods",
                format!("period '{}' has invalid multiplier {}", p.name, p.multiplier),
            );
        }
    }
}

fn validate_actors(
    instance: &ProblemInstance,
    activity_ids: &HashSet<&str>,
    resource_ids: &HashSet<&str>,
    errors: &mut Vec<ConstructionError>,
) {
    let mut actor_ids = HashSet::new();
    let mut claimed_by: HashMap<&str, &str> = HashMap::new();

    for actor in &instance.actors {
        if !actor_ids.insert(actor.id.as_str()) {
            errors.push(ConstructionError::new(
                ConstructionErrorKind::DuplicateId,
                &actor.id,
                "id",
                format!("Duplicate actor ID: {}", actor.id),
            ));
        }
        check_amount(errors, &actor.id, "hourly_cost", actor.hourly_cost);

        for claim in &actor.claims {
            if !activity_ids.contains(claim.activity_id.as_str()) {
                errors.push(ConstructionError::new(
                    ConstructionErrorKind::InvalidClaim,
                    &actor.id,
                    "claims",
                    format!("claim references unknown activity '{}'", claim.activity_id),
                ));
            }
            if let Some(res) = &claim.resource_id {
                if !resource_ids.contains(res.as_str()) {
                    errors.push(ConstructionError::new(
                        ConstructionErrorKind::InvalidClaim,
                        &actor.id,
                        "claims",
                        format!("claim references unknown resource '{res}'"),
                    ));
                }
            }
            if claim.slots <= 0 {
                errors.push(ConstructionError::new(
                    ConstructionErrorKind::InvalidDuration,
                    &actor.id,
                    "claims",
                    format!(
                        "claim on '{}' must be positive, got {}",
                        claim.activity_id, claim.slots
                    ),
                ));
            }

            match claimed_by.get(claim.activity_id.as_str()) {
                Some(&owner) if owner != actor.id => {
                    errors.push(ConstructionError::new(
                        ConstructionErrorKind::DuplicateClaim,
                        &claim.activity_id,
                        "claims",
                        format!("claimed by both '{owner}' and '{}'", actor.id),
                    ));
                }
                Some(_) => {}
                None => {
                    claimed_by.insert(&claim.activity_id, &actor.id);
                }
            }
        }
    }

    for act in &instance.activities {
        let Some(required) = act.min_actor_level else {
            continue;
        };
        let Some(actor) = instance.actors.iter().find(|a| a.claims_activity(&act.id)) else {
            continue;
        };
        if actor.capability_level < required {
            errors.push(ConstructionError::new(
                ConstructionErrorKind::Underqualified,
                &act.id,
                "min_actor_level",
                format!(
                    "actor '{}' is {:?}, activity needs {:?}",
                    actor.id, actor.capability_level, required
                ),
            ));
        }
    }
}

fn check_amount(errors: &mut Vec<ConstructionError>, id: &str, field: &'static str, value: f64) {
    if !value.is_finite() || value < 0.0 {
        errors.push(ConstructionError::new(
            ConstructionErrorKind::InvalidAmount,
            id,
            field,
            format!("must be finite and non-negative, got {value}"),
        ));
    }
}

fn unusable_resources(instance: &ProblemInstance) -> Vec<ConstructionWarning> {
    instance
        .resources
        .iter()
        .filter(|r| {
            !instance
                .activities
                .iter()
                .any(|a| a.is_satisfied_by(&r.capabilities))
        })
        .map(|r| {
            ConstructionWarning::new(
                WarningKind::UnusableResource,
                &r.id,
                format!("no activity's capability set fits resource '{}'", r.id),
            )
        })
        .collect()
}

/// Detects cycles in the dependency graph using DFS.
///
/// # Algorithm
/// Topological sort via DFS. If a back-edge is found (visiting a node
/// currently in the recursion stack), a cycle exists.
///
/// # Reference
/// Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4
fn detect_cycles(activities: &[Activity]) -> Option<ConstructionError> {
    // Adjacency list: activity_id → dependents
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    for act in activities {
        for dep in &act.dependencies {
            adj.entry(dep.as_str()).or_default().push(act.id.as_str());
        }
    }

    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();

    // Input order keeps the reported activity deterministic.
    for act in activities {
        let node = act.id.as_str();
        if !visited.contains(node) && has_cycle_dfs(node, &adj, &mut visited, &mut in_stack) {
            return Some(ConstructionError::new(
                ConstructionErrorKind::CyclicDependency,
                node,
                "dependencies",
                format!("Circular dependency detected involving activity '{node}'"),
            ));
        }
    }

    None
}

fn has_cycle_dfs<'a>(
    node: &'a str,
    adj: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    in_stack: &mut HashSet<&'a str>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(node) {
        for &next in neighbors {
            if in_stack.contains(next) {
                return true; // Back edge → cycle
            }
            if !visited.contains(next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(node);
    false
}
