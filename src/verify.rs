//! Post-hoc schedule verification.
//!
//! Checks a schedule against the instance with no reference to the model
//! that produced it. Useful on its own for schedules from other sources,
//! and run by the pipeline after every extraction.
//!
//! # Checks
//!
//! | Property | Violation |
//! |----------|-----------|
//! | Every activity placed exactly once | `Coverage` |
//! | No two spans intersect on a resource | `CapacityExceeded` |
//! | No two actor claims intersect | `ActorConflict` |
//! | Dependents start after dependencies end | `PrecedenceViolation` |
//! | Resources offer required capabilities | `SkillMismatch` |
//! | Spans stay within their day | `OutOfHorizon` |
//!
//! Actor, precedence and capability checks follow the [`RuleSet`] toggles.

use std::collections::HashMap;

use crate::config::RuleSet;
use crate::models::{Catalog, Placement, Schedule, SlotSpan, Violation, ViolationType};

/// A record resolved to catalog indices.
struct Resolved<'s> {
    record: &'s Placement,
    activity: usize,
    resource: usize,
}

/// Verifies a schedule. Returns every violation found.
pub fn verify_schedule(catalog: &Catalog<'_>, schedule: &Schedule, rules: &RuleSet) -> Vec<Violation> {
    let mut violations = Vec::new();
    let resolved = resolve(catalog, schedule, &mut violations);

    check_coverage(catalog, &resolved, &mut violations);
    check_horizon(catalog, &resolved, &mut violations);
    check_resource_overlap(catalog, &resolved, &mut violations);
    if rules.actor_exclusivity {
        check_actor_overlap(catalog, &resolved, &mut violations);
    }
    if rules.dependency_ordering {
        check_precedence(catalog, &resolved, &mut violations);
    }
    if rules.capability_pruning {
        check_capabilities(catalog, &resolved, &mut violations);
    }
    violations
}

fn resolve<'s>(
    catalog: &Catalog<'_>,
    schedule: &'s Schedule,
    violations: &mut Vec<Violation>,
) -> Vec<Resolved<'s>> {
    let mut resolved = Vec::with_capacity(schedule.records.len());
    for record in &schedule.records {
        match (
            catalog.activity_idx(&record.activity_id),
            catalog.resource_idx(&record.resource_id),
        ) {
            (Some(activity), Some(resource)) => resolved.push(Resolved {
                record,
                activity,
                resource,
            }),
            _ => violations.push(Violation::new(
                ViolationType::Coverage,
                &record.activity_id,
                format!(
                    "record references unknown activity or resource '{}'",
                    record.resource_id
                ),
            )),
        }
    }
    resolved
}

fn check_coverage(catalog: &Catalog<'_>, resolved: &[Resolved<'_>], violations: &mut Vec<Violation>) {
    let mut counts = vec![0usize; catalog.activities().len()];
    for r in resolved {
        counts[r.activity] += 1;
    }
    for (activity, count) in catalog.activities().iter().zip(counts) {
        if count != 1 {
            violations.push(Violation::new(
                ViolationType::Coverage,
                &activity.id,
                format!("activity '{}' placed {count} times", activity.id),
            ));
        }
    }
}

fn check_horizon(catalog: &Catalog<'_>, resolved: &[Resolved<'_>], violations: &mut Vec<Violation>) {
    let grid = catalog.grid();
    for r in resolved {
        let p = r.record;
        let expected = catalog.span_len(r.activity, r.resource);
        if p.day < 0 || p.day >= grid.num_days || !grid.fits(p.start_slot, p.span_len()) {
            violations.push(Violation::new(
                ViolationType::OutOfHorizon,
                &p.activity_id,
                format!(
                    "span [{}, {}) on day {} leaves the horizon",
                    p.start_slot, p.end_slot, p.day
                ),
            ));
        } else if p.span_len() != expected {
            violations.push(Violation::new(
                ViolationType::OutOfHorizon,
                &p.activity_id,
                format!("span length {} differs from setup + duration {expected}", p.span_len()),
            ));
        }
    }
}

/// Reports every intersecting pair among spans keyed by `(entity, day)`.
fn report_overlaps(
    spans: HashMap<(usize, i64), Vec<(SlotSpan, &str)>>,
    kind: ViolationType,
    entity_name: impl Fn(usize) -> String,
    violations: &mut Vec<Violation>,
) {
    let mut keys: Vec<_> = spans.keys().copied().collect();
    keys.sort_unstable();
    for key in keys {
        let list = &spans[&key];
        for (i, (a, a_id)) in list.iter().enumerate() {
            for (b, b_id) in &list[i + 1..] {
                if a.overlaps(b) {
                    violations.push(Violation::new(
                        kind.clone(),
                        entity_name(key.0),
                        format!(
                            "'{a_id}' [{}, {}) and '{b_id}' [{}, {}) overlap on day {}",
                            a.start, a.end, b.start, b.end, key.1
                        ),
                    ));
                }
            }
        }
    }
}

fn check_resource_overlap(
    catalog: &Catalog<'_>,
    resolved: &[Resolved<'_>],
    violations: &mut Vec<Violation>,
) {
    let mut spans: HashMap<(usize, i64), Vec<(SlotSpan, &str)>> = HashMap::new();
    for r in resolved {
        spans
            .entry((r.resource, r.record.day))
            .or_default()
            .push((r.record.span(), r.record.activity_id.as_str()));
    }
    report_overlaps(
        spans,
        ViolationType::CapacityExceeded,
        |i| catalog.resources()[i].id.clone(),
        violations,
    );
}

fn check_actor_overlap(
    catalog: &Catalog<'_>,
    resolved: &[Resolved<'_>],
    violations: &mut Vec<Violation>,
) {
    let mut spans: HashMap<(usize, i64), Vec<(SlotSpan, &str)>> = HashMap::new();
    for r in resolved {
        let (Some(actor), Some(len)) = (
            catalog.assigned_actor_idx(r.activity),
            catalog.actor_span_len(r.activity, r.resource),
        ) else {
            continue;
        };
        spans
            .entry((actor, r.record.day))
            .or_default()
            .push((SlotSpan::new(r.record.start_slot, len), r.record.activity_id.as_str()));
    }
    report_overlaps(
        spans,
        ViolationType::ActorConflict,
        |i| catalog.actors()[i].id.clone(),
        violations,
    );
}

fn check_precedence(catalog: &Catalog<'_>, resolved: &[Resolved<'_>], violations: &mut Vec<Violation>) {
    let grid = catalog.grid();
    let mut window: Vec<Option<(i64, i64)>> = vec![None; catalog.activities().len()];
    for r in resolved {
        let start = grid.global_slot(r.record.day, r.record.start_slot);
        window[r.activity] = Some((start, start + r.record.span_len()));
    }
    for (a, activity) in catalog.activities().iter().enumerate() {
        let Some((start, _)) = window[a] else { continue };
        for &p in catalog.dependencies(a) {
            if let Some((_, end)) = window[p] {
                if start < end {
                    violations.push(Violation::new(
                        ViolationType::PrecedenceViolation,
                        &activity.id,
                        format!(
                            "starts at {start} before dependency '{}' ends at {end}",
                            catalog.activities()[p].id
                        ),
                    ));
                }
            }
        }
    }
}

fn check_capabilities(
    catalog: &Catalog<'_>,
    resolved: &[Resolved<'_>],
    violations: &mut Vec<Violation>,
) {
    for r in resolved {
        if !catalog.is_compatible(r.activity, r.resource) {
            violations.push(Violation::new(
                ViolationType::SkillMismatch,
                &r.record.activity_id,
                format!(
                    "resource '{}' lacks a capability required by '{}'",
                    r.record.resource_id, r.record.activity_id
                ),
            ));
        }
    }
}
