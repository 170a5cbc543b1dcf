//! Exclusive-span primitive shared by resource and actor no-overlap.

use std::collections::BTreeMap;

use crate::config::OverlapEncoding;
use crate::engine::{ConstraintEngine, LinearConstraint, VarHandle};
use crate::models::SlotSpan;

#[derive(Debug, Clone, Copy)]
struct SpanClaim {
    owner: usize,
    span: SlotSpan,
    var: VarHandle,
}

/// Spans on one exclusive entity (a resource or an actor), grouped by day.
///
/// Claims with the same owner never conflict with each other: an owner is
/// an activity, and exactly-once assignment already keeps its placements
/// apart.
#[derive(Debug, Clone, Default)]
pub struct ExclusiveSpans {
    by_day: BTreeMap<i64, Vec<SpanClaim>>,
}

impl ExclusiveSpans {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a span claimed by `owner` if `var` is true.
    pub fn push(&mut self, owner: usize, day: i64, span: SlotSpan, var: VarHandle) {
        if span.is_empty() {
            return;
        }
        self.by_day
            .entry(day)
            .or_default()
            .push(SpanClaim { owner, span, var });
    }

    /// Number of registered spans.
    pub fn len(&self) -> usize {
        self.by_day.values().map(Vec::len).sum()
    }

    /// Whether no span is registered.
    pub fn is_empty(&self) -> bool {
        self.by_day.is_empty()
    }

    /// Posts the exclusivity constraints. Returns how many were posted.
    pub fn post<E: ConstraintEngine>(&self, engine: &mut E, encoding: OverlapEncoding) -> usize {
        match encoding {
            OverlapEncoding::Pairwise => self.post_pairwise(engine),
            OverlapEncoding::SlotCover => self.post_slot_cover(engine),
        }
    }

    fn post_pairwise<E: ConstraintEngine>(&self, engine: &mut E) -> usize {
        let mut posted = 0;
        for claims in self.by_day.values() {
            for (i, first) in claims.iter().enumerate() {
                for second in &claims[i + 1..] {
                    if first.owner != second.owner && first.span.overlaps(&second.span) {
                        engine.add_linear_constraint(LinearConstraint::at_most_one([
                            first.var,
                            second.var,
                        ]));
                        posted += 1;
                    }
                }
            }
        }
        posted
    }

    fn post_slot_cover<E: ConstraintEngine>(&self, engine: &mut E) -> usize {
        let mut posted = 0;
        for claims in self.by_day.values() {
            let from = claims.iter().map(|c| c.span.start).min().unwrap_or(0);
            let to = claims.iter().map(|c| c.span.end).max().unwrap_or(0);
            let mut previous: Vec<VarHandle> = Vec::new();
            for slot in from..to {
                let covering: Vec<&SpanClaim> =
                    claims.iter().filter(|c| c.span.contains(slot)).collect();
                let shared = covering.iter().any(|c| c.owner != covering[0].owner);
                let vars: Vec<VarHandle> = covering.iter().map(|c| c.var).collect();
                // Consecutive slots often share the same cover.
                if shared && vars != previous {
                    engine.add_linear_constraint(LinearConstraint::at_most_one(vars.clone()));
                    posted += 1;
                }
                previous = vars;
            }
        }
        posted
    }
}
