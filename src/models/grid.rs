//! Time grid and pricing periods.
//!
//! The horizon is `num_days × num_slots_per_day` integer cells. Every slot
//! lasts `slot_duration_minutes`; slot 0 of each day starts at
//! `day_start_minutes` on the wall clock. Placements never cross a day
//! boundary.
//!
//! # Pricing periods
//! Periods are ordered slot thresholds. A slot belongs to the last period
//! whose `from_slot` is ≤ the slot. With no periods every multiplier is 1.0.

use serde::{Deserialize, Serialize};

/// A half-open slot range `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpan {
    /// First occupied slot (inclusive).
    pub start: i64,
    /// First free slot after the span (exclusive).
    pub end: i64,
}

impl SlotSpan {
    /// Creates a span of `len` slots starting at `start`.
    pub fn new(start: i64, len: i64) -> Self {
        Self {
            start,
            end: start + len,
        }
    }

    /// Number of slots covered.
    #[inline]
    pub fn len(&self) -> i64 {
        self.end - self.start
    }

    /// Whether the span covers no slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether a slot falls within this span.
    #[inline]
    pub fn contains(&self, slot: i64) -> bool {
        slot >= self.start && slot < self.end
    }

    /// Whether two spans share at least one slot.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A pricing period starting at a slot threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingPeriod {
    /// Period name (e.g. "morning").
    pub name: String,
    /// First slot of the period.
    pub from_slot: i64,
    /// Multiplier applied to an activity's base value.
    pub multiplier: f64,
}

impl PricingPeriod {
    /// Creates a period.
    pub fn new(name: impl Into<String>, from_slot: i64, multiplier: f64) -> Self {
        Self {
            name: name.into(),
            from_slot,
            multiplier,
        }
    }
}

/// The discretized scheduling horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeGrid {
    /// Number of days.
    pub num_days: i64,
    /// Slots per day.
    pub num_slots_per_day: i64,
    /// Length of one slot in minutes.
    pub slot_duration_minutes: i64,
    /// Wall-clock minute (since midnight) at which slot 0 begins.
    #[serde(default)]
    pub day_start_minutes: i64,
    /// Pricing periods, ordered by `from_slot`.
    #[serde(default)]
    pub periods: Vec<PricingPeriod>,
}

impl TimeGrid {
    /// Creates a grid starting at midnight with no pricing periods.
    pub fn new(num_days: i64, num_slots_per_day: i64, slot_duration_minutes: i64) -> Self {
        Self {
            num_days,
            num_slots_per_day,
            slot_duration_minutes,
            day_start_minutes: 0,
            periods: Vec::new(),
        }
    }

    /// Sets the wall-clock start of each day.
    pub fn with_day_start(mut self, hour: i64, minute: i64) -> Self {
        self.day_start_minutes = hour * 60 + minute;
        self
    }

    /// Adds a period starting at a slot threshold.
    pub fn with_period(mut self, name: impl Into<String>, from_slot: i64, multiplier: f64) -> Self {
        self.periods.push(PricingPeriod::new(name, from_slot, multiplier));
        self
    }

    /// Adds a period starting at a wall-clock time.
    ///
    /// The threshold is the first slot starting at or after `hour:minute`.
    /// Times before the day start map to slot 0.
    pub fn with_clock_period(
        self,
        name: impl Into<String>,
        hour: i64,
        minute: i64,
        multiplier: f64,
    ) -> Self {
        let offset = (hour * 60 + minute - self.day_start_minutes).max(0);
        let len = self.slot_duration_minutes.max(1);
        let from_slot = (offset + len - 1) / len;
        self.with_period(name, from_slot, multiplier)
    }

    /// Total slots over all days.
    #[inline]
    pub fn total_slots(&self) -> i64 {
        self.num_days * self.num_slots_per_day
    }

    /// Slot index on the global axis (`day · slots_per_day + slot`).
    #[inline]
    pub fn global_slot(&self, day: i64, slot: i64) -> i64 {
        day * self.num_slots_per_day + slot
    }

    /// Whether a span of `len` slots starting at `start` fits in one day.
    #[inline]
    pub fn fits(&self, start: i64, len: i64) -> bool {
        start >= 0 && len >= 0 && start + len <= self.num_slots_per_day
    }

    /// Latest start slot for a span of `len`, or `None` if it never fits.
    pub fn latest_start(&self, len: i64) -> Option<i64> {
        let latest = self.num_slots_per_day - len;
        (latest >= 0).then_some(latest)
    }

    /// Converts slots to hours.
    pub fn slots_to_hours(&self, slots: i64) -> f64 {
        (slots * self.slot_duration_minutes) as f64 / 60.0
    }

    /// Wall-clock minute (since midnight) at which a slot begins.
    pub fn slot_to_minutes(&self, slot: i64) -> i64 {
        self.day_start_minutes + slot * self.slot_duration_minutes
    }

    /// Slot containing a wall-clock minute, if it lies within the day.
    pub fn slot_at_minutes(&self, minutes: i64) -> Option<i64> {
        let offset = minutes - self.day_start_minutes;
        if offset < 0 || self.slot_duration_minutes <= 0 {
            return None;
        }
        let slot = offset / self.slot_duration_minutes;
        (slot < self.num_slots_per_day).then_some(slot)
    }

    /// Formats the start of a slot as `HH:MM`.
    pub fn format_slot(&self, slot: i64) -> String {
        let minutes = self.slot_to_minutes(slot);
        format!("{:02}:{:02}", minutes / 60, minutes % 60)
    }

    /// Pricing period of a slot.
    pub fn period(&self, slot: i64) -> Option<&PricingPeriod> {
        self.periods.iter().rev().find(|p| p.from_slot <= slot)
    }

    /// Multiplier for a start slot. 1.0 when no period applies.
    pub fn multiplier(&self, slot: i64) -> f64 {
        self.period(slot).map(|p| p.multiplier).unwrap_or(1.0)
    }
}
