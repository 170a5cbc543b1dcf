//! Scheduling domain models.
//!
//! Provides the catalog of things to place (activities), places to put them
//! (resources), people whose time they claim (actors), the discretized
//! horizon (time grid) and the resulting schedule.
//!
//! # Domain Mappings
//!
//! | u-timetable | University | Job shop | Project |
//! |-------------|------------|----------|---------|
//! | Activity | Course | Job | Task |
//! | Resource | Classroom | Machine | Role seat |
//! | Actor | Professor | Operator | Worker |
//! | Slot | 30-minute block | Shift hour | Workday |

mod activity;
mod actor;
mod catalog;
mod grid;
mod resource;
mod schedule;

pub use activity::{Activity, Priority};
pub use actor::{Actor, ActorClaim, SkillLevel};
pub use catalog::{Catalog, ProblemInstance};
pub use grid::{PricingPeriod, SlotSpan, TimeGrid};
pub use resource::Resource;
pub use schedule::{Placement, Schedule, Violation, ViolationType};
