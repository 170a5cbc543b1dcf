//! Resource × time-slot timetabling for the U-Engine ecosystem.
//!
//! Places every activity on exactly one resource, day and start slot so that
//! resources and actors are never double-booked, capabilities match, spans
//! stay inside their day and dependencies are respected, while optimizing net
//! value or a temporal objective.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Activity`, `Resource`, `Actor`, `TimeGrid`,
//!   `ProblemInstance`, `Catalog`, `Schedule`
//! - **`validation`**: Input integrity checks (duplicate IDs, DAG cycles,
//!   claims, grid shape, money values)
//! - **`engine`**: The `ConstraintEngine` boundary and the bundled
//!   Pumpkin-backed engine
//! - **`cp`**: Model builder, placement arena, solution extractor and
//!   objective evaluator
//! - **`verify`**: Independent post-hoc schedule checks
//! - **`scheduler`**: The build-solve-extract pipeline and KPIs
//! - **`config`**: TOML-loadable solve configuration
//! - **`error`**: Error taxonomy
//!
//! # Example
//!
//! ```
//! use u_timetable::config::SolveConfig;
//! use u_timetable::models::{Activity, ProblemInstance, Resource, TimeGrid};
//! use u_timetable::scheduler::CpScheduler;
//!
//! let grid = TimeGrid::new(1, 16, 30)
//!     .with_day_start(8, 0)
//!     .with_clock_period("morning", 8, 0, 1.0)
//!     .with_clock_period("afternoon", 12, 0, 1.1);
//! let instance = ProblemInstance::new("intro", grid)
//!     .with_activity(Activity::new("Math101", 4).with_base_value(5000.0))
//!     .with_resource(Resource::new("Room101").with_setup_time(2).with_costs(150.0, 50.0));
//!
//! let outcome = CpScheduler::new(SolveConfig::default()).solve(&instance).unwrap();
//! let schedule = outcome.schedule.unwrap();
//! assert_eq!(schedule.records[0].period.as_deref(), Some("afternoon"));
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Rossi, van Beek, Walsh (2006), "Handbook of Constraint Programming"

pub mod config;
pub mod cp;
pub mod engine;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod validation;
pub mod verify;
