//! Error taxonomy.
//!
//! Construction and internal-consistency failures are errors. Infeasibility
//! and timeouts are not: they are ordinary outcomes carried in
//! [`SolveStatus`](crate::engine::SolveStatus).

use std::fmt;

use thiserror::Error;

/// Errors raised by a build-solve-extract cycle.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The instance is malformed. Raised before solving.
    #[error("instance '{instance}' rejected: {}", join_errors(.errors))]
    Construction {
        instance: String,
        errors: Vec<ConstructionError>,
    },

    /// The model and its interpretation disagree. Always a builder defect.
    #[error("internal consistency failure in instance '{instance}' ({rule}): {message}")]
    InternalConsistency {
        instance: String,
        rule: &'static str,
        message: String,
    },

    /// The engine could not process the model.
    #[error("engine error: {0}")]
    Engine(String),

    /// The solve configuration is out of range.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ScheduleError {
    pub(crate) fn consistency(
        instance: &str,
        rule: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InternalConsistency {
            instance: instance.to_string(),
            rule,
            message: message.into(),
        }
    }

    /// Construction errors, if this is a construction failure.
    pub fn construction_errors(&self) -> &[ConstructionError] {
        match self {
            Self::Construction { errors, .. } => errors,
            _ => &[],
        }
    }
}

/// Result alias for scheduling operations.
pub type Result<T> = std::result::Result<T, ScheduleError>;

/// A single construction error with the offending entity and field.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructionError {
    /// Error category.
    pub kind: ConstructionErrorKind,
    /// Offending entity (activity, resource, actor or `grid`).
    pub entity_id: String,
    /// Offending field.
    pub field: &'static str,
    /// Human-readable description.
    pub message: String,
}

/// Categories of construction errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionErrorKind {
    /// Two entities of the same kind share an ID.
    DuplicateId,
    /// A duration, setup time or claim is out of range.
    InvalidDuration,
    /// A dependency names an activity that doesn't exist.
    UnknownDependency,
    /// Dependency graph contains a cycle.
    CyclicDependency,
    /// An actor claim names an unknown activity or resource.
    InvalidClaim,
    /// An activity is claimed by more than one actor.
    DuplicateClaim,
    /// The assigned actor is below the activity's required level.
    Underqualified,
    /// Grid dimensions or pricing periods are malformed.
    InvalidGrid,
    /// A revenue or cost figure is negative or not finite.
    InvalidAmount,
}

impl ConstructionError {
    pub(crate) fn new(
        kind: ConstructionErrorKind,
        entity_id: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.entity_id, self.field, self.message)
    }
}

fn join_errors(errors: &[ConstructionError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
