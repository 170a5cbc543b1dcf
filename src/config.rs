//! Solve configuration.
//!
//! Selects the active rule families, the objective, the overlap encoding
//! and the engine's time budget. Loadable from TOML:
//!
//! ```
//! use u_timetable::config::{ObjectiveKind, SolveConfig};
//!
//! let config = SolveConfig::from_toml_str(r#"
//!     time_limit_secs = 10
//!     objective = "makespan"
//!
//!     [rules]
//!     actor_exclusivity = false
//! "#).unwrap();
//!
//! assert_eq!(config.objective, ObjectiveKind::Makespan);
//! assert!(!config.rules.actor_exclusivity);
//! assert!(config.rules.capability_pruning);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default time limit in seconds.
const DEFAULT_TIME_LIMIT_SECS: f64 = 60.0;

/// What the objective measures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    /// Maximize total net value (revenue × multiplier − costs).
    #[default]
    NetValue,
    /// Minimize the latest span end on the global slot axis.
    Makespan,
    /// Minimize `makespan_weight · makespan + Σ priority · end`.
    WeightedCompletion,
    /// Minimize `Σ duration + preparation time + travel distance` over
    /// the chosen placements.
    PlacementCost,
}

impl ObjectiveKind {
    /// Whether the objective needs start/end integer variables.
    pub fn is_temporal(self) -> bool {
        matches!(self, Self::Makespan | Self::WeightedCompletion)
    }
}

/// How resource and actor exclusivity is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapEncoding {
    /// `x1 + x2 ≤ 1` for every pair of intersecting placements.
    #[default]
    Pairwise,
    /// `Σ covering placements ≤ 1` for every slot.
    SlotCover,
}

/// Toggles for optional rule families.
///
/// Exactly-once assignment, horizon-fit and resource exclusivity are
/// always active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// Forbid placements on resources lacking a required capability.
    pub capability_pruning: bool,
    /// Forbid overlapping claims on one actor.
    pub actor_exclusivity: bool,
    /// Start dependents after their dependencies end.
    pub dependency_ordering: bool,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            capability_pruning: true,
            actor_exclusivity: true,
            dependency_ordering: true,
        }
    }
}

/// Configuration for one build-solve-extract cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveConfig {
    /// Engine time budget in seconds.
    pub time_limit_secs: f64,
    /// Active rule families.
    pub rules: RuleSet,
    /// Objective to optimize.
    pub objective: ObjectiveKind,
    /// Exclusivity encoding.
    pub overlap_encoding: OverlapEncoding,
    /// Minor units per currency unit for integer objective coefficients.
    pub money_scale: i64,
    /// Makespan weight in the weighted-completion objective.
    pub makespan_weight: i64,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            rules: RuleSet::default(),
            objective: ObjectiveKind::default(),
            overlap_encoding: OverlapEncoding::default(),
            money_scale: 100,
            makespan_weight: 100,
        }
    }
}

impl SolveConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist, contains invalid TOML, or
    /// holds out-of-range values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.time_limit_secs.is_finite() || self.time_limit_secs < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "time_limit_secs must be a non-negative number, got {}",
                self.time_limit_secs
            )));
        }
        if self.money_scale <= 0 {
            return Err(ConfigError::Invalid(format!(
                "money_scale must be positive, got {}",
                self.money_scale
            )));
        }
        if self.makespan_weight < 0 {
            return Err(ConfigError::Invalid(format!(
                "makespan_weight must not be negative, got {}",
                self.makespan_weight
            )));
        }
        Ok(())
    }

    /// Engine time budget. Limits beyond what a [`Duration`] holds mean
    /// no limit.
    pub fn time_limit(&self) -> Duration {
        Duration::try_from_secs_f64(self.time_limit_secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Sets the time limit.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_secs = limit.as_secs_f64();
        self
    }

    /// Sets the objective.
    pub fn with_objective(mut self, objective: ObjectiveKind) -> Self {
        self.objective = objective;
        self
    }

    /// Sets the rule toggles.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Sets the overlap encoding.
    pub fn with_overlap_encoding(mut self, encoding: OverlapEncoding) -> Self {
        self.overlap_encoding = encoding;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = SolveConfig::default();
        assert_eq!(c.time_limit(), Duration::from_secs(60));
        assert_eq!(c.objective, ObjectiveKind::NetValue);
        assert_eq!(c.overlap_encoding, OverlapEncoding::Pairwise);
        assert_eq!(c.money_scale, 100);
        assert!(c.rules.capability_pruning && c.rules.actor_exclusivity);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let c = SolveConfig::from_toml_str("").unwrap();
        assert_eq!(c.money_scale, 100);
        assert_eq!(c.rules, RuleSet::default());
    }

    #[test]
    fn test_full_toml() {
        let c = SolveConfig::from_toml_str(
            r#"
            time_limit_secs = 2.5
            objective = "weighted_completion"
            overlap_encoding = "slot_cover"
            money_scale = 1000
            makespan_weight = 10

            [rules]
            capability_pruning = false
            dependency_ordering = false
            "#,
        )
        .unwrap();
        assert_eq!(c.time_limit(), Duration::from_millis(2500));
        assert_eq!(c.objective, ObjectiveKind::WeightedCompletion);
        assert_eq!(c.overlap_encoding, OverlapEncoding::SlotCover);
        assert_eq!(c.makespan_weight, 10);
        assert!(!c.rules.capability_pruning);
        assert!(c.rules.actor_exclusivity);
        assert!(!c.rules.dependency_ordering);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            SolveConfig::from_toml_str("money_scale = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SolveConfig::from_toml_str("time_limit_secs = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SolveConfig::from_toml_str("objective = \"fastest\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SolveConfig::load("/nonexistent/solve.toml"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_builder_methods() {
        let c = SolveConfig::new()
            .with_time_limit(Duration::from_secs(5))
            .with_objective(ObjectiveKind::Makespan)
            .with_overlap_encoding(OverlapEncoding::SlotCover);
        assert_eq!(c.time_limit(), Duration::from_secs(5));
        assert!(c.objective.is_temporal());
        assert!(!ObjectiveKind::NetValue.is_temporal());
        assert!(!ObjectiveKind::PlacementCost.is_temporal());
    }

    #[test]
    fn test_huge_time_limit_saturates() {
        let c = SolveConfig::from_toml_str("time_limit_secs = 1e20").unwrap();
        assert_eq!(c.time_limit(), Duration::MAX);

        let c = SolveConfig::new().with_time_limit(Duration::MAX);
        assert_eq!(c.time_limit(), Duration::MAX);
    }

    #[test]
    fn test_placement_cost_from_toml() {
        let c = SolveConfig::from_toml_str("objective = \"placement_cost\"").unwrap();
        assert_eq!(c.objective, ObjectiveKind::PlacementCost);
    }
}
