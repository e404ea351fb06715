//! Per-game round parameters.
//!
//! A `RoundConfig` is fixed when a game starts. Screen-specific behavior
//! ("tap the red balloon", "swipe big to the left") is expressed here and
//! in the [`Evaluator`] strategy rather than in separate engines.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::input::Evaluator;
use crate::report::ScoringRules;
use crate::target::{Direction, Playfield, SwipeBand};

/// How many targets a round shows and how they relate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetLayout {
    /// One target, always the correct one.
    #[default]
    Single,
    /// `count` targets kept `min_separation` apart; the first is correct.
    Distractors {
        count: usize,
        #[serde(default = "default_min_separation")]
        min_separation: f64,
        #[serde(default = "default_max_attempts")]
        max_attempts: u32,
    },
    /// One correct target of a random category plus `distractors` targets
    /// of other categories.
    Matching {
        categories: Vec<String>,
        distractors: usize,
        #[serde(default = "default_min_separation")]
        min_separation: f64,
        #[serde(default = "default_max_attempts")]
        max_attempts: u32,
        /// Never pick the previous round's correct category again.
        #[serde(default)]
        avoid_repeat_correct: bool,
    },
}

impl TargetLayout {
    pub fn target_count(&self) -> usize {
        match self {
            TargetLayout::Single => 1,
            TargetLayout::Distractors { count, .. } => *count,
            TargetLayout::Matching { distractors, .. } => distractors + 1,
        }
    }
}

/// Speed range for moving targets, pixels per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionRule {
    pub min_speed: f64,
    pub max_speed: f64,
}

/// Pool the generator draws swipe requirements from. An empty list means
/// that aspect is not required.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SwipeRule {
    #[serde(default)]
    pub bands: Vec<SwipeBand>,
    #[serde(default)]
    pub directions: Vec<Direction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundConfig {
    pub game_id: String,
    #[serde(default = "default_total_rounds")]
    pub total_rounds: u32,
    /// Target diameter in pixels.
    #[serde(default = "default_target_size")]
    pub target_size: f64,
    /// Delay between arming a round and accepting input. Zero means the
    /// round accepts input as soon as it is armed.
    #[serde(default)]
    pub ready_delay_ms: u64,
    /// Response deadline measured from the start of `AwaitingInput`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_timeout_ms: Option<u64>,
    /// Pause between resolving a round and advancing.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Emit a countdown tick at this interval while awaiting input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countdown_interval_ms: Option<u64>,
    #[serde(default)]
    pub skill_tags: Vec<String>,
    #[serde(default)]
    pub playfield: Playfield,
    #[serde(default)]
    pub layout: TargetLayout,
    pub evaluator: Evaluator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion: Option<MotionRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swipe: Option<SwipeRule>,
    #[serde(default)]
    pub scoring: ScoringRules,
}

fn default_total_rounds() -> u32 {
    10
}
fn default_target_size() -> f64 {
    80.0
}
fn default_settle_delay_ms() -> u64 {
    800
}
fn default_min_separation() -> f64 {
    100.0
}
fn default_max_attempts() -> u32 {
    30
}

impl RoundConfig {
    /// A single-target tap game with a position evaluator and defaults
    /// for everything else.
    pub fn new(game_id: impl Into<String>, evaluator: Evaluator) -> Self {
        Self {
            game_id: game_id.into(),
            total_rounds: default_total_rounds(),
            target_size: default_target_size(),
            ready_delay_ms: 0,
            response_timeout_ms: None,
            settle_delay_ms: default_settle_delay_ms(),
            countdown_interval_ms: None,
            skill_tags: Vec::new(),
            playfield: Playfield::default(),
            layout: TargetLayout::Single,
            evaluator,
            motion: None,
            swipe: None,
            scoring: ScoringRules::default(),
        }
    }

    /// Check every parameter once, before the game starts.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };

        if self.game_id.trim().is_empty() {
            return invalid("game_id", "must not be empty");
        }
        if self.total_rounds == 0 {
            return invalid("total_rounds", "must be at least 1");
        }
        if self.target_size.is_nan() || self.target_size <= 0.0 {
            return invalid("target_size", "must be positive");
        }
        if !self.playfield.fits(self.target_size) {
            return invalid("playfield", "smaller than one target");
        }
        if self.response_timeout_ms == Some(0) {
            return invalid("response_timeout_ms", "must be positive when set");
        }
        if self.countdown_interval_ms == Some(0) {
            return invalid("countdown_interval_ms", "must be positive when set");
        }

        match &self.layout {
            TargetLayout::Single => {}
            TargetLayout::Distractors { count, min_separation, .. } => {
                if *count == 0 {
                    return invalid("layout.count", "must be at least 1");
                }
                if *min_separation < 0.0 {
                    return invalid("layout.min_separation", "must not be negative");
                }
            }
            TargetLayout::Matching {
                categories,
                distractors,
                min_separation,
                ..
            } => {
                if categories.is_empty() {
                    return invalid("layout.categories", "must not be empty");
                }
                let distinct: BTreeSet<&str> = categories.iter().map(String::as_str).collect();
                if *distractors > 0 && distinct.len() < 2 {
                    return invalid(
                        "layout.categories",
                        "distractors need at least two distinct categories",
                    );
                }
                if *min_separation < 0.0 {
                    return invalid("layout.min_separation", "must not be negative");
                }
            }
        }

        if let Some(motion) = &self.motion {
            if motion.min_speed < 0.0 || motion.min_speed > motion.max_speed {
                return invalid("motion", "need 0 <= min_speed <= max_speed");
            }
        }

        self.evaluator.validate()?;
        self.scoring.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reaction() -> RoundConfig {
        RoundConfig::new("reaction", Evaluator::Position { tolerance_px: 50.0 })
    }

    #[test]
    fn default_reaction_config_is_valid() {
        assert!(reaction().validate().is_ok());
    }

    #[test]
    fn zero_rounds_rejected() {
        let mut cfg = reaction();
        cfg.total_rounds = 0;
        match cfg.validate() {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "total_rounds"),
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn oversized_target_rejected() {
        let mut cfg = reaction();
        cfg.playfield = Playfield::new(60.0, 600.0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn matching_without_categories_rejected() {
        let mut cfg = reaction();
        cfg.layout = TargetLayout::Matching {
            categories: vec![],
            distractors: 2,
            min_separation: 90.0,
            max_attempts: 10,
            avoid_repeat_correct: false,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn matching_distractors_need_a_second_category() {
        let mut cfg = reaction();
        cfg.layout = TargetLayout::Matching {
            categories: vec!["red".into(), "red".into()],
            distractors: 2,
            min_separation: 90.0,
            max_attempts: 10,
            avoid_repeat_correct: false,
        };
        match cfg.validate() {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "layout.categories"),
            other => panic!("expected InvalidValue, got {other:?}"),
        }

        // No distractors: a single category is fine.
        cfg.layout = TargetLayout::Matching {
            categories: vec!["red".into()],
            distractors: 0,
            min_separation: 90.0,
            max_attempts: 10,
            avoid_repeat_correct: false,
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn target_count_per_layout() {
        assert_eq!(TargetLayout::Single.target_count(), 1);
        let matching = TargetLayout::Matching {
            categories: vec!["red".into()],
            distractors: 3,
            min_separation: 90.0,
            max_attempts: 10,
            avoid_repeat_correct: false,
        };
        assert_eq!(matching.target_count(), 4);
    }

    #[test]
    fn toml_roundtrip() {
        let mut cfg = reaction();
        cfg.layout = TargetLayout::Distractors {
            count: 3,
            min_separation: 120.0,
            max_attempts: 20,
        };
        cfg.response_timeout_ms = Some(3_000);
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: RoundConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, cfg);
    }
}
