//! Session scoring and the final result record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;
use crate::round::RoundState;

/// When and how XP is awarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum XpPolicy {
    /// `xp` for every successful round.
    PerSuccess { xp: u32 },
    /// `xp` once at the end of a completed session whose accuracy reaches
    /// `min_accuracy` (fraction).
    LumpSum {
        xp: u32,
        #[serde(default)]
        min_accuracy: f64,
    },
}

impl Default for XpPolicy {
    fn default() -> Self {
        XpPolicy::PerSuccess { xp: 10 }
    }
}

/// Denominator used for accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyBasis {
    #[default]
    TotalRounds,
    /// Rounds actually resolved. Differs from `TotalRounds` only for
    /// aborted sessions.
    RoundsPlayed,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoringRules {
    #[serde(default)]
    pub xp: XpPolicy,
    #[serde(default)]
    pub accuracy_basis: AccuracyBasis,
}

impl ScoringRules {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let XpPolicy::LumpSum { min_accuracy, .. } = self.xp {
            if !(0.0..=1.0).contains(&min_accuracy) {
                return Err(ConfigError::InvalidValue {
                    key: "scoring.xp.min_accuracy".to_string(),
                    message: "must be in [0, 1]".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn accuracy(&self, successes: u32, played: u32, total: u32) -> f64 {
        let denominator = match self.accuracy_basis {
            AccuracyBasis::TotalRounds => total,
            AccuracyBasis::RoundsPlayed => played,
        };
        if denominator == 0 {
            0.0
        } else {
            f64::from(successes) / f64::from(denominator)
        }
    }

    pub fn xp(&self, successes: u32, accuracy: f64, completed: bool) -> u32 {
        match self.xp {
            XpPolicy::PerSuccess { xp } => successes.saturating_mul(xp),
            XpPolicy::LumpSum { xp, min_accuracy } => {
                if completed && accuracy >= min_accuracy {
                    xp
                } else {
                    0
                }
            }
        }
    }
}

/// What a finished (or aborted) session produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub session_id: Uuid,
    pub game_id: String,
    pub rounds_completed: u32,
    pub total_rounds: u32,
    pub successes: u32,
    pub failures: u32,
    /// Fraction in `[0, 1]`.
    pub accuracy: f64,
    pub xp_awarded: u32,
    /// False when the session was aborted before the last round resolved.
    pub completed: bool,
    pub finished_at: DateTime<Utc>,
    #[serde(default)]
    pub skill_tags: Vec<String>,
}

impl SessionResult {
    /// Compute the result from a terminal (or aborted) state.
    pub fn from_state(state: &RoundState) -> Self {
        let successes = state.score;
        let failures = state.failures;
        let rounds_completed = successes + failures;
        let completed = !state.aborted && rounds_completed >= state.total_rounds;
        let accuracy = state
            .scoring
            .accuracy(successes, rounds_completed, state.total_rounds);

        Self {
            session_id: state.session_id,
            game_id: state.game_id.clone(),
            rounds_completed,
            total_rounds: state.total_rounds,
            successes,
            failures,
            accuracy,
            xp_awarded: state.scoring.xp(successes, accuracy, completed),
            completed,
            finished_at: state.ended_at.unwrap_or(DateTime::UNIX_EPOCH),
            skill_tags: state.skill_tags.clone(),
        }
    }

    pub fn accuracy_percent(&self) -> u32 {
        (self.accuracy * 100.0).round() as u32
    }
}
