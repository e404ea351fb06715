use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::RoundConfig;
use crate::input::Outcome;
use crate::report::ScoringRules;
use crate::target::Target;
use crate::timer::TimerHandle;

/// Round lifecycle.
///
/// ```text
/// Idle ─→ Armed ─→ AwaitingInput ─→ Evaluating ─→ Resolved ─→ Advancing ─→ Armed
///                                                          └─→ Ended
/// ```
///
/// `abort()` moves any phase to `Ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Armed,
    AwaitingInput,
    Evaluating,
    Resolved,
    Advancing,
    Ended,
}

impl Phase {
    /// Phases in which a player input can still count for the round.
    pub fn accepts_input(self) -> bool {
        matches!(self, Phase::Armed | Phase::AwaitingInput)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Armed → AwaitingInput.
    Ready,
    ResponseDeadline,
    /// Resolved → Advancing/Ended.
    Settle,
    CountdownTick,
}

/// Timer payload. Stamped with the round and the arming epoch so a timer
/// that outlives its round is recognized and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTimer {
    pub kind: TimerKind,
    pub round: u32,
    pub epoch: u64,
}

/// Everything the engine knows about the running session.
#[derive(Debug, Clone)]
pub struct RoundState {
    pub session_id: Uuid,
    pub game_id: String,
    pub skill_tags: Vec<String>,
    pub scoring: ScoringRules,
    pub phase: Phase,
    /// 1-based; 0 before the first round is armed.
    pub round: u32,
    pub total_rounds: u32,
    /// Successful rounds.
    pub score: u32,
    pub failures: u32,
    pub targets: Vec<Target>,
    /// Every pending timer the engine scheduled.
    pub timers: Vec<TimerHandle>,
    pub last_outcome: Option<Outcome>,
    pub aborted: bool,
    /// Bumped every time a round is armed.
    pub epoch: u64,
    pub armed_at_ms: Option<u64>,
    pub awaiting_since_ms: Option<u64>,
    pub countdown_ticks: u32,
    pub ended_at: Option<DateTime<Utc>>,
}

impl RoundState {
    pub fn new(config: &RoundConfig) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            game_id: config.game_id.clone(),
            skill_tags: config.skill_tags.clone(),
            scoring: config.scoring.clone(),
            phase: Phase::Idle,
            round: 0,
            total_rounds: config.total_rounds,
            score: 0,
            failures: 0,
            targets: Vec::new(),
            timers: Vec::new(),
            last_outcome: None,
            aborted: false,
            epoch: 0,
            armed_at_ms: None,
            awaiting_since_ms: None,
            countdown_ticks: 0,
            ended_at: None,
        }
    }

    pub fn rounds_resolved(&self) -> u32 {
        self.score + self.failures
    }

    pub fn is_last_round(&self) -> bool {
        self.round >= self.total_rounds
    }

    pub fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }
}
