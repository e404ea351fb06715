use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::input::Outcome;
use crate::report::SessionResult;
use crate::round::{Phase, TimerKind};
use crate::target::Target;

/// Every engine state change produces an Event.
/// The presentation layer renders from these; `at_ms` is engine clock time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    GameStarted {
        session_id: Uuid,
        game_id: String,
        total_rounds: u32,
        at_ms: u64,
    },
    /// A new round's targets are on screen.
    RoundArmed {
        round: u32,
        targets: Vec<Target>,
        at_ms: u64,
    },
    PhaseChanged {
        round: u32,
        from: Phase,
        to: Phase,
        at_ms: u64,
    },
    CountdownTick {
        round: u32,
        tick: u32,
        /// Time left before the response deadline, if the game has one.
        remaining_ms: Option<u64>,
        at_ms: u64,
    },
    RoundResolved {
        round: u32,
        outcome: Outcome,
        score: u32,
        failures: u32,
        at_ms: u64,
    },
    /// Input that does not apply to this game; the round stays open.
    InputIgnored {
        round: u32,
        at_ms: u64,
    },
    /// Input captured for a round that is no longer current.
    StaleInputDropped {
        current_round: u32,
        input_round: Option<u32>,
        at_ms: u64,
    },
    StaleTimerDropped {
        current_round: u32,
        timer_round: u32,
        kind: TimerKind,
        at_ms: u64,
    },
    SessionEnded {
        result: SessionResult,
        at_ms: u64,
    },
    StateSnapshot {
        phase: Phase,
        round: u32,
        total_rounds: u32,
        score: u32,
        failures: u32,
        targets: Vec<Target>,
        at_ms: u64,
    },
}
