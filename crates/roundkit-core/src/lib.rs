//! # roundkit Core Library
//!
//! A timed interaction round engine for short children's mini-games: tap
//! the balloon, swipe big or small, tap on the beat, follow the moving dot.
//! Every game runs on the same engine; what differs is a [`RoundConfig`]
//! and an [`Evaluator`] strategy.
//!
//! ## Architecture
//!
//! - **Timer Service**: virtual-clock scheduler, driven by the caller's
//!   `tick()`; no internal thread
//! - **Target Generator**: seeded placement of correct targets, distractors
//!   and moving dots
//! - **Input Evaluator**: position, timing, displacement and composite
//!   hit tests
//! - **Round Engine**: the phase state machine; owns every timer and target
//! - **Feedback**: cues, haptics and speech through a host-provided sink
//! - **Report**: scoring and best-effort result submission
//!
//! ## Key Components
//!
//! - [`RoundEngine`]: Core round state machine
//! - [`Evaluator`]: Hit-test strategy
//! - [`SessionReporter`]: Result finalization and submission
//! - [`Config`]: Application configuration and game presets

pub mod error;
pub mod events;
pub mod feedback;
pub mod input;
pub mod report;
pub mod round;
pub mod storage;
pub mod target;
pub mod timer;

pub use error::{ConfigError, CoreError, FeedbackError, GenerationError, ReportError};
pub use events::Event;
pub use feedback::{CueKind, FeedbackCoordinator, FeedbackSink, HapticPulse, NullFeedback};
pub use input::{Evaluator, InputEvent, InputKind, Outcome, OutcomeReason};
pub use report::{HttpStatsApi, ScoringRules, SessionReporter, SessionResult, StatsApi};
pub use round::{start_game, Phase, RoundConfig, RoundEngine, RoundState, TargetLayout};
pub use storage::Config;
pub use target::{Point, Target, TargetGenerator};
pub use timer::TimerService;
