//! Audio, haptic and speech feedback.
//!
//! The host implements [`FeedbackSink`]; the engine talks to it only
//! through [`FeedbackCoordinator`], which never lets a sink failure reach
//! the round logic.

mod coordinator;

use serde::{Deserialize, Serialize};

use crate::error::FeedbackError;

pub use coordinator::FeedbackCoordinator;

/// Short non-verbal sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "cue", rename_all = "snake_case")]
pub enum CueKind {
    Success,
    Miss,
    /// Early or late in a timing game.
    OffBeat,
    Ambiguous,
    Timeout,
    Countdown { tick: u32 },
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HapticPulse {
    Light,
    Medium,
}

/// Device-side feedback channels.
pub trait FeedbackSink: Send {
    fn play_cue(&mut self, cue: CueKind) -> Result<(), FeedbackError>;

    /// Devices without a vibration motor keep the default.
    fn haptic(&mut self, _pulse: HapticPulse) -> Result<(), FeedbackError> {
        Ok(())
    }

    fn speak(&mut self, text: &str, rate: f32) -> Result<(), FeedbackError>;

    fn stop_speech(&mut self) -> Result<(), FeedbackError>;
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFeedback;

impl FeedbackSink for NullFeedback {
    fn play_cue(&mut self, _cue: CueKind) -> Result<(), FeedbackError> {
        Ok(())
    }

    fn speak(&mut self, _text: &str, _rate: f32) -> Result<(), FeedbackError> {
        Ok(())
    }

    fn stop_speech(&mut self) -> Result<(), FeedbackError> {
        Ok(())
    }
}
