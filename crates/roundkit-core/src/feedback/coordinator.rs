use super::{CueKind, FeedbackSink, HapticPulse, NullFeedback};
use crate::input::{Outcome, OutcomeReason};
use crate::storage::FeedbackConfig;

/// Turns round outcomes into cues, pulses and phrases.
///
/// At most one phrase is in flight. A new phrase stops the previous one
/// first. The same cue is played once per round.
pub struct FeedbackCoordinator {
    sink: Box<dyn FeedbackSink>,
    config: FeedbackConfig,
    speaking: bool,
    last_cue: Option<(u32, CueKind)>,
}

impl FeedbackCoordinator {
    pub fn new(sink: Box<dyn FeedbackSink>, config: FeedbackConfig) -> Self {
        Self {
            sink,
            config,
            speaking: false,
            last_cue: None,
        }
    }

    /// Coordinator over [`NullFeedback`].
    pub fn silent() -> Self {
        Self::new(Box::new(NullFeedback), FeedbackConfig::default())
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn on_outcome(&mut self, round: u32, outcome: &Outcome) {
        let (cue, pulse) = match outcome.reason {
            OutcomeReason::Ignored => return,
            OutcomeReason::Hit => (CueKind::Success, HapticPulse::Light),
            OutcomeReason::Miss => (CueKind::Miss, HapticPulse::Medium),
            OutcomeReason::Early | OutcomeReason::Late => (CueKind::OffBeat, HapticPulse::Medium),
            OutcomeReason::Ambiguous => (CueKind::Ambiguous, HapticPulse::Light),
            OutcomeReason::Timeout => (CueKind::Timeout, HapticPulse::Medium),
        };

        self.cue(round, cue);
        if self.config.haptics_enabled {
            if let Err(e) = self.sink.haptic(pulse) {
                tracing::warn!(error = %e, "haptic pulse failed");
            }
        }
        if let Some(phrase) = self.phrase_for(round, outcome.reason) {
            self.say(&phrase);
        }
    }

    pub fn on_countdown(&mut self, round: u32, tick: u32) {
        self.cue(round, CueKind::Countdown { tick });
    }

    pub fn on_game_over(&mut self, round: u32) {
        self.cue(round, CueKind::GameOver);
    }

    /// The host reports that the current phrase finished playing.
    pub fn speech_finished(&mut self) {
        self.speaking = false;
    }

    /// Stop any phrase in flight. Used on teardown.
    pub fn silence(&mut self) {
        if self.speaking {
            if let Err(e) = self.sink.stop_speech() {
                tracing::warn!(error = %e, "stopping speech failed");
            }
        }
        self.speaking = false;
        self.last_cue = None;
    }

    fn cue(&mut self, round: u32, cue: CueKind) {
        if self.last_cue == Some((round, cue)) {
            return;
        }
        self.last_cue = Some((round, cue));
        if let Err(e) = self.sink.play_cue(cue) {
            tracing::warn!(error = %e, ?cue, "feedback cue failed");
        }
    }

    fn say(&mut self, text: &str) {
        if self.speaking {
            if let Err(e) = self.sink.stop_speech() {
                tracing::warn!(error = %e, "stopping speech failed");
            }
        }
        match self.sink.speak(text, self.config.speech_rate) {
            Ok(()) => self.speaking = true,
            Err(e) => {
                self.speaking = false;
                tracing::warn!(error = %e, "speech failed");
            }
        }
    }

    fn phrase_for(&self, round: u32, reason: OutcomeReason) -> Option<String> {
        if !self.config.speech_enabled {
            return None;
        }
        let rotate = |phrases: &[String]| -> Option<String> {
            if phrases.is_empty() {
                None
            } else {
                Some(phrases[round as usize % phrases.len()].clone())
            }
        };
        let phrase = match reason {
            OutcomeReason::Hit => rotate(&self.config.praise),
            OutcomeReason::Miss | OutcomeReason::Ambiguous => rotate(&self.config.encouragement),
            OutcomeReason::Early => Some(self.config.early_phrase.clone()),
            OutcomeReason::Late => Some(self.config.late_phrase.clone()),
            OutcomeReason::Timeout => Some(self.config.timeout_phrase.clone()),
            OutcomeReason::Ignored => None,
        };
        phrase.filter(|p| !p.is_empty())
    }
}
