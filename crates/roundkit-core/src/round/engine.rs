//! Round engine.
//!
//! One engine runs every mini-game: the game is a [`RoundConfig`] plus an
//! evaluator strategy. The engine has no internal thread; the host calls
//! `tick()` with the current time and forwards player input through
//! `report_input()`. Every call returns the [`Event`]s it produced.
//!
//! ## Round cleanup
//!
//! Arming a round first cancels every timer the engine owns and discards
//! every target of the previous round. Timers and inputs carry the round
//! they belong to; anything that arrives for another round is dropped and
//! reported, never scored.
//!
//! ## Usage
//!
//! ```ignore
//! let (mut engine, events) = start_game(config, feedback, reporter, now)?;
//! // In the host loop:
//! engine.tick(now);
//! engine.report_input(InputEvent::tap(point, now).for_round(engine.round()));
//! ```

use chrono::Utc;
use tokio::task::JoinHandle;

use super::config::RoundConfig;
use super::state::{Phase, RoundState, RoundTimer, TimerKind};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::feedback::FeedbackCoordinator;
use crate::input::{InputEvent, Outcome};
use crate::report::{SessionReporter, SessionResult};
use crate::target::{Target, TargetGenerator};
use crate::timer::{Fired, TimerService};

/// Validate `config`, build an engine and arm round 1.
pub fn start_game(
    config: RoundConfig,
    feedback: FeedbackCoordinator,
    reporter: SessionReporter,
    now_ms: u64,
) -> Result<(RoundEngine, Vec<Event>)> {
    let mut engine = RoundEngine::new(config, feedback, reporter)?;
    let events = engine.start(now_ms)?;
    Ok((engine, events))
}

pub struct RoundEngine {
    config: RoundConfig,
    state: RoundState,
    timers: TimerService<RoundTimer>,
    generator: TargetGenerator,
    feedback: FeedbackCoordinator,
    reporter: SessionReporter,
    submission: Option<JoinHandle<()>>,
}

impl RoundEngine {
    /// # Errors
    ///
    /// Returns `CoreError::Config` when `config` does not validate.
    pub fn new(
        config: RoundConfig,
        feedback: FeedbackCoordinator,
        reporter: SessionReporter,
    ) -> Result<Self> {
        config.validate()?;
        let state = RoundState::new(&config);
        Ok(Self {
            config,
            state,
            timers: TimerService::new(0),
            generator: TargetGenerator::new(),
            feedback,
            reporter,
            submission: None,
        })
    }

    /// Replace the target generator, typically with a seeded one.
    pub fn with_generator(mut self, generator: TargetGenerator) -> Self {
        self.generator = generator;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn round(&self) -> u32 {
        self.state.round
    }

    pub fn score(&self) -> u32 {
        self.state.score
    }

    pub fn failures(&self) -> u32 {
        self.state.failures
    }

    pub fn targets(&self) -> &[Target] {
        &self.state.targets
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    pub fn now_ms(&self) -> u64 {
        self.timers.now_ms()
    }

    /// Deadline of the earliest pending timer, for hosts that sleep
    /// between ticks.
    pub fn next_timer_due_ms(&self) -> Option<u64> {
        self.timers.next_due_ms()
    }

    /// Number of timers the engine currently owns.
    pub fn pending_timers(&self) -> usize {
        self.state
            .timers
            .iter()
            .filter(|h| self.timers.is_pending(**h))
            .count()
    }

    /// Whether a feedback phrase is still in flight.
    pub fn is_speaking(&self) -> bool {
        self.feedback.is_speaking()
    }

    /// The session result, once the session has ended.
    pub fn result(&self) -> Option<&SessionResult> {
        self.reporter.result()
    }

    /// The background result submission, if one was spawned.
    pub fn take_submission(&mut self) -> Option<JoinHandle<()>> {
        self.submission.take()
    }

    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.state.phase,
            round: self.state.round,
            total_rounds: self.state.total_rounds,
            score: self.state.score,
            failures: self.state.failures,
            targets: self.state.targets.clone(),
            at_ms: self.now_ms(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the session: `Idle → Armed` for round 1.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` if the session already started, `Generation`
    /// if round 1's targets cannot be generated (the engine stays idle).
    pub fn start(&mut self, now_ms: u64) -> Result<Vec<Event>> {
        if self.state.phase != Phase::Idle {
            return Err(CoreError::InvalidTransition {
                phase: self.state.phase,
                operation: "start",
            });
        }

        self.timers.advance_to(now_ms);
        let mut events = vec![Event::GameStarted {
            session_id: self.state.session_id,
            game_id: self.state.game_id.clone(),
            total_rounds: self.state.total_rounds,
            at_ms: self.now_ms(),
        }];
        self.arm_round(1, &mut events)?;

        tracing::info!(
            game = %self.state.game_id,
            session = %self.state.session_id,
            rounds = self.state.total_rounds,
            "game started"
        );
        Ok(events)
    }

    /// Feed one player input to the current round.
    ///
    /// Timers due by the time the input completed are dispatched first,
    /// so an input never beats a deadline that already passed.
    pub fn report_input(&mut self, input: InputEvent) -> Vec<Event> {
        let mut events = self.tick(input.end_ms);
        let now = self.now_ms();

        if self.is_stale(&input) {
            tracing::debug!(
                current_round = self.state.round,
                input_round = ?input.round,
                phase = ?self.state.phase,
                "dropping stale input"
            );
            events.push(Event::StaleInputDropped {
                current_round: self.state.round,
                input_round: input.round,
                at_ms: now,
            });
            return events;
        }

        let outcome = self.config.evaluator.evaluate(&input, &self.state.targets);
        if !outcome.consumes_round() {
            events.push(Event::InputIgnored {
                round: self.state.round,
                at_ms: now,
            });
            return events;
        }

        if self.state.phase == Phase::Armed {
            self.cancel_owned_timers();
            self.enter_awaiting(&mut events);
        }
        self.set_phase(Phase::Evaluating, &mut events);
        self.resolve(outcome, &mut events);
        events
    }

    /// Advance the clock to `now_ms` and dispatch every timer due by then.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Event> {
        let mut events = Vec::new();
        self.timers.advance_to(now_ms);
        while let Some(fired) = self.timers.pop_due() {
            self.dispatch(fired, &mut events);
        }
        events
    }

    /// End the session now with a partial result. Does nothing once the
    /// session has ended.
    pub fn abort(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.state.phase != Phase::Ended {
            self.state.aborted = true;
            self.finish(&mut events);
        }
        events
    }

    /// The host reports that the last phrase finished playing, so the next
    /// one does not interrupt anything.
    pub fn speech_finished(&mut self) {
        self.feedback.speech_finished();
    }

    /// The host is leaving the game screen: abort an unfinished session,
    /// release every timer and target, stop speech.
    pub fn teardown(&mut self) -> Vec<Event> {
        let events = self.abort();
        self.cancel_owned_timers();
        self.state.targets.clear();
        self.feedback.silence();
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn is_stale(&self, input: &InputEvent) -> bool {
        if !self.state.phase.accepts_input() {
            return true;
        }
        if input.round.is_some_and(|r| r != self.state.round) {
            return true;
        }
        // Captured while the previous round was still on screen.
        self.state
            .armed_at_ms
            .is_some_and(|armed| input.end_ms <= armed)
    }

    fn arm_round(&mut self, round: u32, events: &mut Vec<Event>) -> Result<()> {
        let now = self.now_ms();
        self.cancel_owned_timers();
        let previous = std::mem::take(&mut self.state.targets);

        let targets = self
            .generator
            .next(&self.config, &previous, round, now)?;

        self.state.round = round;
        self.state.epoch += 1;
        self.state.targets = targets;
        self.state.armed_at_ms = Some(now);
        self.state.awaiting_since_ms = None;
        self.state.countdown_ticks = 0;
        self.state.last_outcome = None;

        self.set_phase(Phase::Armed, events);
        events.push(Event::RoundArmed {
            round,
            targets: self.state.targets.clone(),
            at_ms: now,
        });

        if self.config.ready_delay_ms == 0 {
            self.enter_awaiting(events);
        } else {
            self.schedule(TimerKind::Ready, self.config.ready_delay_ms);
        }
        Ok(())
    }

    fn enter_awaiting(&mut self, events: &mut Vec<Event>) {
        self.set_phase(Phase::AwaitingInput, events);
        self.state.awaiting_since_ms = Some(self.now_ms());
        if let Some(timeout) = self.config.response_timeout_ms {
            self.schedule(TimerKind::ResponseDeadline, timeout);
        }
        if let Some(interval) = self.config.countdown_interval_ms {
            let handle = self.timers.schedule_repeating(
                interval,
                RoundTimer {
                    kind: TimerKind::CountdownTick,
                    round: self.state.round,
                    epoch: self.state.epoch,
                },
            );
            self.state.timers.push(handle);
        }
    }

    fn resolve(&mut self, outcome: Outcome, events: &mut Vec<Event>) {
        self.cancel_owned_timers();

        if outcome.is_hit() {
            self.state.score = (self.state.score + 1).min(self.state.total_rounds);
        } else {
            self.state.failures += 1;
        }
        self.feedback.on_outcome(self.state.round, &outcome);

        self.set_phase(Phase::Resolved, events);
        events.push(Event::RoundResolved {
            round: self.state.round,
            outcome: outcome.clone(),
            score: self.state.score,
            failures: self.state.failures,
            at_ms: self.now_ms(),
        });
        self.state.last_outcome = Some(outcome);

        self.schedule(TimerKind::Settle, self.config.settle_delay_ms);
    }

    fn dispatch(&mut self, fired: Fired<RoundTimer>, events: &mut Vec<Event>) {
        let timer = fired.payload;
        let now = self.now_ms();

        if timer.kind != TimerKind::CountdownTick {
            self.state.timers.retain(|h| *h != fired.handle);
        }

        let expected_phase = match timer.kind {
            TimerKind::Ready => Phase::Armed,
            TimerKind::ResponseDeadline | TimerKind::CountdownTick => Phase::AwaitingInput,
            TimerKind::Settle => Phase::Resolved,
        };
        if timer.round != self.state.round
            || timer.epoch != self.state.epoch
            || self.state.phase != expected_phase
        {
            self.timers.cancel(fired.handle);
            tracing::debug!(
                current_round = self.state.round,
                timer_round = timer.round,
                kind = ?timer.kind,
                "dropping stale timer"
            );
            events.push(Event::StaleTimerDropped {
                current_round: self.state.round,
                timer_round: timer.round,
                kind: timer.kind,
                at_ms: now,
            });
            return;
        }

        match timer.kind {
            TimerKind::Ready => self.enter_awaiting(events),
            TimerKind::ResponseDeadline => {
                self.set_phase(Phase::Evaluating, events);
                self.resolve(Outcome::timeout(), events);
            }
            TimerKind::CountdownTick => {
                self.state.countdown_ticks += 1;
                let tick = self.state.countdown_ticks;
                let remaining_ms = self
                    .config
                    .response_timeout_ms
                    .zip(self.state.awaiting_since_ms)
                    .map(|(timeout, since)| (since + timeout).saturating_sub(now));
                self.feedback.on_countdown(self.state.round, tick);
                events.push(Event::CountdownTick {
                    round: self.state.round,
                    tick,
                    remaining_ms,
                    at_ms: now,
                });
            }
            TimerKind::Settle => {
                if self.state.is_last_round() {
                    self.finish(events);
                    return;
                }
                self.set_phase(Phase::Advancing, events);
                let next = self.state.round + 1;
                if let Err(e) = self.arm_round(next, events) {
                    tracing::error!(round = next, error = %e, "target generation failed, ending session");
                    self.state.aborted = true;
                    self.finish(events);
                }
            }
        }
    }

    fn finish(&mut self, events: &mut Vec<Event>) {
        self.cancel_owned_timers();
        self.state.targets.clear();
        self.state.ended_at = Some(Utc::now());
        self.set_phase(Phase::Ended, events);
        if !self.state.aborted {
            self.feedback.on_game_over(self.state.round);
        }

        let result = self.reporter.finalize(&self.state);
        tracing::info!(
            game = %result.game_id,
            session = %result.session_id,
            successes = result.successes,
            failures = result.failures,
            completed = result.completed,
            "game ended"
        );
        self.submission = self.reporter.submit(&result);
        events.push(Event::SessionEnded {
            result,
            at_ms: self.now_ms(),
        });
    }

    fn schedule(&mut self, kind: TimerKind, delay_ms: u64) {
        let handle = self.timers.schedule(
            delay_ms,
            RoundTimer {
                kind,
                round: self.state.round,
                epoch: self.state.epoch,
            },
        );
        self.state.timers.push(handle);
    }

    fn cancel_owned_timers(&mut self) {
        let handles = std::mem::take(&mut self.state.timers);
        self.timers.cancel_all(handles);
    }

    fn set_phase(&mut self, to: Phase, events: &mut Vec<Event>) {
        let from = self.state.phase;
        if from == to {
            return;
        }
        self.state.phase = to;
        events.push(Event::PhaseChanged {
            round: self.state.round,
            from,
            to,
            at_ms: self.now_ms(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Evaluator, OutcomeReason};
    use crate::target::Point;

    fn reaction(rounds: u32) -> RoundConfig {
        RoundConfig {
            total_rounds: rounds,
            settle_delay_ms: 500,
            response_timeout_ms: Some(3_000),
            ..RoundConfig::new("reaction", Evaluator::Position { tolerance_px: 50.0 })
        }
    }

    fn engine(config: RoundConfig) -> RoundEngine {
        RoundEngine::new(config, FeedbackCoordinator::silent(), SessionReporter::new())
            .unwrap()
            .with_generator(TargetGenerator::seeded(7))
    }

    fn tap_target(engine: &mut RoundEngine, at_ms: u64) -> Vec<Event> {
        let center = engine.targets()[0].position;
        engine.report_input(InputEvent::tap(center, at_ms).for_round(engine.round()))
    }

    #[test]
    fn start_arms_round_one() {
        let mut engine = engine(reaction(3));
        let events = engine.start(1_000).unwrap();
        assert!(matches!(events[0], Event::GameStarted { total_rounds: 3, .. }));
        assert!(events.iter().any(|e| matches!(e, Event::RoundArmed { round: 1, .. })));
        assert_eq!(engine.phase(), Phase::AwaitingInput);
        assert_eq!(engine.targets().len(), 1);
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut engine = engine(reaction(3));
        engine.start(0).unwrap();
        let err = engine.start(10).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { operation: "start", .. }));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = RoundConfig {
            total_rounds: 0,
            ..reaction(1)
        };
        assert!(RoundEngine::new(config, FeedbackCoordinator::silent(), SessionReporter::new()).is_err());
    }

    #[test]
    fn hit_then_settle_advances() {
        let mut engine = engine(reaction(3));
        engine.start(0).unwrap();
        let events = tap_target(&mut engine, 100);
        assert_eq!(engine.phase(), Phase::Resolved);
        assert_eq!(engine.score(), 1);
        assert!(events.iter().any(|e| matches!(
            e,
            Event::RoundResolved { round: 1, score: 1, .. }
        )));

        engine.tick(599);
        assert_eq!(engine.round(), 1);
        engine.tick(600);
        assert_eq!(engine.round(), 2);
        assert_eq!(engine.phase(), Phase::AwaitingInput);
    }

    #[test]
    fn timeout_counts_as_failure() {
        let mut engine = engine(reaction(2));
        engine.start(0).unwrap();
        let events = engine.tick(3_000);
        assert_eq!(engine.failures(), 1);
        let outcome = events.iter().find_map(|e| match e {
            Event::RoundResolved { outcome, .. } => Some(outcome.reason),
            _ => None,
        });
        assert_eq!(outcome, Some(OutcomeReason::Timeout));
    }

    #[test]
    fn ready_delay_holds_round_in_armed() {
        let config = RoundConfig {
            ready_delay_ms: 400,
            ..reaction(2)
        };
        let mut engine = engine(config);
        engine.start(0).unwrap();
        assert_eq!(engine.phase(), Phase::Armed);
        engine.tick(400);
        assert_eq!(engine.phase(), Phase::AwaitingInput);
    }

    #[test]
    fn input_while_armed_is_evaluated() {
        let config = RoundConfig {
            ready_delay_ms: 400,
            ..reaction(2)
        };
        let mut engine = engine(config);
        engine.start(0).unwrap();
        tap_target(&mut engine, 200);
        assert_eq!(engine.phase(), Phase::Resolved);
        assert_eq!(engine.score(), 1);
        // The ready timer was cancelled and never fires.
        let events = engine.tick(400);
        assert!(events.is_empty());
    }

    #[test]
    fn second_input_for_resolved_round_is_dropped() {
        let mut engine = engine(reaction(3));
        engine.start(0).unwrap();
        tap_target(&mut engine, 100);
        let events = tap_target(&mut engine, 120);
        assert!(matches!(events[0], Event::StaleInputDropped { .. }));
        assert_eq!(engine.score(), 1);
        assert_eq!(engine.failures(), 0);
    }

    #[test]
    fn ignored_input_keeps_round_open() {
        let config = RoundConfig::new(
            "swipe",
            Evaluator::Displacement {
                small_threshold_px: 80.0,
                big_threshold_px: 200.0,
                small_max_px: None,
                min_speed_px_per_s: None,
            },
        );
        let mut engine = engine(config);
        engine.start(0).unwrap();
        let events = engine.report_input(InputEvent::tap(Point::new(10.0, 10.0), 50));
        assert!(matches!(events[0], Event::InputIgnored { round: 1, .. }));
        assert_eq!(engine.phase(), Phase::AwaitingInput);
        assert_eq!(engine.state().rounds_resolved(), 0);
    }

    #[test]
    fn abort_mid_game_gives_partial_result() {
        let mut engine = engine(reaction(5));
        engine.start(0).unwrap();
        tap_target(&mut engine, 100);
        let events = engine.abort();
        let result = match events.last() {
            Some(Event::SessionEnded { result, .. }) => result.clone(),
            other => panic!("expected SessionEnded, got {other:?}"),
        };
        assert!(!result.completed);
        assert_eq!(result.successes, 1);
        assert_eq!(result.rounds_completed, 1);
        assert_eq!(engine.pending_timers(), 0);
        assert!(engine.abort().is_empty());
    }

    #[test]
    fn teardown_releases_everything() {
        let config = RoundConfig {
            countdown_interval_ms: Some(1_000),
            ..reaction(5)
        };
        let mut engine = engine(config);
        engine.start(0).unwrap();
        assert!(engine.pending_timers() > 0);
        engine.teardown();
        assert_eq!(engine.phase(), Phase::Ended);
        assert_eq!(engine.pending_timers(), 0);
        assert!(engine.targets().is_empty());
        assert!(engine.tick(60_000).is_empty());
    }

    #[test]
    fn countdown_ticks_report_remaining_time() {
        let config = RoundConfig {
            countdown_interval_ms: Some(1_000),
            ..reaction(1)
        };
        let mut engine = engine(config);
        engine.start(0).unwrap();
        let mut events = engine.tick(1_000);
        events.extend(engine.tick(2_000));
        let remaining: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::CountdownTick { remaining_ms, .. } => *remaining_ms,
                _ => None,
            })
            .collect();
        assert_eq!(remaining, vec![2_000, 1_000]);
    }

    #[test]
    fn last_round_ends_session() {
        let mut engine = engine(reaction(1));
        engine.start(0).unwrap();
        tap_target(&mut engine, 100);
        let events = engine.tick(600);
        assert_eq!(engine.phase(), Phase::Ended);
        assert!(matches!(events.last(), Some(Event::SessionEnded { .. })));
        let result = engine.result().unwrap();
        assert!(result.completed);
        assert_eq!(result.xp_awarded, 10);
    }
}
