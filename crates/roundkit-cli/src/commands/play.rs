//! `play`: run one full session against a scripted player.
//!
//! The clock is virtual: the loop advances it by `--step-ms` per
//! iteration and never sleeps, so a session finishes instantly.

use std::sync::Arc;

use clap::Args;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use roundkit_core::error::FeedbackError;
use roundkit_core::events::Event;
use roundkit_core::feedback::{CueKind, FeedbackSink};
use roundkit_core::input::{Evaluator, InputEvent};
use roundkit_core::report::{HttpStatsApi, SessionReporter, SessionResult};
use roundkit_core::round::{Phase, RoundConfig, RoundEngine};
use roundkit_core::target::{Direction, Point, SwipeBand, Target, TargetGenerator, Vector};
use roundkit_core::{Config, FeedbackCoordinator};

#[derive(Args)]
pub struct PlayArgs {
    /// Game id (see `games list`)
    game: String,
    /// Seed for target placement and the scripted player
    #[arg(long)]
    seed: Option<u64>,
    /// Probability that the scripted player answers a round correctly
    #[arg(long, default_value_t = 0.7)]
    hit_rate: f64,
    /// Virtual clock step in milliseconds
    #[arg(long, default_value_t = 50)]
    step_ms: u64,
    /// Print events and the result as JSON lines
    #[arg(long)]
    json: bool,
    /// Do not send the result to the stats API
    #[arg(long)]
    no_submit: bool,
}

pub async fn run(args: PlayArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&args.hit_rate) {
        return Err(format!("--hit-rate must be between 0 and 1, got {}", args.hit_rate).into());
    }
    if args.step_ms == 0 {
        return Err("--step-ms must be positive".into());
    }

    let config = Config::load()?;
    let game = config.game(&args.game)?.clone();

    let reporter = if args.no_submit {
        SessionReporter::new()
    } else {
        match HttpStatsApi::from_config(&config.stats_api)? {
            Some(api) => SessionReporter::with_api(Arc::new(api)),
            None => SessionReporter::new(),
        }
    };
    let sink = ConsoleFeedback { quiet: args.json };
    let feedback = FeedbackCoordinator::new(Box::new(sink), config.feedback.clone());

    let seed = args.seed.unwrap_or_else(rand::random);
    let mut engine = RoundEngine::new(game.clone(), feedback, reporter)?
        .with_generator(TargetGenerator::seeded(seed));
    let mut player = ScriptedPlayer::new(seed, args.hit_rate);
    debug!(game = %args.game, seed, hit_rate = args.hit_rate, "scripted session");

    let mut now = 0;
    print_events(&engine.start(now)?, args.json)?;
    while engine.phase() != Phase::Ended {
        now += args.step_ms;
        print_events(&engine.tick(now), args.json)?;
        if let Some(input) = player.act(&engine, &game, now) {
            print_events(&engine.report_input(input), args.json)?;
        }
    }

    if let Some(result) = engine.result() {
        print_result(result, args.json)?;
    }
    if let Some(submission) = engine.take_submission() {
        submission.await?;
    }
    Ok(())
}

fn print_events(events: &[Event], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    for event in events {
        if json {
            println!("{}", serde_json::to_string(event)?);
            continue;
        }
        match event {
            Event::GameStarted {
                game_id,
                total_rounds,
                session_id,
                ..
            } => println!("{game_id}: {total_rounds} rounds (session {session_id})"),
            Event::RoundArmed { round, targets, .. } => {
                let correct = targets.iter().find(|t| t.correct);
                match correct {
                    Some(t) => println!(
                        "round {round}: {} target(s), answer at ({:.0}, {:.0}){}",
                        targets.len(),
                        t.position.x,
                        t.position.y,
                        t.category
                            .as_deref()
                            .map(|c| format!(" [{c}]"))
                            .unwrap_or_default()
                    ),
                    None => println!("round {round}: {} target(s)", targets.len()),
                }
            }
            Event::RoundResolved {
                outcome,
                score,
                failures,
                ..
            } => println!(
                "  {:?} (score {score}, failures {failures})",
                outcome.reason
            ),
            Event::InputIgnored { .. } => println!("  input ignored"),
            Event::StaleInputDropped { .. } => println!("  stale input dropped"),
            _ => {}
        }
    }
    Ok(())
}

fn print_result(result: &SessionResult, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(result)?);
    } else {
        println!(
            "result: {}/{} correct, accuracy {}%, {} XP{}",
            result.successes,
            result.total_rounds,
            result.accuracy_percent(),
            result.xp_awarded,
            if result.completed { "" } else { " (aborted)" }
        );
    }
    Ok(())
}

/// Prints cues and phrases to stderr.
struct ConsoleFeedback {
    quiet: bool,
}

impl FeedbackSink for ConsoleFeedback {
    fn play_cue(&mut self, cue: CueKind) -> Result<(), FeedbackError> {
        if !self.quiet && !matches!(cue, CueKind::Countdown { .. }) {
            eprintln!("  [cue] {cue:?}");
        }
        Ok(())
    }

    fn speak(&mut self, text: &str, _rate: f32) -> Result<(), FeedbackError> {
        if !self.quiet {
            eprintln!("  [say] {text}");
        }
        Ok(())
    }

    fn stop_speech(&mut self) -> Result<(), FeedbackError> {
        Ok(())
    }
}

/// When and how the player will answer the current round.
struct Plan {
    round: u32,
    at_ms: u64,
    correct: bool,
}

/// Answers each round once, correctly with probability `hit_rate`.
struct ScriptedPlayer {
    rng: StdRng,
    hit_rate: f64,
    plan: Option<Plan>,
    answered: u32,
}

impl ScriptedPlayer {
    fn new(seed: u64, hit_rate: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed ^ 0x5eed),
            hit_rate,
            plan: None,
            answered: 0,
        }
    }

    fn act(&mut self, engine: &RoundEngine, game: &RoundConfig, now: u64) -> Option<InputEvent> {
        let round = engine.round();
        if !engine.phase().accepts_input() || self.answered >= round {
            return None;
        }
        let target = engine.targets().iter().find(|t| t.correct)?.clone();

        if self.plan.as_ref().map(|p| p.round) != Some(round) {
            let correct = self.rng.gen_bool(self.hit_rate);
            let at_ms = self.answer_time(game, &target, correct, now);
            self.plan = Some(Plan {
                round,
                at_ms,
                correct,
            });
        }
        let plan = self.plan.as_ref()?;
        if now < plan.at_ms {
            return None;
        }
        let correct = plan.correct;
        self.answered = round;

        let input = if game.evaluator.wants_gestures() {
            self.swipe(game, &target, engine.targets(), correct, now)
        } else {
            let point = if correct {
                target.position_at(now)
            } else {
                self.wrong_point(game, &target, engine.targets(), now)
            };
            InputEvent::tap(point, now)
        };
        Some(input.for_round(round))
    }

    fn answer_time(&mut self, game: &RoundConfig, target: &Target, correct: bool, now: u64) -> u64 {
        let timing = game.evaluator.leaves().into_iter().find_map(|e| match e {
            Evaluator::Timing {
                beat_interval_ms,
                tolerance_fraction,
            } => Some(*tolerance_fraction * *beat_interval_ms as f64),
            _ => None,
        });

        match (timing, target.due_at_ms) {
            (Some(tolerance), Some(due)) => {
                let offset = if correct {
                    self.rng.gen_range(-tolerance * 0.5..=tolerance * 0.5)
                } else if self.rng.gen_bool(0.5) {
                    tolerance * 1.5
                } else {
                    -tolerance * 1.5
                };
                ((due as f64 + offset).max(0.0) as u64).max(now + 1)
            }
            _ => now + self.rng.gen_range(250..900),
        }
    }

    /// A point no correct target covers: a distractor center if there is
    /// one, otherwise well clear of the answer.
    fn wrong_point(&mut self, game: &RoundConfig, target: &Target, targets: &[Target], now: u64) -> Point {
        if let Some(distractor) = targets.iter().find(|t| !t.correct) {
            return distractor.position_at(now);
        }
        let tolerance = game
            .evaluator
            .leaves()
            .into_iter()
            .find_map(|e| match e {
                Evaluator::Position { tolerance_px } => Some(*tolerance_px),
                _ => None,
            })
            .unwrap_or(0.0);
        let heading = self.rng.gen_range(0.0..std::f64::consts::TAU);
        let away = Vector::from_angle(heading, target.radius() + tolerance + 40.0);
        target.position_at(now).offset(away, 1.0)
    }

    fn swipe(
        &mut self,
        game: &RoundConfig,
        target: &Target,
        targets: &[Target],
        correct: bool,
        now: u64,
    ) -> InputEvent {
        let (small, big, small_max) = game
            .evaluator
            .leaves()
            .into_iter()
            .find_map(|e| match e {
                Evaluator::Displacement {
                    small_threshold_px,
                    big_threshold_px,
                    small_max_px,
                    ..
                } => Some((
                    *small_threshold_px,
                    *big_threshold_px,
                    small_max_px.unwrap_or((small_threshold_px + big_threshold_px) / 2.0),
                )),
                _ => None,
            })
            .unwrap_or((80.0, 200.0, 140.0));

        let requirement = target.swipe.unwrap_or_default();
        let band = requirement.band.unwrap_or(SwipeBand::Big);
        let direction = requirement.direction.unwrap_or(Direction::Right);

        let (band, direction) = if correct {
            (band, direction)
        } else if requirement.direction.is_some() && self.rng.gen_bool(0.5) {
            (band, opposite(direction))
        } else {
            let other = match band {
                SwipeBand::Small => SwipeBand::Big,
                SwipeBand::Big => SwipeBand::Small,
            };
            (other, direction)
        };

        let length = match band {
            SwipeBand::Small => (small + small_max) / 2.0,
            SwipeBand::Big => big * 1.2,
        };
        let unit = match direction {
            Direction::Up => Vector::new(0.0, -1.0),
            Direction::Down => Vector::new(0.0, 1.0),
            Direction::Left => Vector::new(-1.0, 0.0),
            Direction::Right => Vector::new(1.0, 0.0),
        };

        let began = now.saturating_sub(180);
        let start = if correct {
            target.position_at(began)
        } else {
            targets
                .iter()
                .find(|t| !t.correct)
                .unwrap_or(target)
                .position_at(began)
        };
        InputEvent::swipe(start, start.offset(unit, length), began, now)
    }
}

fn opposite(direction: Direction) -> Direction {
    match direction {
        Direction::Up => Direction::Down,
        Direction::Down => Direction::Up,
        Direction::Left => Direction::Right,
        Direction::Right => Direction::Left,
    }
}
