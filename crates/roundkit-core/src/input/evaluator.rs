//! Input evaluation strategies.
//!
//! An [`Evaluator`] turns one [`InputEvent`] and the live targets of a
//! round into an [`Outcome`]. Evaluation is pure and synchronous.

use serde::{Deserialize, Serialize};

use super::event::InputEvent;
use crate::error::ConfigError;
use crate::target::{SwipeBand, Target, TargetId};

/// Why an input was (or was not) a hit. Feedback differs per reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeReason {
    Hit,
    /// Wrong target or wrong place.
    Miss,
    Early,
    Late,
    /// Gesture too small, too slow, or between the swipe bands.
    Ambiguous,
    /// No input before the response deadline.
    Timeout,
    /// The input does not apply to this game (a tap in a swipe game).
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// The correct target that was hit, if any.
    pub hit: Option<Target>,
    /// The target the input was judged against, hit or not.
    pub addressed: Option<TargetId>,
    pub reason: OutcomeReason,
}

impl Outcome {
    pub fn hit(target: &Target) -> Self {
        Self {
            hit: Some(target.clone()),
            addressed: Some(target.id),
            reason: OutcomeReason::Hit,
        }
    }

    pub fn failed(reason: OutcomeReason, addressed: Option<TargetId>) -> Self {
        Self {
            hit: None,
            addressed,
            reason,
        }
    }

    pub fn miss(addressed: Option<TargetId>) -> Self {
        Self::failed(OutcomeReason::Miss, addressed)
    }

    pub fn timeout() -> Self {
        Self::failed(OutcomeReason::Timeout, None)
    }

    pub fn ignored() -> Self {
        Self::failed(OutcomeReason::Ignored, None)
    }

    pub fn is_hit(&self) -> bool {
        self.reason == OutcomeReason::Hit
    }

    /// Everything except `Ignored` resolves the round.
    pub fn consumes_round(&self) -> bool {
        self.reason != OutcomeReason::Ignored
    }
}

/// Hit-test strategy, selected per game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evaluator {
    /// Distance from the input point to a target center must not exceed
    /// the target radius plus `tolerance_px`.
    Position { tolerance_px: f64 },
    /// Input instant within `tolerance_fraction * beat_interval_ms` of the
    /// target's due time.
    Timing {
        beat_interval_ms: u64,
        tolerance_fraction: f64,
    },
    /// Swipe/drag magnitude bands and direction.
    Displacement {
        small_threshold_px: f64,
        big_threshold_px: f64,
        /// Upper bound of the small band. Defaults to the midpoint of the
        /// two thresholds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        small_max_px: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_speed_px_per_s: Option<f64>,
    },
    /// Every part must pass, in order. No partial credit.
    Composite { parts: Vec<Evaluator> },
}

impl Evaluator {
    /// Judge `event` against the live `targets`.
    pub fn evaluate(&self, event: &InputEvent, targets: &[Target]) -> Outcome {
        let candidates: Vec<&Target> = targets.iter().collect();
        self.judge(event, &candidates)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Evaluator::Position { .. } => "position",
            Evaluator::Timing { .. } => "timing",
            Evaluator::Displacement { .. } => "displacement",
            Evaluator::Composite { .. } => "composite",
        }
    }

    /// Every non-composite part, depth first.
    pub fn leaves(&self) -> Vec<&Evaluator> {
        match self {
            Evaluator::Composite { parts } => parts.iter().flat_map(Evaluator::leaves).collect(),
            other => vec![other],
        }
    }

    /// Beat interval of the timing part, if there is one.
    pub fn beat_interval_ms(&self) -> Option<u64> {
        match self {
            Evaluator::Timing {
                beat_interval_ms, ..
            } => Some(*beat_interval_ms),
            Evaluator::Composite { parts } => parts.iter().find_map(Evaluator::beat_interval_ms),
            _ => None,
        }
    }

    /// Whether any part accepts swipe/drag gestures.
    pub fn wants_gestures(&self) -> bool {
        match self {
            Evaluator::Displacement { .. } => true,
            Evaluator::Composite { parts } => parts.iter().any(Evaluator::wants_gestures),
            _ => false,
        }
    }

    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for out-of-range thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: format!("evaluator.{key}"),
            message: message.to_string(),
        };

        match self {
            Evaluator::Position { tolerance_px } => {
                if !tolerance_px.is_finite() || *tolerance_px < 0.0 {
                    return Err(invalid("tolerance_px", "must be a finite value >= 0"));
                }
            }
            Evaluator::Timing {
                beat_interval_ms,
                tolerance_fraction,
            } => {
                if *beat_interval_ms == 0 {
                    return Err(invalid("beat_interval_ms", "must be positive"));
                }
                if !(*tolerance_fraction > 0.0 && *tolerance_fraction <= 1.0) {
                    return Err(invalid("tolerance_fraction", "must be in (0, 1]"));
                }
            }
            Evaluator::Displacement {
                small_threshold_px,
                big_threshold_px,
                min_speed_px_per_s,
                ..
            } => {
                if !(*small_threshold_px > 0.0 && small_threshold_px < big_threshold_px) {
                    return Err(invalid(
                        "small_threshold_px",
                        "need 0 < small_threshold_px < big_threshold_px",
                    ));
                }
                let small_max = self.small_max_px().unwrap_or(*big_threshold_px);
                if small_max <= *small_threshold_px || small_max > *big_threshold_px {
                    return Err(invalid(
                        "small_max_px",
                        "must lie in (small_threshold_px, big_threshold_px]",
                    ));
                }
                if min_speed_px_per_s.is_some_and(|s| s < 0.0) {
                    return Err(invalid("min_speed_px_per_s", "must not be negative"));
                }
            }
            Evaluator::Composite { parts } => {
                if parts.is_empty() {
                    return Err(invalid("parts", "must not be empty"));
                }
                for part in parts {
                    part.validate()?;
                }
            }
        }
        Ok(())
    }

    fn small_max_px(&self) -> Option<f64> {
        match self {
            Evaluator::Displacement {
                small_threshold_px,
                big_threshold_px,
                small_max_px,
                ..
            } => Some(small_max_px.unwrap_or((small_threshold_px + big_threshold_px) / 2.0)),
            _ => None,
        }
    }

    fn judge(&self, event: &InputEvent, candidates: &[&Target]) -> Outcome {
        match self {
            Evaluator::Position { tolerance_px } => judge_position(event, candidates, *tolerance_px),
            Evaluator::Timing {
                beat_interval_ms,
                tolerance_fraction,
            } => {
                let Some(target) = candidates.iter().find(|t| t.correct && t.due_at_ms.is_some())
                else {
                    return Outcome::ignored();
                };
                let due = target.due_at_ms.unwrap_or_default();
                let tolerance = *tolerance_fraction * *beat_interval_ms as f64;
                let offset = event.timestamp_ms() as f64 - due as f64;
                if offset.abs() <= tolerance {
                    Outcome::hit(target)
                } else if offset < 0.0 {
                    Outcome::failed(OutcomeReason::Early, Some(target.id))
                } else {
                    Outcome::failed(OutcomeReason::Late, Some(target.id))
                }
            }
            Evaluator::Displacement {
                small_threshold_px,
                big_threshold_px,
                min_speed_px_per_s,
                ..
            } => {
                if !event.is_gesture() {
                    return Outcome::ignored();
                }
                let Some(target) = candidates.iter().find(|t| t.correct) else {
                    return Outcome::ignored();
                };
                let ambiguous = Outcome::failed(OutcomeReason::Ambiguous, Some(target.id));

                if let Some(min_speed) = min_speed_px_per_s {
                    if event.speed_px_per_s().unwrap_or(f64::INFINITY) < *min_speed {
                        return ambiguous;
                    }
                }

                let magnitude = event.displacement().magnitude();
                let small_max = self.small_max_px().unwrap_or(*big_threshold_px);
                let band = if magnitude >= *big_threshold_px {
                    SwipeBand::Big
                } else if magnitude >= *small_threshold_px && magnitude < small_max {
                    SwipeBand::Small
                } else {
                    return ambiguous;
                };

                let requirement = target.swipe.unwrap_or_default();
                if requirement.band.is_some_and(|b| b != band) {
                    return Outcome::miss(Some(target.id));
                }
                if let Some(direction) = requirement.direction {
                    if event.displacement().dominant_direction() != Some(direction) {
                        return Outcome::miss(Some(target.id));
                    }
                }
                Outcome::hit(target)
            }
            Evaluator::Composite { parts } => {
                let mut current: Vec<&Target> = candidates.to_vec();
                let mut last = Outcome::ignored();
                for part in parts {
                    let outcome = part.judge(event, &current);
                    if !outcome.is_hit() {
                        return outcome;
                    }
                    if let Some(id) = outcome.addressed {
                        current.retain(|t| t.id == id);
                    }
                    last = outcome;
                }
                last
            }
        }
    }
}

fn judge_position(event: &InputEvent, candidates: &[&Target], tolerance_px: f64) -> Outcome {
    let point = event.hit_point();
    let at_ms = event.timestamp_ms();

    // Nearest center among the targets in range; ties keep the first.
    let nearest = candidates
        .iter()
        .map(|t| (*t, t.position_at(at_ms).distance_to(point)))
        .filter(|(t, d)| *d <= t.radius() + tolerance_px)
        .min_by(|a, b| a.1.total_cmp(&b.1));

    match nearest {
        Some((target, _)) if target.correct => Outcome::hit(target),
        Some((target, _)) => Outcome::miss(Some(target.id)),
        None => Outcome::miss(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{Direction, Point, SwipeRequirement};

    fn target(id: u64, x: f64, y: f64, correct: bool) -> Target {
        Target {
            id: TargetId(id),
            round: 1,
            position: Point::new(x, y),
            size: 0.0,
            category: None,
            correct,
            kinematics: None,
            due_at_ms: None,
            swipe: None,
            spawned_at_ms: 0,
        }
    }

    fn swipe_by(dx: f64, dy: f64) -> InputEvent {
        InputEvent::swipe(Point::new(100.0, 100.0), Point::new(100.0 + dx, 100.0 + dy), 0, 200)
    }

    fn displacement() -> Evaluator {
        Evaluator::Displacement {
            small_threshold_px: 80.0,
            big_threshold_px: 200.0,
            small_max_px: None,
            min_speed_px_per_s: None,
        }
    }

    #[test]
    fn position_hit_within_tolerance() {
        let eval = Evaluator::Position { tolerance_px: 50.0 };
        let targets = [target(1, 200.0, 300.0, true)];
        let outcome = eval.evaluate(&InputEvent::tap(Point::new(210.0, 305.0), 0), &targets);
        assert!(outcome.is_hit());
        assert_eq!(outcome.hit.unwrap().id, TargetId(1));
    }

    #[test]
    fn position_miss_far_away() {
        let eval = Evaluator::Position { tolerance_px: 50.0 };
        let targets = [target(1, 50.0, 50.0, true)];
        let outcome = eval.evaluate(&InputEvent::tap(Point::new(500.0, 500.0), 0), &targets);
        assert_eq!(outcome, Outcome::miss(None));
    }

    #[test]
    fn tolerance_adds_to_radius() {
        let eval = Evaluator::Position { tolerance_px: 10.0 };
        let mut t = target(1, 0.0, 0.0, true);
        t.size = 40.0;
        let targets = [t];
        assert!(eval.evaluate(&InputEvent::tap(Point::new(30.0, 0.0), 0), &targets).is_hit());
        assert!(!eval.evaluate(&InputEvent::tap(Point::new(30.5, 0.0), 0), &targets).is_hit());
    }

    #[test]
    fn overlapping_regions_nearest_center_wins() {
        let eval = Evaluator::Position { tolerance_px: 50.0 };
        let targets = [target(1, 100.0, 100.0, false), target(2, 140.0, 100.0, true)];
        let near_second = eval.evaluate(&InputEvent::tap(Point::new(125.0, 100.0), 0), &targets);
        assert!(near_second.is_hit());

        let near_first = eval.evaluate(&InputEvent::tap(Point::new(110.0, 100.0), 0), &targets);
        assert_eq!(near_first.reason, OutcomeReason::Miss);
        assert_eq!(near_first.addressed, Some(TargetId(1)));
    }

    #[test]
    fn moving_target_is_tested_where_it_is_at_input_time() {
        let eval = Evaluator::Position { tolerance_px: 5.0 };
        let mut t = target(1, 100.0, 100.0, true);
        t.kinematics = Some(crate::target::Kinematics {
            velocity: crate::target::Vector::new(100.0, 0.0),
            min: Point::new(0.0, 0.0),
            max: Point::new(1_000.0, 1_000.0),
        });
        let targets = [t];
        assert!(eval.evaluate(&InputEvent::tap(Point::new(200.0, 100.0), 1_000), &targets).is_hit());
        assert!(!eval.evaluate(&InputEvent::tap(Point::new(100.0, 100.0), 1_000), &targets).is_hit());
    }

    #[test]
    fn timing_early_on_time_late() {
        let eval = Evaluator::Timing {
            beat_interval_ms: 1_000,
            tolerance_fraction: 0.3,
        };
        let mut t = target(1, 0.0, 0.0, true);
        t.due_at_ms = Some(5_000);
        let targets = [t];
        let at = |ms| InputEvent::tap(Point::default(), ms);

        assert!(eval.evaluate(&at(5_250), &targets).is_hit());
        assert!(eval.evaluate(&at(4_700), &targets).is_hit());
        assert_eq!(eval.evaluate(&at(5_350), &targets).reason, OutcomeReason::Late);
        assert_eq!(eval.evaluate(&at(4_650), &targets).reason, OutcomeReason::Early);
    }

    #[test]
    fn timing_without_due_time_is_ignored() {
        let eval = Evaluator::Timing {
            beat_interval_ms: 1_000,
            tolerance_fraction: 0.3,
        };
        let targets = [target(1, 0.0, 0.0, true)];
        let outcome = eval.evaluate(&InputEvent::tap(Point::default(), 10), &targets);
        assert_eq!(outcome.reason, OutcomeReason::Ignored);
        assert!(!outcome.consumes_round());
    }

    #[test]
    fn displacement_bands() {
        let eval = displacement();
        let mut t = target(1, 0.0, 0.0, true);
        t.swipe = Some(SwipeRequirement {
            band: Some(SwipeBand::Small),
            direction: None,
        });
        let targets = [t];

        assert!(eval.evaluate(&swipe_by(90.0, 0.0), &targets).is_hit());
        assert_eq!(
            eval.evaluate(&swipe_by(150.0, 0.0), &targets).reason,
            OutcomeReason::Ambiguous
        );
        assert_eq!(
            eval.evaluate(&swipe_by(40.0, 0.0), &targets).reason,
            OutcomeReason::Ambiguous
        );
        assert_eq!(eval.evaluate(&swipe_by(250.0, 0.0), &targets).reason, OutcomeReason::Miss);
    }

    #[test]
    fn displacement_direction_must_match() {
        let eval = displacement();
        let mut t = target(1, 0.0, 0.0, true);
        t.swipe = Some(SwipeRequirement {
            band: Some(SwipeBand::Big),
            direction: Some(Direction::Up),
        });
        let targets = [t];
        assert!(eval.evaluate(&swipe_by(0.0, -220.0), &targets).is_hit());
        assert_eq!(eval.evaluate(&swipe_by(0.0, 220.0), &targets).reason, OutcomeReason::Miss);
    }

    #[test]
    fn displacement_ignores_taps_and_slow_gestures() {
        let mut eval = displacement();
        let targets = [target(1, 0.0, 0.0, true)];
        assert_eq!(
            eval.evaluate(&InputEvent::tap(Point::default(), 0), &targets).reason,
            OutcomeReason::Ignored
        );

        if let Evaluator::Displacement {
            min_speed_px_per_s, ..
        } = &mut eval
        {
            *min_speed_px_per_s = Some(1_000.0);
        }
        // 90 px in 200 ms = 450 px/s.
        assert_eq!(
            eval.evaluate(&swipe_by(90.0, 0.0), &targets).reason,
            OutcomeReason::Ambiguous
        );
    }

    #[test]
    fn instant_gesture_is_fast_enough() {
        let eval = Evaluator::Displacement {
            small_threshold_px: 80.0,
            big_threshold_px: 200.0,
            small_max_px: None,
            min_speed_px_per_s: Some(100.0),
        };
        let targets = [target(1, 0.0, 0.0, true)];
        let instant = InputEvent::swipe(Point::new(100.0, 100.0), Point::new(400.0, 100.0), 500, 500);
        assert!(eval.evaluate(&instant, &targets).is_hit());
    }

    #[test]
    fn composite_requires_every_part() {
        let eval = Evaluator::Composite {
            parts: vec![
                Evaluator::Position { tolerance_px: 20.0 },
                Evaluator::Timing {
                    beat_interval_ms: 1_000,
                    tolerance_fraction: 0.2,
                },
            ],
        };
        let mut t = target(1, 100.0, 100.0, true);
        t.due_at_ms = Some(2_000);
        let targets = [t];

        let good = InputEvent::tap(Point::new(105.0, 100.0), 2_100);
        assert!(eval.evaluate(&good, &targets).is_hit());

        let right_place_wrong_time = InputEvent::tap(Point::new(105.0, 100.0), 2_500);
        assert_eq!(
            eval.evaluate(&right_place_wrong_time, &targets).reason,
            OutcomeReason::Late
        );

        let wrong_place_right_time = InputEvent::tap(Point::new(300.0, 100.0), 2_000);
        assert_eq!(
            eval.evaluate(&wrong_place_right_time, &targets).reason,
            OutcomeReason::Miss
        );
    }

    #[test]
    fn composite_narrows_to_the_addressed_target() {
        let eval = Evaluator::Composite {
            parts: vec![Evaluator::Position { tolerance_px: 20.0 }, displacement()],
        };
        let targets = [target(1, 100.0, 100.0, true), target(2, 400.0, 400.0, false)];
        let outcome = eval.evaluate(&swipe_by(90.0, 0.0), &targets);
        assert!(outcome.is_hit());
        assert_eq!(outcome.addressed, Some(TargetId(1)));
    }

    #[test]
    fn validation_rejects_bad_thresholds() {
        assert!(Evaluator::Position { tolerance_px: -1.0 }.validate().is_err());
        assert!(Evaluator::Timing {
            beat_interval_ms: 0,
            tolerance_fraction: 0.3
        }
        .validate()
        .is_err());
        assert!(Evaluator::Displacement {
            small_threshold_px: 200.0,
            big_threshold_px: 80.0,
            small_max_px: None,
            min_speed_px_per_s: None,
        }
        .validate()
        .is_err());
        assert!(Evaluator::Composite { parts: vec![] }.validate().is_err());
        assert!(displacement().validate().is_ok());
    }

    #[test]
    fn beat_interval_found_inside_composite() {
        let eval = Evaluator::Composite {
            parts: vec![
                Evaluator::Position { tolerance_px: 1.0 },
                Evaluator::Timing {
                    beat_interval_ms: 750,
                    tolerance_fraction: 0.25,
                },
            ],
        };
        assert_eq!(eval.beat_interval_ms(), Some(750));
        assert!(!eval.wants_gestures());
    }
}
