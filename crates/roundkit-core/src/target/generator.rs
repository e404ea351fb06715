//! Target generation.
//!
//! Positions are drawn uniformly inside the playfield shrunk by half a
//! target on every side, so no target clips the screen edge. Multi-target
//! layouts use bounded rejection sampling for separation; when the budget
//! runs out the newest sample is kept, since an overlap is better than a
//! round that never starts.
//!
//! A round's targets are built into a local vector and returned whole.
//! Target ids are only consumed when the full set succeeds.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use super::model::{Kinematics, Point, SwipeRequirement, Target, TargetId, Vector};
use crate::error::GenerationError;
use crate::round::{RoundConfig, TargetLayout};

#[derive(Debug, Clone)]
pub struct TargetGenerator {
    rng: Pcg64,
    next_id: u64,
}

impl Default for TargetGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetGenerator {
    /// Generator seeded from the thread RNG.
    pub fn new() -> Self {
        Self::seeded(rand::random())
    }

    /// Deterministic generator for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Pcg64::seed_from_u64(seed),
            next_id: 1,
        }
    }

    /// Produce the full target set for `round`.
    ///
    /// `previous` is the set from the round before (empty for round 1).
    ///
    /// # Errors
    ///
    /// Fails when the layout cannot be satisfied at all; the caller must
    /// not start the round in that case.
    pub fn next(
        &mut self,
        config: &RoundConfig,
        previous: &[Target],
        round: u32,
        now_ms: u64,
    ) -> Result<Vec<Target>, GenerationError> {
        let size = config.target_size;
        let field = config.playfield;
        if !field.fits(size) {
            return Err(GenerationError::PlayfieldTooSmall {
                size,
                width: field.width,
                height: field.height,
            });
        }

        let r = size / 2.0;
        let min = Point::new(r, r);
        let max = Point::new(field.width - r, field.height - r);

        // (category, correct) per slot, correct first.
        let slots: Vec<(Option<String>, bool)> = match &config.layout {
            TargetLayout::Single => vec![(None, true)],
            TargetLayout::Distractors { count, .. } => {
                if *count == 0 {
                    return Err(GenerationError::NoTargets);
                }
                (0..*count).map(|i| (None, i == 0)).collect()
            }
            TargetLayout::Matching {
                categories,
                distractors,
                avoid_repeat_correct,
                ..
            } => self.matching_slots(categories, *distractors, *avoid_repeat_correct, previous)?,
        };

        let (min_separation, max_attempts) = match &config.layout {
            TargetLayout::Single => (0.0, 1),
            TargetLayout::Distractors {
                min_separation,
                max_attempts,
                ..
            }
            | TargetLayout::Matching {
                min_separation,
                max_attempts,
                ..
            } => (*min_separation, (*max_attempts).max(1)),
        };

        let positions = self.separated_positions(slots.len(), min, max, min_separation, max_attempts);

        let due_at_ms = config
            .evaluator
            .beat_interval_ms()
            .map(|beat| now_ms + config.ready_delay_ms + beat);

        let mut next_id = self.next_id;
        let mut targets = Vec::with_capacity(slots.len());
        for ((category, correct), position) in slots.into_iter().zip(positions) {
            let kinematics = config.motion.map(|motion| {
                let speed = if motion.max_speed > motion.min_speed {
                    self.rng.gen_range(motion.min_speed..=motion.max_speed)
                } else {
                    motion.min_speed
                };
                let heading = self.rng.gen_range(0.0..std::f64::consts::TAU);
                Kinematics {
                    velocity: Vector::from_angle(heading, speed),
                    min,
                    max,
                }
            });

            let swipe = match (&config.swipe, correct) {
                (Some(rule), true) => Some(SwipeRequirement {
                    band: rule.bands.choose(&mut self.rng).copied(),
                    direction: rule.directions.choose(&mut self.rng).copied(),
                }),
                _ => None,
            };

            targets.push(Target {
                id: TargetId(next_id),
                round,
                position,
                size,
                category,
                correct,
                kinematics,
                due_at_ms: if correct { due_at_ms } else { None },
                swipe,
                spawned_at_ms: now_ms,
            });
            next_id += 1;
        }

        self.next_id = next_id;
        Ok(targets)
    }

    fn matching_slots(
        &mut self,
        categories: &[String],
        distractors: usize,
        avoid_repeat_correct: bool,
        previous: &[Target],
    ) -> Result<Vec<(Option<String>, bool)>, GenerationError> {
        if categories.is_empty() {
            return Err(GenerationError::NoCategories);
        }

        let last_correct = previous
            .iter()
            .find(|t| t.correct)
            .and_then(|t| t.category.as_deref());

        let eligible: Vec<&String> = categories
            .iter()
            .filter(|c| !(avoid_repeat_correct && Some(c.as_str()) == last_correct))
            .collect();
        // With a single category there is nothing else to pick.
        let pool = if eligible.is_empty() {
            categories.iter().collect()
        } else {
            eligible
        };
        let correct = pool
            .choose(&mut self.rng)
            .map(|c| (*c).clone())
            .ok_or(GenerationError::NoCategories)?;

        let complement: Vec<&String> = categories.iter().filter(|c| **c != correct).collect();

        if distractors > 0 && complement.is_empty() {
            return Err(GenerationError::NoDistractorCategory(correct));
        }

        let mut slots = vec![(Some(correct), true)];
        if complement.len() >= distractors {
            slots.extend(
                complement
                    .choose_multiple(&mut self.rng, distractors)
                    .map(|c| (Some((*c).clone()), false)),
            );
        } else {
            for _ in 0..distractors {
                if let Some(c) = complement.choose(&mut self.rng) {
                    slots.push((Some((*c).clone()), false));
                }
            }
        }
        Ok(slots)
    }

    fn separated_positions(
        &mut self,
        count: usize,
        min: Point,
        max: Point,
        min_separation: f64,
        max_attempts: u32,
    ) -> Vec<Point> {
        let mut placed: Vec<Point> = Vec::with_capacity(count);
        for _ in 0..count {
            let mut candidate = self.sample(min, max);
            let mut attempts = 1;
            while !clear_of(&placed, candidate, min_separation) {
                if attempts >= max_attempts {
                    tracing::debug!(
                        attempts,
                        placed = placed.len(),
                        "separation budget exhausted, accepting overlapping target"
                    );
                    break;
                }
                candidate = self.sample(min, max);
                attempts += 1;
            }
            placed.push(candidate);
        }
        placed
    }

    fn sample(&mut self, min: Point, max: Point) -> Point {
        Point::new(
            sample_axis(&mut self.rng, min.x, max.x),
            sample_axis(&mut self.rng, min.y, max.y),
        )
    }
}

fn sample_axis(rng: &mut Pcg64, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

fn clear_of(placed: &[Point], candidate: Point, min_separation: f64) -> bool {
    placed
        .iter()
        .all(|p| p.distance_to(candidate) > min_separation)
}
