//! Geometry and target value types.
//!
//! Screen coordinates: origin top-left, `y` grows downwards.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Vector from `self` to `other`.
    pub fn vector_to(&self, other: Point) -> Vector {
        Vector::new(other.x - self.x, other.y - self.y)
    }

    pub fn offset(&self, v: Vector, scale: f64) -> Point {
        Point::new(self.x + v.dx * scale, self.y + v.dy * scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
}

impl Vector {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn from_angle(radians: f64, length: f64) -> Self {
        Self::new(radians.cos() * length, radians.sin() * length)
    }

    pub fn magnitude(&self) -> f64 {
        self.dx.hypot(self.dy)
    }

    /// Direction along the dominant axis, `None` for a zero vector.
    /// Exact diagonals resolve to the horizontal axis.
    pub fn dominant_direction(&self) -> Option<Direction> {
        if self.dx == 0.0 && self.dy == 0.0 {
            return None;
        }
        if self.dx.abs() >= self.dy.abs() {
            Some(if self.dx > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            })
        } else {
            Some(if self.dy > 0.0 {
                Direction::Down
            } else {
                Direction::Up
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Swipe magnitude class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeBand {
    Small,
    Big,
}

/// What a swipe/drag must look like to hit this target.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SwipeRequirement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<SwipeBand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

/// Playable area in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Playfield {
    pub width: f64,
    pub height: f64,
}

impl Playfield {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether a target of the given diameter fits without clipping.
    pub fn fits(&self, size: f64) -> bool {
        size >= 0.0 && size <= self.width && size <= self.height
    }
}

impl Default for Playfield {
    fn default() -> Self {
        Self::new(400.0, 700.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u64);

/// Motion of a moving target. The target bounces inside `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    /// Pixels per second.
    pub velocity: Vector,
    pub min: Point,
    pub max: Point,
}

impl Kinematics {
    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }
}

/// One on-screen object of a round.
///
/// Targets are values: the next round gets a fresh set rather than a
/// mutated one. `round` records which round generated the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub round: u32,
    /// Center at `spawned_at_ms`.
    pub position: Point,
    /// Diameter in pixels.
    pub size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kinematics: Option<Kinematics>,
    /// Ideal input instant for timing games.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swipe: Option<SwipeRequirement>,
    pub spawned_at_ms: u64,
}

impl Target {
    pub fn radius(&self) -> f64 {
        self.size / 2.0
    }

    /// Center of the target at time `at_ms`.
    pub fn position_at(&self, at_ms: u64) -> Point {
        let Some(k) = self.kinematics else {
            return self.position;
        };
        let secs = at_ms.saturating_sub(self.spawned_at_ms) as f64 / 1000.0;
        let raw = self.position.offset(k.velocity, secs);
        Point::new(
            bounce(raw.x, k.min.x, k.max.x),
            bounce(raw.y, k.min.y, k.max.y),
        )
    }
}

/// Fold `v` into `[lo, hi]` as if it reflected off both walls.
fn bounce(v: f64, lo: f64, hi: f64) -> f64 {
    let span = hi - lo;
    if span <= 0.0 {
        return lo;
    }
    let m = (v - lo).rem_euclid(2.0 * span);
    if m <= span {
        lo + m
    } else {
        lo + 2.0 * span - m
    }
}
