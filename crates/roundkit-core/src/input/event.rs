use serde::{Deserialize, Serialize};

use crate::target::{Point, Vector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Tap,
    Swipe,
    DragRelease,
}

/// One captured interaction, produced by the presentation layer and
/// consumed once by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub kind: InputKind,
    pub start: Point,
    pub end: Point,
    pub start_ms: u64,
    pub end_ms: u64,
    /// Intermediate drag samples, start and end included when present.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Point>,
    /// Round the UI was showing when the event was captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
}

impl InputEvent {
    pub fn tap(at: Point, at_ms: u64) -> Self {
        Self {
            kind: InputKind::Tap,
            start: at,
            end: at,
            start_ms: at_ms,
            end_ms: at_ms,
            path: Vec::new(),
            round: None,
        }
    }

    pub fn swipe(start: Point, end: Point, start_ms: u64, end_ms: u64) -> Self {
        Self {
            kind: InputKind::Swipe,
            start,
            end,
            start_ms,
            end_ms: end_ms.max(start_ms),
            path: Vec::new(),
            round: None,
        }
    }

    /// A drag that ended at the last point of `path`.
    ///
    /// An empty path is treated as a release at the origin.
    pub fn drag_release(path: Vec<Point>, start_ms: u64, end_ms: u64) -> Self {
        let start = path.first().copied().unwrap_or_default();
        let end = path.last().copied().unwrap_or(start);
        Self {
            kind: InputKind::DragRelease,
            start,
            end,
            start_ms,
            end_ms: end_ms.max(start_ms),
            path,
            round: None,
        }
    }

    /// Stamp the round the UI was showing.
    pub fn for_round(mut self, round: u32) -> Self {
        self.round = Some(round);
        self
    }

    /// Point used for position hit tests: where a tap landed, where a
    /// swipe started, where a drag was released.
    pub fn hit_point(&self) -> Point {
        match self.kind {
            InputKind::Tap => self.start,
            InputKind::Swipe => self.start,
            InputKind::DragRelease => self.end,
        }
    }

    /// Instant used for timing hit tests.
    pub fn timestamp_ms(&self) -> u64 {
        match self.kind {
            InputKind::Tap | InputKind::Swipe => self.start_ms,
            InputKind::DragRelease => self.end_ms,
        }
    }

    /// Net displacement from first to last point.
    pub fn displacement(&self) -> Vector {
        self.start.vector_to(self.end)
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Average speed in pixels per second, `None` for instantaneous events.
    pub fn speed_px_per_s(&self) -> Option<f64> {
        let ms = self.duration_ms();
        (ms > 0).then(|| self.displacement().magnitude() * 1000.0 / ms as f64)
    }

    pub fn is_gesture(&self) -> bool {
        matches!(self.kind, InputKind::Swipe | InputKind::DragRelease)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_has_no_displacement() {
        let tap = InputEvent::tap(Point::new(3.0, 4.0), 10);
        assert_eq!(tap.displacement().magnitude(), 0.0);
        assert_eq!(tap.speed_px_per_s(), None);
        assert!(!tap.is_gesture());
    }

    #[test]
    fn swipe_speed_and_hit_point() {
        let swipe = InputEvent::swipe(Point::new(0.0, 0.0), Point::new(300.0, 400.0), 0, 250);
        assert_eq!(swipe.displacement().magnitude(), 500.0);
        assert_eq!(swipe.speed_px_per_s(), Some(2_000.0));
        assert_eq!(swipe.hit_point(), Point::new(0.0, 0.0));
    }

    #[test]
    fn drag_release_uses_last_path_point() {
        let drag = InputEvent::drag_release(
            vec![Point::new(1.0, 1.0), Point::new(5.0, 1.0), Point::new(9.0, 2.0)],
            100,
            400,
        );
        assert_eq!(drag.hit_point(), Point::new(9.0, 2.0));
        assert_eq!(drag.timestamp_ms(), 400);
        assert_eq!(drag.displacement(), Vector::new(8.0, 1.0));
    }

    #[test]
    fn swipe_end_never_precedes_start() {
        let swipe = InputEvent::swipe(Point::default(), Point::new(1.0, 0.0), 500, 100);
        assert_eq!(swipe.duration_ms(), 0);
    }
}
