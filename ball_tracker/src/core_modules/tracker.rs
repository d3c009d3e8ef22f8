// THEORY:
// The `tracker` module adds memory to the pipeline. The segmenter and the
// centroid estimator see one frame at a time; the `TrajectoryTracker` carries a
// `TrackState` from frame to frame so the system knows where the ball was last
// seen, when, and how long it has been missing.
//
// Key principles:
// 1.  **Explicit State Record**: everything that persists lives in `TrackState`.
//     The scoring machine reads and updates the same record instead of keeping
//     its own copy of the last position.
// 2.  **Instantaneous Speed**: speed is the straight-line distance between two
//     consecutive detections divided by the time between them. There is no
//     smoothing, and a miss reports zero.
// 3.  **Bounded Trail**: the trail is a FIFO of recent detections for display.
//     It never influences speed or scoring.

use crate::core_modules::centroid::{Detection, Point};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, trace};

/// State that persists across frames for the whole session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackState {
    /// Where the ball was last detected. `None` before the first detection and
    /// after a point has been scored.
    pub last_position: Option<Point>,
    /// Capture time of the last detection.
    pub last_timestamp: Duration,
    /// Frames since the last detection. Zero while the ball is visible.
    pub consecutive_misses: u32,
    /// Recent detections, oldest first.
    pub trail: VecDeque<Point>,
}

impl TrackState {
    fn with_capacity(trail_capacity: usize) -> Self {
        Self {
            last_position: None,
            last_timestamp: Duration::ZERO,
            consecutive_misses: 0,
            trail: VecDeque::with_capacity(trail_capacity),
        }
    }

    /// True while there is an anchor position to score against.
    pub fn is_tracking(&self) -> bool {
        self.last_position.is_some()
    }

    /// Drops the anchor position, ending the current episode. The trail and the
    /// miss counter are untouched.
    pub fn clear_anchor(&mut self) -> Option<Point> {
        self.last_position.take()
    }
}

/// What the tracker reports for a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackUpdate {
    /// This frame's detection, if any.
    pub position: Option<Point>,
    /// Pixels per second since the previous detection.
    pub speed: f64,
}

pub struct TrajectoryTracker {
    state: TrackState,
    trail_capacity: usize,
}

impl TrajectoryTracker {
    pub fn new(trail_capacity: usize) -> Self {
        Self {
            state: TrackState::with_capacity(trail_capacity),
            trail_capacity,
        }
    }

    /// Folds one frame's detection into the track.
    pub fn observe(&mut self, detection: Detection, now: Duration) -> TrackUpdate {
        match detection {
            Detection::Ball(point) => {
                let speed = match self.state.last_position {
                    Some(previous) => self.speed_since(previous, point, now),
                    None => {
                        debug!(x = point.x, y = point.y, "ball acquired");
                        0.0
                    }
                };

                self.state.trail.push_back(point);
                while self.state.trail.len() > self.trail_capacity {
                    self.state.trail.pop_front();
                }
                self.state.last_position = Some(point);
                self.state.last_timestamp = now;
                self.state.consecutive_misses = 0;

                TrackUpdate {
                    position: Some(point),
                    speed,
                }
            }
            Detection::Miss => {
                self.state.consecutive_misses = self.state.consecutive_misses.saturating_add(1);
                trace!(misses = self.state.consecutive_misses, "no detection");
                TrackUpdate {
                    position: None,
                    speed: 0.0,
                }
            }
        }
    }

    fn speed_since(&self, previous: Point, current: Point, now: Duration) -> f64 {
        match now.checked_sub(self.state.last_timestamp) {
            Some(elapsed) if !elapsed.is_zero() => {
                current.distance(&previous) / elapsed.as_secs_f64()
            }
            Some(_) => 0.0,
            None => {
                debug!(
                    now_ms = now.as_millis() as u64,
                    last_ms = self.state.last_timestamp.as_millis() as u64,
                    "timestamp went backwards, reporting zero speed"
                );
                0.0
            }
        }
    }

    pub fn state(&self) -> &TrackState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut TrackState {
        &mut self.state
    }

    pub fn trail(&self) -> Vec<Point> {
        self.state.trail.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn ball(x: f64, y: f64) -> Detection {
        Detection::Ball(Point::new(x, y))
    }

    #[test]
    fn first_detection_has_zero_speed() {
        let mut tracker = TrajectoryTracker::new(20);
        let update = tracker.observe(ball(10.0, 10.0), ms(100));
        assert_eq!(update.speed, 0.0);
        assert_eq!(update.position, Some(Point::new(10.0, 10.0)));
        assert_eq!(tracker.state().last_timestamp, ms(100));
    }

    #[test]
    fn speed_is_distance_over_elapsed_seconds() {
        let mut tracker = TrajectoryTracker::new(20);
        tracker.observe(ball(0.0, 0.0), ms(0));
        let update = tracker.observe(ball(30.0, 40.0), ms(100));
        assert_relative_eq!(update.speed, 500.0, max_relative = 1e-12);
    }

    #[test]
    fn identical_timestamps_report_zero_speed() {
        let mut tracker = TrajectoryTracker::new(20);
        tracker.observe(ball(0.0, 0.0), ms(40));
        let update = tracker.observe(ball(100.0, 0.0), ms(40));
        assert_eq!(update.speed, 0.0);
    }

    #[test]
    fn backwards_clock_reports_zero_speed() {
        let mut tracker = TrajectoryTracker::new(20);
        tracker.observe(ball(0.0, 0.0), ms(500));
        let update = tracker.observe(ball(50.0, 0.0), ms(200));
        assert_eq!(update.speed, 0.0);
        assert_eq!(tracker.state().last_timestamp, ms(200));
    }

    #[test]
    fn large_gap_is_tolerated() {
        let mut tracker = TrajectoryTracker::new(20);
        tracker.observe(ball(0.0, 0.0), ms(0));
        let update = tracker.observe(ball(10.0, 0.0), Duration::from_secs(3600));
        assert_relative_eq!(update.speed, 10.0 / 3600.0);
    }

    #[test]
    fn miss_forces_zero_speed_and_keeps_anchor() {
        let mut tracker = TrajectoryTracker::new(20);
        tracker.observe(ball(0.0, 0.0), ms(0));
        tracker.observe(ball(10.0, 0.0), ms(10));
        let update = tracker.observe(Detection::Miss, ms(20));
        assert_eq!(update, TrackUpdate { position: None, speed: 0.0 });
        assert_eq!(tracker.state().last_position, Some(Point::new(10.0, 0.0)));
        assert_eq!(tracker.state().trail.len(), 2);
    }

    #[test]
    fn miss_counter_increments_and_resets() {
        let mut tracker = TrajectoryTracker::new(20);
        tracker.observe(ball(1.0, 1.0), ms(0));
        for expected in 1..=25 {
            tracker.observe(Detection::Miss, ms(expected as u64 * 33));
            assert_eq!(tracker.state().consecutive_misses, expected);
        }
        tracker.observe(ball(2.0, 2.0), ms(1000));
        assert_eq!(tracker.state().consecutive_misses, 0);
    }

    #[test]
    fn trail_keeps_most_recent_points_in_order() {
        let mut tracker = TrajectoryTracker::new(20);
        for i in 0..27 {
            tracker.observe(ball(i as f64, 0.0), ms(i * 10));
        }
        let trail = tracker.trail();
        assert_eq!(trail.len(), 20);
        let xs: Vec<f64> = trail.iter().map(|p| p.x).collect();
        let expected: Vec<f64> = (7..27).map(|i| i as f64).collect();
        assert_eq!(xs, expected);
    }

    #[test]
    fn cleared_anchor_restarts_speed_from_zero() {
        let mut tracker = TrajectoryTracker::new(20);
        tracker.observe(ball(0.0, 0.0), ms(0));
        assert!(tracker.state_mut().clear_anchor().is_some());
        assert!(!tracker.state().is_tracking());
        let update = tracker.observe(ball(500.0, 0.0), ms(10));
        assert_eq!(update.speed, 0.0);
        assert_eq!(tracker.state().trail.len(), 2);
    }
}
