// THEORY:
// The `ScoringStateMachine` infers point outcomes from sustained loss of the
// ball. It has two states, read straight off the shared `TrackState`:
//   Tracking: `last_position` is known, a rally is in progress.
//   Lost:     `last_position` is none, waiting for the ball to reappear.
// Tracking → Lost fires on a missed frame once the miss counter reaches the
// threshold. The side of the frame where the ball vanished failed to return it,
// so the point goes to the other side. Clearing `last_position` on firing is
// what limits each miss episode to a single point. Lost → Tracking happens in
// the tracker, on the next detection.

use crate::core_modules::centroid::Detection;
use crate::core_modules::tracker::TrackState;
use serde::{Deserialize, Serialize};
use tracing::info;

/// One of the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Plays from the left half of the frame.
    A,
    /// Plays from the right half of the frame.
    B,
}

impl Side {
    pub fn opponent(&self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    /// The side whose half contains `x`. The exact center belongs to B.
    pub fn of_half(x: f64, frame_width: u32) -> Side {
        if x < frame_width as f64 / 2.0 {
            Side::A
        } else {
            Side::B
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreState {
    pub score_a: u32,
    pub score_b: u32,
}

impl ScoreState {
    pub fn award(&mut self, side: Side) {
        match side {
            Side::A => self.score_a += 1,
            Side::B => self.score_b += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.score_a + self.score_b
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RallyState {
    Tracking,
    Lost,
}

impl RallyState {
    pub fn of(track: &TrackState) -> Self {
        if track.is_tracking() {
            RallyState::Tracking
        } else {
            RallyState::Lost
        }
    }
}

pub struct ScoringStateMachine {
    scores: ScoreState,
    miss_threshold: u32,
}

impl ScoringStateMachine {
    pub fn new(miss_threshold: u32) -> Self {
        Self {
            scores: ScoreState::default(),
            miss_threshold,
        }
    }

    /// Runs after the tracker has folded in this frame's detection.
    /// Returns the side awarded a point, if this frame ended a rally.
    pub fn evaluate(
        &mut self,
        detection: &Detection,
        track: &mut TrackState,
        frame_width: u32,
    ) -> Option<Side> {
        if !detection.is_miss() || track.consecutive_misses < self.miss_threshold {
            return None;
        }
        let last = track.clear_anchor()?;

        let winner = Side::of_half(last.x, frame_width).opponent();
        self.scores.award(winner);
        info!(
            winner = ?winner,
            last_x = last.x,
            misses = track.consecutive_misses,
            score_a = self.scores.score_a,
            score_b = self.scores.score_b,
            "point awarded"
        );
        Some(winner)
    }

    pub fn scores(&self) -> ScoreState {
        self.scores
    }
}
