// THEORY:
// The `pipeline` module is the top-level API for the tracker. A `VisionPipeline`
// is one session: it is created once when the camera starts, it owns the only
// `TrackState` and `ScoreState` for that session, and it is consumed by `stop`.
//
// Each call to `analyze_frame` runs the four stages to completion on the
// caller's thread:
//   segmentation → centroid → tracking → scoring
// and then notifies every registered sink. `analyze_frame` takes `&mut self`,
// so two frames can never be analyzed at once.

use crate::config::PipelineConfig;
use crate::core_modules::centroid;
use crate::core_modules::color_segmenter::color_segmenter;
use crate::core_modules::scoring::ScoringStateMachine;
use crate::core_modules::tracker::TrajectoryTracker;
use crate::error::Result;
use crate::sink::ResultSink;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, trace};

// Re-export key data structures for the public API.
pub use crate::core_modules::centroid::{Detection, Moments, Point};
pub use crate::core_modules::color_segmenter::{HsvRange, Mask};
pub use crate::core_modules::frame::{Frame, PixelFormat};
pub use crate::core_modules::scoring::{RallyState, ScoreState, Side};
pub use crate::core_modules::tracker::TrackState;

/// Everything the presentation layer needs for one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FrameResult {
    pub timestamp: Duration,
    /// This frame's detection. `None` on a miss.
    pub position: Option<Point>,
    /// Recent detections, oldest first.
    pub trail: Vec<Point>,
    /// Pixels per second. Zero on a miss.
    pub speed: f64,
    pub score_a: u32,
    pub score_b: u32,
    pub consecutive_misses: u32,
    /// Set on the frame that ended a rally.
    pub point_awarded: Option<Side>,
}

impl FrameResult {
    pub fn scores(&self) -> ScoreState {
        ScoreState {
            score_a: self.score_a,
            score_b: self.score_b,
        }
    }
}

/// What a session amounted to, returned by `VisionPipeline::stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MatchSummary {
    pub scores: ScoreState,
    pub frames_processed: u64,
    pub detections: u64,
}

/// The main, top-level struct for the tracker.
pub struct VisionPipeline {
    config: PipelineConfig,
    tracker: TrajectoryTracker,
    scorer: ScoringStateMachine,
    sinks: Vec<Box<dyn ResultSink>>,
    frames_processed: u64,
    detections: u64,
}

impl VisionPipeline {
    /// Starts a session.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        info!(
            hue = ?(config.color.hue_min, config.color.hue_max),
            trail_capacity = config.trail_capacity,
            miss_threshold = config.miss_threshold,
            min_area = config.min_area,
            "tracking session started"
        );
        Ok(Self {
            tracker: TrajectoryTracker::new(config.trail_capacity),
            scorer: ScoringStateMachine::new(config.miss_threshold),
            config,
            sinks: Vec::new(),
            frames_processed: 0,
            detections: 0,
        })
    }

    pub fn with_sink(mut self, sink: impl ResultSink + 'static) -> Self {
        self.add_sink(Box::new(sink));
        self
    }

    pub fn add_sink(&mut self, sink: Box<dyn ResultSink>) {
        self.sinks.push(sink);
    }

    /// Segmentation and centroid estimation only. Does not touch session state.
    pub fn detect(&self, frame: &Frame) -> Detection {
        if frame.is_degenerate() {
            trace!(width = frame.width(), height = frame.height(), "degenerate frame");
            return Detection::Miss;
        }
        let mask = color_segmenter::segment(frame, &self.config.color);
        centroid::estimate(&mask, self.config.min_area)
    }

    pub fn analyze_frame(&mut self, frame: &Frame) -> FrameResult {
        let now = frame.timestamp();

        // Stage 1 + 2: Segmentation and Centroid
        let detection = self.detect(frame);

        // Stage 3: Trajectory
        let update = self.tracker.observe(detection, now);

        // Stage 4: Scoring
        let point_awarded = self
            .scorer
            .evaluate(&detection, self.tracker.state_mut(), frame.width());

        self.frames_processed += 1;
        if !detection.is_miss() {
            self.detections += 1;
        }

        let scores = self.scorer.scores();
        let result = FrameResult {
            timestamp: now,
            position: update.position,
            trail: self.tracker.trail(),
            speed: update.speed,
            score_a: scores.score_a,
            score_b: scores.score_b,
            consecutive_misses: self.tracker.state().consecutive_misses,
            point_awarded,
        };
        trace!(
            frame = self.frames_processed,
            position = ?result.position,
            speed = result.speed,
            "frame analyzed"
        );

        for sink in &self.sinks {
            sink.notify(&result);
        }
        result
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn track_state(&self) -> &TrackState {
        self.tracker.state()
    }

    pub fn rally_state(&self) -> RallyState {
        RallyState::of(self.tracker.state())
    }

    pub fn scores(&self) -> ScoreState {
        self.scorer.scores()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Ends the session. Sinks are dropped, which closes their channels.
    pub fn stop(self) -> MatchSummary {
        let summary = MatchSummary {
            scores: self.scorer.scores(),
            frames_processed: self.frames_processed,
            detections: self.detections,
        };
        info!(
            score_a = summary.scores.score_a,
            score_b = summary.scores.score_b,
            frames = summary.frames_processed,
            detections = summary.detections,
            "tracking session stopped"
        );
        summary
    }
}
