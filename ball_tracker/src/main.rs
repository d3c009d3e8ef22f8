// Example runner for the `ball_tracker` library: plays a synthetic two-point
// rally through the pipeline and logs what it sees. Use `visual_tester` for
// real video.

use ball_tracker::synthetic::{ball_frame, court_frame};
use ball_tracker::{FrameResult, PipelineConfig, Point, VisionPipeline};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 180;
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

fn main() -> ball_tracker::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ball_tracker=info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let mut pipeline = VisionPipeline::new(config)?.with_sink(|result: &FrameResult| {
        if let Some(side) = result.point_awarded {
            info!(?side, "A {} - {} B", result.score_a, result.score_b);
        }
    });

    let mut timestamp = Duration::ZERO;
    let mut next_frame = |center: Option<Point>| {
        let frame = match center {
            Some(center) => ball_frame(WIDTH, HEIGHT, center, 6.0, timestamp),
            None => court_frame(WIDTH, HEIGHT, timestamp),
        };
        timestamp += FRAME_INTERVAL;
        frame
    };

    // Rally 1: left to right, then the ball vanishes on B's half.
    for step in 0..30 {
        let center = Point::new(
            20.0 + step as f64 * 9.0,
            90.0 - (step as f64 - 15.0).abs() * 3.0,
        );
        let result = pipeline.analyze_frame(&next_frame(Some(center)));
        if step % 10 == 9 {
            info!(speed_px_s = result.speed.round(), trail = result.trail.len(), "in play");
        }
    }
    for _ in 0..15 {
        pipeline.analyze_frame(&next_frame(None));
    }

    // Rally 2: right to left, then the ball vanishes on A's half.
    for step in 0..30 {
        let center = Point::new(300.0 - step as f64 * 9.0, 60.0 + step as f64);
        pipeline.analyze_frame(&next_frame(Some(center)));
    }
    for _ in 0..15 {
        pipeline.analyze_frame(&next_frame(None));
    }

    let summary = pipeline.stop();
    info!(
        "final score A {} - {} B over {} frames",
        summary.scores.score_a, summary.scores.score_b, summary.frames_processed
    );
    Ok(())
}
