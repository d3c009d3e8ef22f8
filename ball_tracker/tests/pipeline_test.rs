use approx::assert_relative_eq;
use ball_tracker::pipeline::{RallyState, ScoreState};
use ball_tracker::synthetic::{ball_frame, court_frame};
use ball_tracker::{
    ChannelSink, Frame, FrameResult, PipelineConfig, PixelFormat, Point, PointSink, Side,
    VisionPipeline, WatchSink,
};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const WIDTH: u32 = 100;
const HEIGHT: u32 = 60;

fn at(frame: u64) -> Duration {
    Duration::from_millis(frame * 40)
}

fn pipeline() -> VisionPipeline {
    VisionPipeline::new(PipelineConfig::default()).unwrap()
}

#[test]
fn test_rally_then_point_for_b() {
    let mut pipeline = pipeline();

    // Frame 0-1: ball moves 10 px right in 40 ms.
    let first =
        pipeline.analyze_frame(&ball_frame(WIDTH, HEIGHT, Point::new(20.0, 30.0), 4.0, at(0)));
    assert_eq!(first.position, Some(Point::new(20.0, 30.0)));
    assert_eq!(first.speed, 0.0);

    let second =
        pipeline.analyze_frame(&ball_frame(WIDTH, HEIGHT, Point::new(30.0, 30.0), 4.0, at(1)));
    assert_relative_eq!(second.speed, 250.0, max_relative = 1e-9);
    assert_eq!(second.trail, vec![Point::new(20.0, 30.0), Point::new(30.0, 30.0)]);
    assert_eq!(pipeline.rally_state(), RallyState::Tracking);

    // Ball vanishes at x = 30, left of center.
    let mut results = Vec::new();
    for frame in 2..=12 {
        results.push(pipeline.analyze_frame(&court_frame(WIDTH, HEIGHT, at(frame))));
    }
    let (before, last) = results.split_at(10);
    assert!(before.iter().all(|r| r.point_awarded.is_none() && r.score_b == 0));
    assert!(before.iter().all(|r| r.speed == 0.0 && r.position.is_none()));
    assert_eq!(last[0].point_awarded, Some(Side::B));
    assert_eq!(last[0].scores(), ScoreState { score_a: 0, score_b: 1 });
    assert_eq!(last[0].consecutive_misses, 11);
    assert_eq!(pipeline.rally_state(), RallyState::Lost);

    // The trail is display-only and survives the point.
    assert_eq!(last[0].trail.len(), 2);

    // A 12th miss does not score again.
    let twelfth = pipeline.analyze_frame(&court_frame(WIDTH, HEIGHT, at(13)));
    assert_eq!(twelfth.point_awarded, None);
    assert_eq!(twelfth.scores(), ScoreState { score_a: 0, score_b: 1 });
    assert_eq!(twelfth.consecutive_misses, 12);

    // Ball reappears: tracking resumes with a fresh speed baseline.
    let back =
        pipeline.analyze_frame(&ball_frame(WIDTH, HEIGHT, Point::new(70.0, 20.0), 4.0, at(14)));
    assert_eq!(back.consecutive_misses, 0);
    assert_eq!(back.speed, 0.0);
    assert_eq!(pipeline.rally_state(), RallyState::Tracking);
}

#[test]
fn test_center_line_goes_to_a() {
    let mut pipeline = pipeline();
    pipeline.analyze_frame(&ball_frame(WIDTH, HEIGHT, Point::new(50.0, 30.0), 3.0, at(0)));
    let awarded: Vec<Side> = (1..=40)
        .filter_map(|frame| {
            pipeline
                .analyze_frame(&court_frame(WIDTH, HEIGHT, at(frame)))
                .point_awarded
        })
        .collect();
    assert_eq!(awarded, vec![Side::A]);
    assert_eq!(pipeline.scores(), ScoreState { score_a: 1, score_b: 0 });
}

#[test]
fn test_short_dropouts_do_not_score() {
    let mut pipeline = pipeline();
    let mut frame = 0;
    for _ in 0..5 {
        pipeline.analyze_frame(&ball_frame(
            WIDTH,
            HEIGHT,
            Point::new(80.0, 30.0),
            3.0,
            at(frame),
        ));
        frame += 1;
        for _ in 0..10 {
            let result = pipeline.analyze_frame(&court_frame(WIDTH, HEIGHT, at(frame)));
            assert!(result.point_awarded.is_none());
            frame += 1;
        }
    }
    assert_eq!(pipeline.scores(), ScoreState::default());
}

#[test]
fn test_trail_is_bounded_fifo() {
    let mut pipeline = pipeline();
    let mut last = FrameResult::default();
    for i in 0..35u64 {
        let center = Point::new(5.0 + i as f64 * 2.0, 30.0);
        last = pipeline.analyze_frame(&ball_frame(WIDTH, HEIGHT, center, 2.0, at(i)));
    }
    assert_eq!(last.trail.len(), 20);
    let expected: Vec<Point> = (15..35u64)
        .map(|i| Point::new(5.0 + i as f64 * 2.0, 30.0))
        .collect();
    assert_eq!(last.trail, expected);
}

#[test]
fn test_same_timestamp_speed_is_zero() {
    let mut pipeline = pipeline();
    pipeline.analyze_frame(&ball_frame(WIDTH, HEIGHT, Point::new(10.0, 10.0), 2.0, at(3)));
    let result =
        pipeline.analyze_frame(&ball_frame(WIDTH, HEIGHT, Point::new(60.0, 40.0), 2.0, at(3)));
    assert_eq!(result.speed, 0.0);
    assert!(result.speed.is_finite());
}

#[test]
fn test_custom_config_changes_thresholds() {
    let config =
        PipelineConfig::from_yaml_str("miss_threshold: 3\ntrail_capacity: 4\nmin_area: 10\n")
            .unwrap();
    let mut pipeline = VisionPipeline::new(config).unwrap();

    // Radius 1 disc has 5 pixels, below min_area.
    let tiny =
        pipeline.analyze_frame(&ball_frame(WIDTH, HEIGHT, Point::new(10.0, 10.0), 1.0, at(0)));
    assert_eq!(tiny.position, None);

    for i in 1..=6u64 {
        let center = Point::new(90.0, 10.0 + i as f64);
        pipeline.analyze_frame(&ball_frame(WIDTH, HEIGHT, center, 3.0, at(i)));
    }
    assert_eq!(pipeline.track_state().trail.len(), 4);

    let awarded: Vec<Option<Side>> = (7..=9u64)
        .map(|i| pipeline.analyze_frame(&court_frame(WIDTH, HEIGHT, at(i))).point_awarded)
        .collect();
    assert_eq!(awarded, vec![None, None, Some(Side::A)]);
}

#[test]
fn test_raw_bgra_capture_is_tracked() {
    // 4x4 capture, single yellow pixel at (2, 1), delivered as BGRA.
    let mut data = Vec::new();
    for y in 0..4 {
        for x in 0..4 {
            if (x, y) == (2, 1) {
                data.extend_from_slice(&[40, 230, 210, 255]);
            } else {
                data.extend_from_slice(&[160, 90, 30, 255]);
            }
        }
    }
    let frame = Frame::from_raw(4, 4, PixelFormat::Bgra8, data, at(0)).unwrap();
    let result = pipeline().analyze_frame(&frame);
    assert_eq!(result.position, Some(Point::new(2.0, 1.0)));
}

#[test]
fn test_sinks_receive_every_frame() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::clone(&seen);
    let (watch_sink, watch_rx) = WatchSink::new();
    let (channel_sink, mut channel_rx) = ChannelSink::new(64);
    let dropped = channel_sink.dropped_counter();

    let mut pipeline = pipeline()
        .with_sink(move |r: &FrameResult| store.lock().unwrap().push(r.position))
        .with_sink(watch_sink)
        .with_sink(channel_sink);

    pipeline.analyze_frame(&ball_frame(WIDTH, HEIGHT, Point::new(40.0, 20.0), 3.0, at(0)));
    pipeline.analyze_frame(&court_frame(WIDTH, HEIGHT, at(1)));

    assert_eq!(*seen.lock().unwrap(), vec![Some(Point::new(40.0, 20.0)), None]);
    let latest = watch_rx.borrow().clone().unwrap();
    assert_eq!(latest.timestamp, at(1));
    assert_eq!(channel_rx.try_recv().unwrap().timestamp, at(0));
    assert_eq!(channel_rx.try_recv().unwrap().timestamp, at(1));

    let summary = pipeline.stop();
    assert_eq!(summary.frames_processed, 2);
    // Stopping drops the sinks and closes the channel.
    assert!(channel_rx.try_recv().is_err());
    assert_eq!(dropped.load(Ordering::Relaxed), 0);
}

#[test]
fn test_point_announcement_outlives_later_frames() {
    let (watch_sink, watch_rx) = WatchSink::new();
    let (point_sink, mut points_rx) = PointSink::new();
    let mut pipeline = pipeline().with_sink(watch_sink).with_sink(point_sink);

    pipeline.analyze_frame(&ball_frame(WIDTH, HEIGHT, Point::new(30.0, 30.0), 3.0, at(0)));
    // Eleven misses score for B; the later misses overwrite the latest result.
    for frame in 1..=13 {
        pipeline.analyze_frame(&court_frame(WIDTH, HEIGHT, at(frame)));
    }

    let latest = watch_rx.borrow().clone().unwrap();
    assert_eq!(latest.point_awarded, None);
    assert_eq!(latest.score_b, 1);

    let point = points_rx.try_recv().unwrap();
    assert_eq!(point.point_awarded, Some(Side::B));
    assert_eq!(point.timestamp, at(11));
    assert_eq!(point.scores(), ScoreState { score_a: 0, score_b: 1 });
    assert!(points_rx.try_recv().is_err());
}
