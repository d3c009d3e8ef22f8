// Serves the visualizer with a looping synthetic rally so the browser client
// can be checked without a camera or video file.

use std::time::Duration;

use ball_tracker::synthetic::{ball_frame, court_frame};
use ball_tracker::{PipelineConfig, Point, VisionPipeline};
use ball_tracker_visualizer::{
    BusSink, ControlHandle, FrameBus, ServerConfig, encode_jpeg, start_server,
};
use image::DynamicImage;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 360;
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("ball_tracker=info,ball_tracker_visualizer=info")
            }),
        )
        .init();

    // Bind address from env or default
    let bind = std::env::var("BT_BIND").unwrap_or_else(|_| "127.0.0.1:3001".to_string());

    let bus = FrameBus::new(2);
    let (play_tx, mut play_rx) = tokio::sync::watch::channel(false);
    let control = ControlHandle { play_tx };
    let handle = start_server(bus.clone(), ServerConfig { bind_addr: bind }, control).await?;

    let mut pipeline =
        VisionPipeline::new(PipelineConfig::default())?.with_sink(BusSink::new(bus.clone()));
    let mut ticker = tokio::time::interval(FRAME_INTERVAL);
    let mut timestamp = Duration::ZERO;
    let mut step: u64 = 0;

    info!("press Play in the browser to start the rally loop");
    loop {
        if !*play_rx.borrow() {
            if play_rx.changed().await.is_err() {
                break;
            }
            continue;
        }
        ticker.tick().await;

        // 40 frames crossing the court, then 15 empty frames to end the rally.
        let phase = step % 55;
        let frame = if phase < 40 {
            let t = phase as f64 / 39.0;
            let leftward = (step / 55) % 2 == 1;
            let progress = if leftward { 1.0 - t } else { t };
            let x = 40.0 + progress * (WIDTH as f64 - 80.0);
            let y = HEIGHT as f64 * (0.3 + 0.4 * (t * std::f64::consts::PI).sin());
            ball_frame(WIDTH, HEIGHT, Point::new(x, y), 10.0, timestamp)
        } else {
            court_frame(WIDTH, HEIGHT, timestamp)
        };

        let result = pipeline.analyze_frame(&frame);
        if let Some(side) = result.point_awarded {
            info!(?side, "A {} - {} B", result.score_a, result.score_b);
        }

        if bus.frames_tx.receiver_count() > 0 {
            let rgb = DynamicImage::ImageRgba8(frame.image().clone()).to_rgb8();
            let packet = encode_jpeg(WIDTH, HEIGHT, rgb.as_raw(), timestamp)?;
            if bus.frames_tx.send(packet).is_err() {
                debug!("frame dropped, no subscribers");
            }
        }

        timestamp += FRAME_INTERVAL;
        step += 1;
    }

    handle.abort();
    Ok(())
}
