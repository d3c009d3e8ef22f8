use anyhow::{Context, Result, bail};
use ball_tracker::{Frame, FrameResult, PipelineConfig, PixelFormat, PointSink, VisionPipeline};
use clap::Parser;
use opencv::{
    core::{self, Mat, Scalar},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const BALL_RADIUS: i32 = 30;
const TRAIL_THICKNESS: i32 = 4;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "visual_tester",
    version,
    about = "Track a ball through a video and write an annotated copy"
)]
struct Cli {
    /// Input video path
    #[arg(short, long, conflicts_with = "camera", required_unless_present = "camera")]
    input: Option<PathBuf>,

    /// Capture from a camera device instead of a file
    #[arg(long)]
    camera: Option<i32>,

    /// Output video path
    #[arg(short, long, default_value = "tracked.mp4")]
    output: PathBuf,

    /// Pipeline config (YAML); defaults track a yellow-green tennis ball
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Stream overlay frames and the scoreboard to a browser at this address
    #[cfg(feature = "web")]
    #[arg(long)]
    serve: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("visual_tester=info,ball_tracker=info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let mut pipeline = VisionPipeline::new(config)?;

    // The scoreboard consumes points on the runtime, away from the capture loop.
    let (point_sink, points_rx) = PointSink::new();
    pipeline.add_sink(Box::new(point_sink));
    let scoreboard = tokio::spawn(scoreboard(points_rx));

    #[cfg(feature = "web")]
    let (publisher, server) = match &cli.serve {
        Some(addr) => {
            let (publisher, server) = web::start(addr.clone(), &mut pipeline).await?;
            (Some(publisher), Some(server))
        }
        None => (None, None),
    };
    #[cfg(not(feature = "web"))]
    let (publisher, server): (Option<NoPublisher>, Option<tokio::task::JoinHandle<()>>) =
        (None, None);

    let capture_cli = cli.clone();
    let summary =
        tokio::task::spawn_blocking(move || run_capture(&capture_cli, pipeline, publisher))
            .await
            .context("capture thread panicked")??;

    let announced = scoreboard.await.context("scoreboard task panicked")?;
    if let Some(server) = server {
        server.abort();
    }
    info!(
        announced,
        "Processing complete. Final score A {} - {} B over {} frames ({} with the ball). \
         Output saved to {}",
        summary.scores.score_a,
        summary.scores.score_b,
        summary.frames_processed,
        summary.detections,
        cli.output.display()
    );
    Ok(())
}

/// Logs every point as it is awarded. Ends when the pipeline is stopped and
/// returns how many points were announced.
async fn scoreboard(mut points: mpsc::UnboundedReceiver<FrameResult>) -> u32 {
    let mut announced = 0;
    while let Some(result) = points.recv().await {
        if let Some(side) = result.point_awarded {
            info!(?side, "point! A {} - {} B", result.score_a, result.score_b);
            announced += 1;
        }
    }
    announced
}

/// Something that wants each annotated frame after it is drawn.
trait FramePublisher: Send {
    fn publish(&self, frame: &Mat, timestamp: Duration);
}

#[cfg(not(feature = "web"))]
struct NoPublisher;

#[cfg(not(feature = "web"))]
impl FramePublisher for NoPublisher {
    fn publish(&self, _frame: &Mat, _timestamp: Duration) {}
}

fn open_capture(cli: &Cli) -> Result<VideoCapture> {
    let cap = match (&cli.input, cli.camera) {
        (Some(path), _) => {
            let path = path.to_str().context("input path is not valid UTF-8")?;
            VideoCapture::from_file(path, videoio::CAP_ANY)?
        }
        (None, Some(index)) => VideoCapture::new(index, videoio::CAP_ANY)?,
        (None, None) => bail!("either --input or --camera is required"),
    };
    if !cap.is_opened()? {
        bail!("could not open video source");
    }
    Ok(cap)
}

fn run_capture(
    cli: &Cli,
    mut pipeline: VisionPipeline,
    publisher: Option<impl FramePublisher>,
) -> Result<ball_tracker::MatchSummary> {
    // --- 1. Video I/O Initialization ---
    let mut cap = open_capture(cli)?;
    let frame_width = cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
    let frame_height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
    let fps = match cap.get(videoio::CAP_PROP_FPS)? {
        fps if fps > 0.0 => fps,
        _ => 30.0,
    };
    info!(frame_width, frame_height, fps, "video source opened");

    let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
    let output_path = cli.output.to_str().context("output path is not valid UTF-8")?;
    let mut writer = VideoWriter::new(
        output_path,
        fourcc,
        fps,
        core::Size::new(frame_width as i32, frame_height as i32),
        true,
    )?;

    // Live cameras report no position, so fall back to a wall clock.
    let started = Instant::now();
    let is_file = cli.input.is_some();

    // --- 2. Main Processing Loop ---
    let mut frame = Mat::default();
    let mut frames_read = 0u64;
    loop {
        if cli.max_frames.is_some_and(|max| frames_read >= max) {
            break;
        }
        match cap.read(&mut frame) {
            Ok(true) if !frame.empty() => {}
            Ok(_) => break,
            Err(e) => {
                error!("Error reading frame: {e:?}");
                break;
            }
        }
        frames_read += 1;

        let timestamp = if is_file {
            Duration::from_secs_f64(cap.get(videoio::CAP_PROP_POS_MSEC)?.max(0.0) / 1000.0)
        } else {
            started.elapsed()
        };

        // --- 3. Frame Conversion & Pipeline Processing ---
        // Convert the OpenCV Mat (BGR) to an RGBA buffer for our pipeline.
        let mut rgba_frame = Mat::default();
        imgproc::cvt_color(&frame, &mut rgba_frame, imgproc::COLOR_BGR2RGBA, 0)?;
        let tracker_frame = Frame::from_raw(
            rgba_frame.cols() as u32,
            rgba_frame.rows() as u32,
            PixelFormat::Rgba8,
            rgba_frame.data_bytes()?.to_vec(),
            timestamp,
        )?;
        let result = pipeline.analyze_frame(&tracker_frame);

        // --- 4. Visualization ---
        let mut output_frame = frame.clone();
        draw_overlay(&mut output_frame, &result)?;
        if let Some(publisher) = &publisher {
            publisher.publish(&output_frame, timestamp);
        }

        // --- 5. Write Output Frame ---
        writer.write(&output_frame)?;
    }

    if frames_read == 0 {
        warn!("video source produced no frames");
    }
    Ok(pipeline.stop())
}

/// Draws the trail, the ball marker and the speed/score labels.
fn draw_overlay(frame: &mut Mat, result: &FrameResult) -> opencv::Result<()> {
    let yellow = Scalar::new(0.0, 255.0, 255.0, 0.0);
    let white = Scalar::new(255.0, 255.0, 255.0, 0.0);
    let to_cv = |p: &ball_tracker::Point| core::Point::new(p.x.round() as i32, p.y.round() as i32);

    for pair in result.trail.windows(2) {
        imgproc::line(
            frame,
            to_cv(&pair[0]),
            to_cv(&pair[1]),
            yellow,
            TRAIL_THICKNESS,
            imgproc::LINE_AA,
            0,
        )?;
    }

    if let Some(position) = &result.position {
        imgproc::circle(frame, to_cv(position), BALL_RADIUS, yellow, -1, imgproc::LINE_AA, 0)?;
    }

    let labels = [
        format!("Speed: {:.0} px/s", result.speed),
        format!("Player A: {}   Player B: {}", result.score_a, result.score_b),
    ];
    for (row, label) in labels.iter().enumerate() {
        imgproc::put_text(
            frame,
            label,
            core::Point::new(16, 36 + row as i32 * 34),
            imgproc::FONT_HERSHEY_SIMPLEX,
            1.0,
            white,
            2,
            imgproc::LINE_AA,
            false,
        )?;
    }
    Ok(())
}

#[cfg(feature = "web")]
mod web {
    use super::FramePublisher;
    use anyhow::Result;
    use ball_tracker::VisionPipeline;
    use ball_tracker_visualizer::{
        BusSink, ControlHandle, FrameBus, ServerConfig, encode_jpeg, start_server,
    };
    use opencv::{core::Mat, imgproc, prelude::*};
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use tracing::warn;

    pub struct BusPublisher {
        bus: FrameBus,
        control: ControlHandle,
    }

    impl FramePublisher for BusPublisher {
        fn publish(&self, frame: &Mat, timestamp: Duration) {
            if self.bus.frames_tx.receiver_count() == 0 || !*self.control.play_tx.borrow() {
                return;
            }
            let mut rgb = Mat::default();
            let encoded = imgproc::cvt_color(frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
                .map_err(anyhow::Error::from)
                .and_then(|_| Ok(rgb.data_bytes()?.to_vec()))
                .and_then(|bytes| {
                    encode_jpeg(rgb.cols() as u32, rgb.rows() as u32, &bytes, timestamp)
                });
            match encoded {
                Ok(packet) => {
                    let _ = self.bus.frames_tx.send(packet);
                }
                Err(e) => warn!("failed to encode overlay frame: {e:#}"),
            }
        }
    }

    /// Starts the server and hooks the pipeline onto its bus. The returned
    /// handle owns the server task.
    pub async fn start(
        bind_addr: String,
        pipeline: &mut VisionPipeline,
    ) -> Result<(BusPublisher, JoinHandle<()>)> {
        let bus = FrameBus::new(2);
        let (play_tx, _play_rx) = tokio::sync::watch::channel(true);
        let control = ControlHandle { play_tx };
        pipeline.add_sink(Box::new(BusSink::new(bus.clone())));
        let cfg = ServerConfig { bind_addr };
        let server = start_server(bus.clone(), cfg, control.clone()).await?;
        Ok((BusPublisher { bus, control }, server))
    }
}
