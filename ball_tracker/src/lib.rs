// THEORY:
// This file is the entry point for the `ball_tracker` library crate. It exports
// the `VisionPipeline` session object and its data structures (`PipelineConfig`,
// `Frame`, `FrameResult`, ...) as the high-level interface, plus the
// `ResultSink` observer contract through which a presentation layer receives
// results.
//
// The per-frame algorithms live in `core_modules`:
//   color_segmenter → centroid → tracker → scoring
// Each is usable on its own, but callers normally go through the pipeline,
// which owns the session state and enforces the one-frame-at-a-time order.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod sink;
pub mod synthetic;

pub use config::PipelineConfig;
pub use error::{Result, TrackerError};
pub use pipeline::{Frame, FrameResult, MatchSummary, PixelFormat, Point, Side, VisionPipeline};
pub use sink::{ChannelSink, PointSink, ResultSink, WatchSink};
