use crate::core_modules::frame::PixelFormat;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a session or its inputs.
///
/// Per-frame analysis never fails: an undetectable ball, a degenerate frame or
/// a clock that runs backwards are all reported as data in the `FrameResult`.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "frame buffer holds {actual} bytes but a {width}x{height} {format:?} frame needs {expected}"
    )]
    FrameBufferSize {
        width: u32,
        height: u32,
        format: PixelFormat,
        expected: usize,
        actual: usize,
    },

    #[error("failed to read config file {}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse pipeline config")]
    ConfigParse(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
