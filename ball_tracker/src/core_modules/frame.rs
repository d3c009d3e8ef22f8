// THEORY:
// A `Frame` is one captured image plus the moment it was captured. It is the
// only input the pipeline accepts. Capture APIs hand out bytes in different
// channel orders, so the constructors normalize everything to RGBA once, at the
// boundary, and every later stage can assume a single layout.

use crate::core_modules::pixel::pixel::Pixel;
use crate::error::{Result, TrackerError};
use image::RgbaImage;
use std::time::Duration;

/// Byte layout of a raw capture buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
    Bgra8,
    Rgb8,
}

impl PixelFormat {
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// An immutable captured frame.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbaImage,
    /// Monotonic capture time, measured from the start of the stream.
    timestamp: Duration,
}

impl Frame {
    pub fn new(image: RgbaImage, timestamp: Duration) -> Self {
        Self { image, timestamp }
    }

    /// Builds a frame from a raw capture buffer, converting it to RGBA.
    pub fn from_raw(
        width: u32,
        height: u32,
        format: PixelFormat,
        mut data: Vec<u8>,
        timestamp: Duration,
    ) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(format.channels()))
            .unwrap_or(usize::MAX);
        let size_error = |actual: usize| TrackerError::FrameBufferSize {
            width,
            height,
            format,
            expected,
            actual,
        };
        if data.len() != expected {
            return Err(size_error(data.len()));
        }

        let rgba = match format {
            PixelFormat::Rgba8 => data,
            PixelFormat::Bgra8 => {
                for bgra in data.chunks_exact_mut(4) {
                    bgra.swap(0, 2);
                }
                data
            }
            PixelFormat::Rgb8 => {
                let mut rgba = Vec::with_capacity(expected / 3 * 4);
                for rgb in data.chunks_exact(3) {
                    rgba.extend_from_slice(&[rgb[0], rgb[1], rgb[2], u8::MAX]);
                }
                rgba
            }
        };

        let actual = rgba.len();
        let image = RgbaImage::from_raw(width, height, rgba).ok_or_else(|| size_error(actual))?;
        Ok(Self::new(image, timestamp))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// True when the frame has no pixels at all.
    pub fn is_degenerate(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Panics when `(x, y)` is out of bounds, like `ImageBuffer::get_pixel`.
    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        Pixel::from(*self.image.get_pixel(x, y))
    }
}
