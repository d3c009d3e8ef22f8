//! Procedurally drawn frames: a flat court with an optional ball disc.
//! Used by the demo runner and the tests.

use crate::core_modules::centroid::Point;
use crate::core_modules::frame::Frame;
use image::{Rgba, RgbaImage};
use std::time::Duration;

/// Optic yellow; hue 33 on the 8-bit axis.
pub const BALL_RGBA: [u8; 4] = [210, 230, 40, 255];
/// Hard-court blue; hue 106, well outside the default window.
pub const COURT_RGBA: [u8; 4] = [30, 90, 160, 255];

pub fn court_frame(width: u32, height: u32, timestamp: Duration) -> Frame {
    Frame::new(
        RgbaImage::from_pixel(width, height, Rgba(COURT_RGBA)),
        timestamp,
    )
}

/// Draws every pixel whose center lies within `radius` of `center`.
pub fn ball_frame(
    width: u32,
    height: u32,
    center: Point,
    radius: f64,
    timestamp: Duration,
) -> Frame {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        if Point::new(x as f64, y as f64).distance(&center) <= radius {
            Rgba(BALL_RGBA)
        } else {
            Rgba(COURT_RGBA)
        }
    });
    Frame::new(image, timestamp)
}
