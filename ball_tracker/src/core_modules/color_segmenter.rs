// THEORY:
// The `ColorSegmenter` is the first stage of the per-frame pipeline. It turns a
// color frame into a binary `Mask` of ball-candidate pixels by converting every
// pixel to HSV and testing it against a calibrated `HsvRange`.
//
// It is a stateless utility: `segment` is a pure function of the frame and the
// range, with no memory of previous frames. Two calls with the same input
// always produce the same mask.

use crate::core_modules::frame::Frame;
use crate::core_modules::pixel::pixel::Hsv8;
use crate::error::{Result, TrackerError};
use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

/// Mask intensity of a foreground pixel.
pub const FOREGROUND: u8 = u8::MAX;
/// Mask intensity of a background pixel.
pub const BACKGROUND: u8 = 0;

/// Largest hue on the 8-bit axis.
pub const MAX_HUE_8BIT: u8 = 179;

/// Inclusive HSV bounds on the 8-bit scale (hue 0..=179, S and V 0..=255).
///
/// When `hue_min > hue_max` the hue range wraps through 0, which is how a red
/// ball is described.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HsvRange {
    pub hue_min: u8,
    pub hue_max: u8,
    pub saturation_min: u8,
    pub saturation_max: u8,
    pub value_min: u8,
    pub value_max: u8,
}

impl Default for HsvRange {
    /// Yellow-green tennis ball.
    fn default() -> Self {
        Self {
            hue_min: 20,
            hue_max: 40,
            saturation_min: 50,
            saturation_max: u8::MAX,
            value_min: 50,
            value_max: u8::MAX,
        }
    }
}

impl HsvRange {
    pub fn contains(&self, hsv: Hsv8) -> bool {
        let hue_matches = if self.hue_min <= self.hue_max {
            (self.hue_min..=self.hue_max).contains(&hsv.hue)
        } else {
            hsv.hue >= self.hue_min || hsv.hue <= self.hue_max
        };
        hue_matches
            && (self.saturation_min..=self.saturation_max).contains(&hsv.saturation)
            && (self.value_min..=self.value_max).contains(&hsv.value)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hue_min > MAX_HUE_8BIT || self.hue_max > MAX_HUE_8BIT {
            return Err(TrackerError::InvalidConfig(format!(
                "hue bounds {}..={} exceed {MAX_HUE_8BIT}",
                self.hue_min, self.hue_max
            )));
        }
        if self.saturation_min > self.saturation_max {
            return Err(TrackerError::InvalidConfig(format!(
                "saturation_min {} is above saturation_max {}",
                self.saturation_min, self.saturation_max
            )));
        }
        if self.value_min > self.value_max {
            return Err(TrackerError::InvalidConfig(format!(
                "value_min {} is above value_max {}",
                self.value_min, self.value_max
            )));
        }
        Ok(())
    }
}

/// Binary image marking ball-candidate pixels. Same dimensions as its frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    image: GrayImage,
}

impl Mask {
    /// Wraps a grayscale image; any non-zero intensity counts as foreground.
    pub fn from_image(image: GrayImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Iterates the coordinates of every foreground pixel in row-major order.
    pub fn foreground_pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.image
            .enumerate_pixels()
            .filter(|(_, _, luma)| luma.0[0] != BACKGROUND)
            .map(|(x, y, _)| (x, y))
    }
}

pub mod color_segmenter {
    use super::*;

    /// Thresholds a frame into a ball-candidate mask.
    /// A zero-width or zero-height frame yields an equally empty mask.
    pub fn segment(frame: &Frame, range: &HsvRange) -> Mask {
        let image = GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
            let hsv = frame.pixel(x, y).to_hsv8();
            if range.contains(hsv) {
                Luma([FOREGROUND])
            } else {
                Luma([BACKGROUND])
            }
        });
        Mask::from_image(image)
    }
}
