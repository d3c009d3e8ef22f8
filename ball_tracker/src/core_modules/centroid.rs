// THEORY:
// The `CentroidEstimator` reduces a mask to a single sub-pixel position using
// raw image moments:
//   m00 = Σ mask(x, y)        (area, in pixels)
//   m10 = Σ x · mask(x, y)
//   m01 = Σ y · mask(x, y)
// The centroid is (m10 / m00, m01 / m00). This is the geometric center of all
// foreground pixels together, not of the largest region, so stray pixels pull
// it around. The only gate is a minimum area.

use crate::core_modules::color_segmenter::Mask;
use serde::{Deserialize, Serialize};

/// A position in image coordinates (pixels, origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Outcome of looking for the ball in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Detection {
    Ball(Point),
    Miss,
}

impl Detection {
    pub fn point(&self) -> Option<Point> {
        match self {
            Detection::Ball(point) => Some(*point),
            Detection::Miss => None,
        }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Detection::Miss)
    }
}

impl From<Option<Point>> for Detection {
    fn from(point: Option<Point>) -> Self {
        point.map_or(Detection::Miss, Detection::Ball)
    }
}

/// Zeroth and first order moments of a binary mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Moments {
    pub m00: u64,
    pub m10: u64,
    pub m01: u64,
}

impl Moments {
    pub fn of(mask: &Mask) -> Self {
        mask.foreground_pixels()
            .fold(Moments::default(), |acc, (x, y)| Moments {
                m00: acc.m00 + 1,
                m10: acc.m10 + x as u64,
                m01: acc.m01 + y as u64,
            })
    }

    pub fn centroid(&self) -> Option<Point> {
        if self.m00 == 0 {
            return None;
        }
        let area = self.m00 as f64;
        Some(Point::new(self.m10 as f64 / area, self.m01 as f64 / area))
    }
}

/// Locates the ball in a mask. `min_area` of 1 accepts any foreground pixel.
pub fn estimate(mask: &Mask, min_area: u64) -> Detection {
    let moments = Moments::of(mask);
    if moments.m00 < min_area.max(1) {
        return Detection::Miss;
    }
    moments.centroid().into()
}
