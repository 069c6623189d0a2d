//! Geometry and wire types shared between the HTTP surface and the pipeline

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A 2D point in image coordinates.
///
/// Coordinates are pixels from the top-left corner. Points may lie
/// outside the image bounds; the rasterizer clips them implicitly by
/// only ever sampling in-bounds pixel centers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge)
    pub x: f64,
    /// Vertical position (pixels from top edge)
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True when both coordinates are finite numbers
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// An ordered closed polygon delimiting the region of an image to clear.
///
/// The last point implicitly connects back to the first. Insertion
/// order is significant: it defines edge traversal for the fill test.
/// Construction validates the polygon, so every `Mask` value in the
/// pipeline is known to be well-formed.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    points: Vec<Point>,
}

impl Mask {
    /// Minimum number of vertices for a closed polygon
    pub const MIN_POINTS: usize = 3;

    /// Validate and construct a mask from an ordered point sequence.
    ///
    /// Rejects sequences with fewer than [`Self::MIN_POINTS`] points or
    /// containing non-finite coordinates. Validation happens here, before
    /// any network or filesystem work can be done on the request.
    pub fn new(points: Vec<Point>) -> Result<Self> {
        if points.len() < Self::MIN_POINTS {
            return Err(Error::InvalidMask(format!(
                "polygon requires at least {} points, got {}",
                Self::MIN_POINTS,
                points.len()
            )));
        }
        if let Some(p) = points.iter().find(|p| !p.is_finite()) {
            return Err(Error::InvalidMask(format!(
                "malformed point data: ({}, {})",
                p.x, p.y
            )));
        }
        Ok(Self { points })
    }

    /// The polygon vertices, in insertion order
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false: a constructed mask has at least 3 points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One generated image returned by the generation service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedImage {
    pub url: String,
}
