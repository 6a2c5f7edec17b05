use crate::geom::EPS;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned rectangle in domain coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub left: f64,
    pub bottom: f64,
    pub width: f64,
    pub height: f64,
}

impl Rectangle {
    pub fn new(left: f64, bottom: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            bottom,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn top(&self) -> f64 {
        self.bottom + self.height
    }

    /// Returns true if both rectangles are very close to each other.
    pub fn is_close(&self, other: &Self) -> bool {
        (self.left - other.left).abs() < EPS
            && (self.bottom - other.bottom).abs() < EPS
            && (self.width - other.width).abs() < EPS
            && (self.height - other.height).abs() < EPS
    }

    /// Checks whether the point `(x, y)` lies inside or on the boundary.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left - EPS
            && x <= self.right() + EPS
            && y >= self.bottom - EPS
            && y <= self.top() + EPS
    }

    /// Checks whether two rectangles share interior area.
    ///
    /// Rectangles that only touch along an edge do not overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.left < other.right() - EPS
            && other.left < self.right() - EPS
            && self.bottom < other.top() - EPS
            && other.bottom < self.top() - EPS
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(2); // Default 2 decimals
        write!(
            f,
            "Rectangle({:.prec$}, {:.prec$}, {:.prec$}, {:.prec$})",
            self.left,
            self.bottom,
            self.width,
            self.height,
            prec = prec
        )
    }
}
