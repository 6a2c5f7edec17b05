//! Boundary of a rectangular domain seen as a 1-D circular coordinate.
//!
//! The perimeter is walked counter-clockwise starting at the origin:
//!
//! ```text
//!   2W+H <-------- top ---------- W+H
//!    |                             ^
//!   left                         right
//!    v                             |
//!    0 --------- bottom ---------> W
//! ```
//!
//! Offsets are periodic with period `P = 2 * (W + H)`.

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// One of the four walls of the rectangle, in walking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Left to right along `y = 0`.
    Bottom,
    /// Bottom to top along `x = W`.
    Right,
    /// Right to left along `y = H`.
    Top,
    /// Top to bottom along `x = 0`.
    Left,
}

impl Side {
    /// The side walked after this one.
    pub fn next(self) -> Self {
        match self {
            Side::Bottom => Side::Right,
            Side::Right => Side::Top,
            Side::Top => Side::Left,
            Side::Left => Side::Bottom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Perimeter {
    width: f64,
    height: f64,
}

impl Perimeter {
    pub fn new(width: f64, height: f64) -> Result<Self> {
        ensure!(
            width.is_finite() && width > 0.0,
            "Domain width must be positive, got {width}"
        );
        ensure!(
            height.is_finite() && height > 0.0,
            "Domain height must be positive, got {height}"
        );
        Ok(Self { width, height })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Total length `2 * (W + H)`.
    pub fn length(&self) -> f64 {
        2.0 * (self.width + self.height)
    }

    /// Length of the rectangle's diagonal.
    pub fn diameter(&self) -> f64 {
        self.width.hypot(self.height)
    }

    /// Maps any offset into `[0, P)`.
    pub fn normalize(&self, offset: f64) -> f64 {
        let p = self.length();
        let loc = offset.rem_euclid(p);
        // rem_euclid may round tiny negative inputs up to exactly P
        if loc >= p { 0.0 } else { loc }
    }

    /// Offset at which `side` ends, equal to where the next side starts.
    ///
    /// Uses the same expressions as [`Self::locate`], so an offset below the
    /// end of a side is always located on that side.
    pub fn side_end(&self, side: Side) -> f64 {
        match side {
            Side::Left => self.length(),
            _ => self.side_start(side.next()),
        }
    }

    /// Offset at which `side` starts.
    pub fn side_start(&self, side: Side) -> f64 {
        let (w, h) = (self.width, self.height);
        match side {
            Side::Bottom => 0.0,
            Side::Right => w,
            Side::Top => w + h,
            Side::Left => 2.0 * w + h,
        }
    }

    /// Returns the side containing `offset` and the distance already walked along it.
    pub fn locate(&self, offset: f64) -> (Side, f64) {
        let loc = self.normalize(offset);
        let side = [Side::Bottom, Side::Right, Side::Top]
            .into_iter()
            .find(|&side| loc < self.side_end(side))
            .unwrap_or(Side::Left);
        (side, loc - self.side_start(side))
    }
}
