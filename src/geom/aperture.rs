//! Decoding of perimeter offsets into wall openings.

use anyhow::{Result, ensure};

use crate::domain::Access;
use crate::geom::EPS;
use crate::geom::perimeter::{Perimeter, Side};
use crate::geom::rectangle::Rectangle;

/// Thickness of the rectangle representing an opening in a wall.
pub const OPENING_THICKNESS: f64 = 0.1;

const MAX_PIECES: usize = 5;

/// Turns a perimeter offset into the rectangles of an aperture of fixed width.
///
/// An aperture running across a corner is split into one rectangle per wall it
/// touches. Rectangles are flush with the wall and extend inwards by
/// [`OPENING_THICKNESS`].
#[derive(Debug, Clone, Copy)]
pub struct ApertureDecoder {
    perimeter: Perimeter,
    aperture_width: f64,
}

impl ApertureDecoder {
    pub fn new(perimeter: Perimeter, aperture_width: f64) -> Result<Self> {
        ensure!(
            aperture_width.is_finite() && aperture_width >= 0.0,
            "Aperture width must be a non-negative number, got {aperture_width}"
        );
        ensure!(
            aperture_width < perimeter.length(),
            "Aperture width {aperture_width} does not fit in a perimeter of length {}",
            perimeter.length()
        );
        Ok(Self {
            perimeter,
            aperture_width,
        })
    }

    pub fn perimeter(&self) -> &Perimeter {
        &self.perimeter
    }

    pub fn aperture_width(&self) -> f64 {
        self.aperture_width
    }

    /// Returns the rectangles covered by an aperture starting at `offset`.
    ///
    /// `offset` is taken modulo the perimeter length. A zero-width aperture
    /// yields no rectangles.
    pub fn decode(&self, offset: f64) -> Vec<Rectangle> {
        let (w, h) = (self.perimeter.width(), self.perimeter.height());
        let t = OPENING_THICKNESS;
        let mut rectangles = Vec::with_capacity(2);
        let (mut side, _) = self.perimeter.locate(offset);
        let mut loc = self.perimeter.normalize(offset);
        let mut remaining = self.aperture_width;

        // An aperture shorter than the perimeter touches at most five walls
        for _ in 0..MAX_PIECES {
            if remaining <= 0.0 {
                break;
            }
            let along = loc - self.perimeter.side_start(side);
            let len = remaining.min(self.perimeter.side_end(side) - loc);

            // Slivers left over by rounding at a corner are not worth an access
            if len > EPS {
                let rect = match side {
                    Side::Bottom => Rectangle::new(along, 0.0, len, t),
                    Side::Right => Rectangle::new(w - t, along, t, len),
                    Side::Top => Rectangle::new(w - along - len, h - t, len, t),
                    Side::Left => Rectangle::new(0.0, h - along - len, t, len),
                };
                rectangles.push(rect);
            }

            remaining -= len;
            side = side.next();
            loc = self.perimeter.side_start(side);
        }

        rectangles
    }

    /// Returns the accesses making up the aperture at `offset`.
    ///
    /// Pieces are named `access <label>-<k>` and get consecutive ids starting at `base_id`.
    pub fn decode_accesses(&self, offset: f64, label: usize, base_id: usize) -> Vec<Access> {
        self.decode(offset)
            .into_iter()
            .enumerate()
            .map(|(k, rect)| Access::new(base_id + k, format!("access {label}-{k}"), rect))
            .collect()
    }
}

/// Length of an opening rectangle measured along its wall.
pub fn opening_length(rect: &Rectangle) -> f64 {
    rect.width.max(rect.height)
}
