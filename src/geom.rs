pub mod aperture;
pub mod perimeter;
pub mod rectangle;

/// Geometric precision
pub(crate) const EPS: f64 = 1e-9;
