use std::collections::BTreeSet;

use anyhow::{Result, ensure};

use crate::domain::Access;
use crate::geom::aperture::ApertureDecoder;
use crate::geom::perimeter::Perimeter;

/// Default resolution of exit locations along the perimeter, in meters.
pub const DEFAULT_PRECISION: f64 = 0.1;

/// Maps genome values in `[0, 1)` to exits on the perimeter.
///
/// A gene `g` denotes the location `round(g * (P - w) / precision) * precision`,
/// where `P` is the perimeter length and `w` the aperture width. Every
/// consumer (objective, cache, greedy search, diversity) goes through here so
/// that two genomes with the same quantized locations are the same solution.
#[derive(Debug, Clone, Copy)]
pub struct SolutionCodec {
    decoder: ApertureDecoder,
    precision: f64,
}

impl SolutionCodec {
    pub fn new(perimeter: Perimeter, aperture_width: f64, precision: f64) -> Result<Self> {
        ensure!(
            precision.is_finite() && precision > 0.0,
            "Location precision must be positive, got {precision}"
        );
        Ok(Self {
            decoder: ApertureDecoder::new(perimeter, aperture_width)?,
            precision,
        })
    }

    pub fn perimeter(&self) -> &Perimeter {
        self.decoder.perimeter()
    }

    pub fn aperture_width(&self) -> f64 {
        self.decoder.aperture_width()
    }

    pub fn precision(&self) -> f64 {
        self.precision
    }

    /// Length of perimeter over which exits may start.
    pub fn span(&self) -> f64 {
        self.perimeter().length() - self.aperture_width()
    }

    /// Quantized location of `gene` in units of the precision.
    pub fn location_units(&self, gene: f64) -> i64 {
        (gene * self.span() / self.precision).round() as i64
    }

    /// Perimeter offset at which the exit encoded by `gene` starts.
    pub fn location(&self, gene: f64) -> f64 {
        self.location_units(gene) as f64 * self.precision
    }

    /// Gene whose location is exactly `units` steps of precision.
    pub fn gene_of_units(&self, units: i64) -> f64 {
        units as f64 * self.precision / self.span()
    }

    /// Snaps a gene onto the location grid.
    pub fn quantize(&self, gene: f64) -> f64 {
        self.gene_of_units(self.location_units(gene))
    }

    /// Order-insensitive identity of a genome.
    pub fn key(&self, genes: &[f64]) -> BTreeSet<i64> {
        genes.iter().map(|&g| self.location_units(g)).collect()
    }

    /// Accesses of a single exit, labelled `label`, with ids from `base_id`.
    pub fn exit_accesses(&self, gene: f64, label: usize, base_id: usize) -> Vec<Access> {
        self.decoder
            .decode_accesses(self.location(gene), label, base_id)
    }

    /// Accesses of every exit in `genes`; exit `k` is labelled `k`.
    pub fn accesses(&self, genes: &[f64], base_id: usize) -> Vec<Access> {
        let mut accesses = Vec::with_capacity(genes.len());
        for (k, &gene) in genes.iter().enumerate() {
            let next = accesses.len();
            accesses.extend(self.exit_accesses(gene, k, base_id + next));
        }
        accesses
    }
}
