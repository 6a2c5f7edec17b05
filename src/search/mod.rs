//! Generic black-box search drivers.
//!
//! Drivers only see an [`ObjectiveFunction`] and, for the evolutionary
//! algorithm, a [`VariationOperators`] provider. Budgets are expressed in the
//! objective's own cost units, so work done inside operators (e.g. greedy
//! repairs charged through [`ObjectiveFunction::add_cost`]) counts as well.

pub mod ea;
pub mod hooke_jeeves;
pub mod nelder_mead;

use anyhow::Result;
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

pub use ea::{EvolutionConfig, EvolutionaryAlgorithm};
pub use hooke_jeeves::{HookeJeeves, HookeJeevesConfig};
pub use nelder_mead::{NelderMead, NelderMeadConfig};

/// A function to minimize over a box.
pub trait ObjectiveFunction: Sync {
    fn num_variables(&self) -> usize;

    /// Inclusive range of variable `i`.
    fn bounds(&self, _i: usize) -> (f64, f64) {
        (0.0, 1.0)
    }

    fn evaluate(&self, x: &[f64]) -> Result<f64>;

    /// Work consumed so far.
    fn cost(&self) -> u64;

    /// Charges work done outside [`ObjectiveFunction::evaluate`].
    fn add_cost(&self, n: u64);
}

/// Problem-aware variation used by the evolutionary algorithm.
pub trait VariationOperators: Send + Sync {
    fn initialize(&self, rng: &mut StdRng) -> Result<Vec<f64>>;

    fn mutate(&self, genes: &[f64], rng: &mut StdRng) -> Result<Vec<f64>>;

    fn recombine(&self, a: &[f64], b: &[f64], rng: &mut StdRng) -> Result<Vec<f64>>;

    /// Large jump away from `genes`. Plain mutation unless overridden.
    fn macro_mutate(&self, genes: &[f64], rng: &mut StdRng) -> Result<Vec<f64>> {
        self.mutate(genes, rng)
    }
}

/// Best point found by a driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub best: Vec<f64>,
    pub fitness: f64,
    /// Objective cost when the driver stopped.
    pub cost: u64,
    pub iterations: usize,
}

/// Uniform random point inside the bounds of `objective`.
pub fn random_point<F: ObjectiveFunction + ?Sized>(objective: &F, rng: &mut impl Rng) -> Vec<f64> {
    (0..objective.num_variables())
        .map(|i| {
            let (lo, hi) = objective.bounds(i);
            if lo < hi { rng.gen_range(lo..hi) } else { lo }
        })
        .collect()
}

/// Projects `x` onto the bounds of `objective`.
pub fn clamp_to_bounds<F: ObjectiveFunction + ?Sized>(objective: &F, x: &mut [f64]) {
    for (i, xi) in x.iter_mut().enumerate() {
        let (lo, hi) = objective.bounds(i);
        *xi = xi.clamp(lo, hi);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    /// Sphere centered at `center`, one cost unit per evaluation.
    pub struct Sphere {
        pub center: Vec<f64>,
        pub cost: AtomicU64,
    }

    impl Sphere {
        pub fn new(center: Vec<f64>) -> Self {
            Self {
                center,
                cost: AtomicU64::new(0),
            }
        }
    }

    impl ObjectiveFunction for Sphere {
        fn num_variables(&self) -> usize {
            self.center.len()
        }

        fn evaluate(&self, x: &[f64]) -> Result<f64> {
            self.add_cost(1);
            Ok(x.iter()
                .zip(&self.center)
                .map(|(a, b)| (a - b) * (a - b))
                .sum())
        }

        fn cost(&self) -> u64 {
            self.cost.load(Ordering::Relaxed)
        }

        fn add_cost(&self, n: u64) {
            self.cost.fetch_add(n, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Sphere;
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_random_point_in_bounds() {
        let sphere = Sphere::new(vec![0.5; 4]);
        let mut rng = StdRng::seed_from_u64(1);
        let x = random_point(&sphere, &mut rng);
        assert_eq!(x.len(), 4);
        assert!(x.iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn test_clamp_to_bounds() {
        let sphere = Sphere::new(vec![0.5; 3]);
        let mut x = vec![-0.2, 0.4, 1.7];
        clamp_to_bounds(&sphere, &mut x);
        assert_eq!(x, vec![0.0, 0.4, 1.0]);
    }
}
