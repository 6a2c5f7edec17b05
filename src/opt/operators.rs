use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::opt::greedy::GreedyPlacement;
use crate::opt::problem::ExitPlacementProblem;
use crate::search::VariationOperators;
use crate::sim::simulator::Simulator;

/// Problem-agnostic operators for genomes that are sets of points on `[0, 1)`.
#[derive(Debug, Clone)]
pub struct RandomOperators {
    num_variables: usize,
    normal: Normal<f64>,
}

impl RandomOperators {
    /// `sigma` is the standard deviation of Gaussian mutation.
    pub fn new(num_variables: usize, sigma: f64) -> Result<Self> {
        ensure!(num_variables >= 1, "Genomes need at least one gene");
        let normal = Normal::new(0.0, sigma).context("Invalid mutation amplitude")?;
        Ok(Self {
            num_variables,
            normal,
        })
    }

    pub fn random_genome(&self, rng: &mut StdRng) -> Vec<f64> {
        (0..self.num_variables)
            .map(|_| rng.gen_range(0.0..1.0))
            .collect()
    }

    /// Perturbs each gene with probability `1/n`, wrapping around `[0, 1)`.
    pub fn gaussian_mutation(&self, genes: &[f64], rng: &mut StdRng) -> Vec<f64> {
        let p = 1.0 / genes.len().max(1) as f64;
        genes
            .iter()
            .map(|&g| {
                let roll: f64 = rng.gen_range(0.0..1.0);
                if roll < p {
                    (g + self.normal.sample(rng)).rem_euclid(1.0)
                } else {
                    g
                }
            })
            .collect()
    }

    /// Picks `n` distinct genes from the union of both parents.
    ///
    /// Missing genes, when the parents share too many, are drawn uniformly.
    pub fn set_recombination(&self, a: &[f64], b: &[f64], rng: &mut StdRng) -> Vec<f64> {
        let mut union: Vec<f64> = a.iter().chain(b).copied().collect();
        union.sort_by(f64::total_cmp);
        union.dedup();
        let mut child: Vec<f64> = union
            .choose_multiple(rng, self.num_variables)
            .copied()
            .collect();
        while child.len() < self.num_variables {
            child.push(rng.gen_range(0.0..1.0));
        }
        child
    }
}

impl VariationOperators for RandomOperators {
    fn initialize(&self, rng: &mut StdRng) -> Result<Vec<f64>> {
        Ok(self.random_genome(rng))
    }

    fn mutate(&self, genes: &[f64], rng: &mut StdRng) -> Result<Vec<f64>> {
        Ok(self.gaussian_mutation(genes, rng))
    }

    fn recombine(&self, a: &[f64], b: &[f64], rng: &mut StdRng) -> Result<Vec<f64>> {
        Ok(self.set_recombination(a, b, rng))
    }

    fn macro_mutate(&self, genes: &[f64], rng: &mut StdRng) -> Result<Vec<f64>> {
        let other = self.random_genome(rng);
        Ok(self.set_recombination(genes, &other, rng))
    }
}

/// Probabilities of using the greedy version of each operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GreedyOperatorConfig {
    pub initialization_rate: f64,
    pub mutation_rate: f64,
    /// Exits replaced by a greedy mutation; `0` replaces all of them.
    pub exits_mutated: usize,
    pub recombination_rate: f64,
    pub macro_mutation_rate: f64,
    /// Standard deviation of the Gaussian mutation used otherwise.
    pub sigma: f64,
}

impl GreedyOperatorConfig {
    pub fn new() -> Self {
        Self {
            initialization_rate: 0.5,
            mutation_rate: 0.1,
            exits_mutated: 1,
            recombination_rate: 0.5,
            macro_mutation_rate: 0.5,
            sigma: 0.05,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, rate) in [
            ("initializationRate", self.initialization_rate),
            ("mutationRate", self.mutation_rate),
            ("recombinationRate", self.recombination_rate),
            ("macroMutationRate", self.macro_mutation_rate),
        ] {
            ensure!(
                (0.0..=1.0).contains(&rate),
                "{name} must lie in [0, 1], got {rate}"
            );
        }
        ensure!(
            self.sigma.is_finite() && self.sigma > 0.0,
            "sigma must be positive, got {}",
            self.sigma
        );
        Ok(())
    }
}

impl Default for GreedyOperatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Operators that call the greedy placement engine with some probability and
/// fall back on [`RandomOperators`] otherwise.
///
/// Ring searches and pool selections charge their own cost to the problem.
pub struct GreedyOperators<S: Simulator> {
    problem: Arc<ExitPlacementProblem<S>>,
    config: GreedyOperatorConfig,
    fallback: RandomOperators,
}

impl<S: Simulator> GreedyOperators<S> {
    pub fn new(problem: Arc<ExitPlacementProblem<S>>, config: GreedyOperatorConfig) -> Result<Self> {
        config.validate()?;
        let fallback = RandomOperators::new(problem.num_exits(), config.sigma)?;
        Ok(Self {
            problem,
            config,
            fallback,
        })
    }

    pub fn config(&self) -> &GreedyOperatorConfig {
        &self.config
    }

    fn greedy(&self) -> GreedyPlacement<'_, S> {
        GreedyPlacement::new(&self.problem)
    }

    /// Replaces `k` randomly chosen exits by greedy ones placed around the others.
    pub fn greedy_mutation(&self, genes: &[f64], rng: &mut StdRng) -> Result<Vec<f64>> {
        let n = genes.len();
        let k = match self.config.exits_mutated {
            0 => n,
            k => k.min(n),
        };
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);
        let kept: Vec<f64> = order[k..].iter().map(|&i| genes[i]).collect();
        self.greedy().extend(&kept, k, rng)
    }

    /// Greedily selects a full genome from the exits of both parents.
    pub fn greedy_recombination(&self, a: &[f64], b: &[f64], rng: &mut StdRng) -> Result<Vec<f64>> {
        let codec = self.problem.codec();
        let units: BTreeSet<i64> = codec.key(a).union(&codec.key(b)).copied().collect();
        let pool: Vec<f64> = units.into_iter().map(|u| codec.gene_of_units(u)).collect();
        self.greedy()
            .select_from_pool(self.problem.num_exits(), &pool, &[], rng)
    }
}

fn roll(rng: &mut StdRng) -> f64 {
    rng.gen_range(0.0..1.0)
}

impl<S: Simulator> VariationOperators for GreedyOperators<S> {
    fn initialize(&self, rng: &mut StdRng) -> Result<Vec<f64>> {
        if roll(rng) < self.config.initialization_rate {
            self.greedy().place_all(self.problem.num_exits(), rng)
        } else {
            Ok(self.fallback.random_genome(rng))
        }
    }

    fn mutate(&self, genes: &[f64], rng: &mut StdRng) -> Result<Vec<f64>> {
        if roll(rng) < self.config.mutation_rate {
            self.greedy_mutation(genes, rng)
        } else {
            Ok(self.fallback.gaussian_mutation(genes, rng))
        }
    }

    fn recombine(&self, a: &[f64], b: &[f64], rng: &mut StdRng) -> Result<Vec<f64>> {
        if roll(rng) < self.config.recombination_rate {
            self.greedy_recombination(a, b, rng)
        } else {
            Ok(self.fallback.set_recombination(a, b, rng))
        }
    }

    fn macro_mutate(&self, genes: &[f64], rng: &mut StdRng) -> Result<Vec<f64>> {
        if roll(rng) < self.config.macro_mutation_rate {
            let other = self.fallback.random_genome(rng);
            self.greedy_recombination(genes, &other, rng)
        } else {
            Ok(self.fallback.gaussian_mutation(genes, rng))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opt::testing::beacon_problem;
    use crate::search::ObjectiveFunction;
    use rand::SeedableRng;

    fn always_greedy() -> GreedyOperatorConfig {
        GreedyOperatorConfig {
            initialization_rate: 1.0,
            mutation_rate: 1.0,
            exits_mutated: 1,
            recombination_rate: 1.0,
            macro_mutation_rate: 1.0,
            sigma: 0.05,
        }
    }

    #[test]
    fn test_random_operators_stay_in_range() {
        let ops = RandomOperators::new(3, 0.3).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..50 {
            let g = ops.random_genome(&mut rng);
            let m = ops.gaussian_mutation(&g, &mut rng);
            assert_eq!(m.len(), 3);
            assert!(m.iter().all(|x| (0.0..1.0).contains(x)));
        }
    }

    #[test]
    fn test_set_recombination_draws_from_parents() {
        let ops = RandomOperators::new(2, 0.1).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let a = [0.1, 0.2];
        let b = [0.3, 0.4];
        for _ in 0..20 {
            let child = ops.set_recombination(&a, &b, &mut rng);
            assert_eq!(child.len(), 2);
            assert_ne!(child[0], child[1]);
            assert!(child.iter().all(|g| a.contains(g) || b.contains(g)));
        }
        // Identical single-gene parents need a random filler
        let child = ops.set_recombination(&[0.5, 0.5], &[0.5, 0.5], &mut rng);
        assert_eq!(child.len(), 2);
        assert!(child.contains(&0.5));
    }

    #[test]
    fn test_rejects_bad_rates() {
        let mut config = GreedyOperatorConfig::new();
        config.mutation_rate = 1.5;
        assert!(config.validate().is_err());
        let mut config = GreedyOperatorConfig::new();
        config.sigma = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_greedy_initialization_charges_rings() {
        let problem = Arc::new(beacon_problem((10.0, 0.0), 2));
        let ops = GreedyOperators::new(problem.clone(), always_greedy()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let genes = ops.initialize(&mut rng).unwrap();
        assert_eq!(genes.len(), 2);
        assert_eq!(problem.cost(), 2 * 30);
    }

    #[test]
    fn test_greedy_mutation_keeps_other_exits() {
        let problem = Arc::new(beacon_problem((10.0, 0.0), 3));
        let ops = GreedyOperators::new(problem.clone(), always_greedy()).unwrap();
        let mut rng = StdRng::seed_from_u64(8);
        let parent = vec![0.2, 0.5, 0.8];
        let child = ops.mutate(&parent, &mut rng).unwrap();
        assert_eq!(child.len(), 3);
        let kept = child[..2].iter().filter(|g| parent.contains(g)).count();
        assert_eq!(kept, 2);
        assert_eq!(problem.cost(), 30);
    }

    #[test]
    fn test_greedy_recombination_picks_from_union() {
        let problem = Arc::new(beacon_problem((10.0, 0.0), 2));
        let ops = GreedyOperators::new(problem.clone(), always_greedy()).unwrap();
        let codec = *problem.codec();
        let a = vec![codec.gene_of_units(90), codec.gene_of_units(300)];
        // Same first exit written slightly differently, so the union has 3 exits
        let b = vec![codec.gene_of_units(450), a[0] + 1e-6];
        let mut rng = StdRng::seed_from_u64(3);
        let child = ops.recombine(&a, &b, &mut rng).unwrap();
        assert_eq!(child.len(), 2);
        assert_eq!(codec.location_units(child[0]), 90);
        // Pool of 3 then pool of 2
        assert_eq!(problem.cost(), 5);
    }

    #[test]
    fn test_greedy_macro_mutation_selects_from_parent_and_random_genome() {
        let problem = Arc::new(beacon_problem((10.0, 0.0), 2));
        let ops = GreedyOperators::new(problem.clone(), always_greedy()).unwrap();
        let codec = *problem.codec();
        let parent = vec![codec.gene_of_units(20), codec.gene_of_units(400)];
        let mut rng = StdRng::seed_from_u64(6);

        // Replays the draws of macro_mutate to learn the random partner
        let mut replay = rng.clone();
        let _: f64 = replay.gen_range(0.0..1.0);
        let partner = RandomOperators::new(2, 0.05).unwrap().random_genome(&mut replay);
        let union: BTreeSet<i64> = codec.key(&parent).union(&codec.key(&partner)).copied().collect();
        assert!(union.len() >= 2);

        let child = ops.macro_mutate(&parent, &mut rng).unwrap();
        assert_eq!(child.len(), 2);
        assert!(child.iter().all(|&g| union.contains(&codec.location_units(g))));
        // Pool of n then pool of n - 1
        assert_eq!(problem.cost(), (2 * union.len() - 1) as u64);
    }
}
