use anyhow::{Result, ensure};
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ObjectiveFunction, SearchResult, VariationOperators};

/// Steady-state evolutionary algorithm settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionConfig {
    pub population_size: usize,
    /// Stop once the objective has consumed this much cost.
    pub budget: u64,
    /// Hard cap on generated offspring, in case cache hits stall the budget.
    pub max_iterations: usize,
    pub tournament_size: usize,
    pub recombination_rate: f64,
    pub mutation_rate: f64,
    pub macro_mutation_rate: f64,
}

impl EvolutionConfig {
    pub fn new() -> Self {
        Self {
            population_size: 10,
            budget: 1000,
            max_iterations: 100_000,
            tournament_size: 2,
            recombination_rate: 0.9,
            mutation_rate: 1.0,
            macro_mutation_rate: 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.population_size >= 1, "populationSize must be at least 1");
        ensure!(self.tournament_size >= 1, "tournamentSize must be at least 1");
        for (name, rate) in [
            ("recombinationRate", self.recombination_rate),
            ("mutationRate", self.mutation_rate),
            ("macroMutationRate", self.macro_mutation_rate),
        ] {
            ensure!(
                (0.0..=1.0).contains(&rate),
                "{name} must lie in [0, 1], got {rate}"
            );
        }
        Ok(())
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Measures how spread out a population is.
pub type DiversityMeasure = dyn Fn(&[Vec<f64>]) -> f64 + Send + Sync;

/// Steady-state EA: one offspring per iteration replaces the worst individual
/// when it is at least as good.
pub struct EvolutionaryAlgorithm {
    config: EvolutionConfig,
    operators: Box<dyn VariationOperators>,
    diversity: Option<Box<DiversityMeasure>>,
}

impl EvolutionaryAlgorithm {
    pub fn new(config: EvolutionConfig, operators: Box<dyn VariationOperators>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            operators,
            diversity: None,
        })
    }

    /// Logs the diversity of the population once per generation.
    pub fn with_diversity(mut self, measure: Box<DiversityMeasure>) -> Self {
        self.diversity = Some(measure);
        self
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn run<F: ObjectiveFunction + ?Sized>(
        &self,
        objective: &F,
        rng: &mut StdRng,
    ) -> Result<SearchResult> {
        let mut genomes = Vec::with_capacity(self.config.population_size);
        let mut fitness = Vec::with_capacity(self.config.population_size);
        for _ in 0..self.config.population_size {
            let genes = self.operators.initialize(rng)?;
            fitness.push(objective.evaluate(&genes)?);
            genomes.push(genes);
        }

        let best = best_index(&fitness);
        let mut best_genes = genomes[best].clone();
        let mut best_fitness = fitness[best];
        info!(
            fitness = best_fitness,
            cost = objective.cost(),
            "Initial population evaluated"
        );

        let mut iterations = 0;
        while objective.cost() < self.config.budget && iterations < self.config.max_iterations {
            iterations += 1;

            let first = self.tournament(&fitness, rng);
            let mut child = if rng.gen_range(0.0..1.0) < self.config.recombination_rate {
                let second = self.tournament(&fitness, rng);
                self.operators
                    .recombine(&genomes[first], &genomes[second], rng)?
            } else {
                genomes[first].clone()
            };
            if rng.gen_range(0.0..1.0) < self.config.macro_mutation_rate {
                child = self.operators.macro_mutate(&child, rng)?;
            } else if rng.gen_range(0.0..1.0) < self.config.mutation_rate {
                child = self.operators.mutate(&child, rng)?;
            }

            let f = objective.evaluate(&child)?;
            if f < best_fitness {
                best_fitness = f;
                best_genes = child.clone();
                info!(
                    fitness = f,
                    cost = objective.cost(),
                    iterations,
                    "New best solution"
                );
            }
            let worst = worst_index(&fitness);
            if f <= fitness[worst] {
                genomes[worst] = child;
                fitness[worst] = f;
            }

            if iterations % self.config.population_size == 0
                && let Some(measure) = &self.diversity
            {
                debug!(
                    iterations,
                    diversity = measure(&genomes),
                    "Population diversity"
                );
            }
        }

        Ok(SearchResult {
            best: best_genes,
            fitness: best_fitness,
            cost: objective.cost(),
            iterations,
        })
    }

    fn tournament(&self, fitness: &[f64], rng: &mut StdRng) -> usize {
        let mut winner = rng.gen_range(0..fitness.len());
        for _ in 1..self.config.tournament_size {
            let rival = rng.gen_range(0..fitness.len());
            if fitness[rival] < fitness[winner] {
                winner = rival;
            }
        }
        winner
    }
}

fn best_index(fitness: &[f64]) -> usize {
    (0..fitness.len())
        .min_by(|&a, &b| fitness[a].total_cmp(&fitness[b]))
        .unwrap_or(0)
}

fn worst_index(fitness: &[f64]) -> usize {
    (0..fitness.len())
        .max_by(|&a, &b| fitness[a].total_cmp(&fitness[b]))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opt::diversity::circular_set_diversity;
    use crate::opt::operators::RandomOperators;
    use crate::search::testing::Sphere;
    use rand::SeedableRng;

    fn ea(budget: u64) -> EvolutionaryAlgorithm {
        let mut config = EvolutionConfig::new();
        config.budget = budget;
        config.population_size = 8;
        EvolutionaryAlgorithm::new(config, Box::new(RandomOperators::new(2, 0.1).unwrap())).unwrap()
    }

    #[test]
    fn test_respects_budget() {
        let sphere = Sphere::new(vec![0.3, 0.7]);
        let result = ea(100).run(&sphere, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(result.cost, 100);
        assert_eq!(result.iterations, 92);
    }

    #[test]
    fn test_improves_on_initial_population() {
        let sphere = Sphere::new(vec![0.5, 0.5]);
        let result = ea(400)
            .with_diversity(Box::new(|pop: &[Vec<f64>]| circular_set_diversity(pop, 1.0)))
            .run(&sphere, &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert!(result.fitness < 0.02, "fitness {}", result.fitness);
        assert!((sphere.evaluate(&result.best).unwrap() - result.fitness).abs() < 1e-12);
    }

    #[test]
    fn test_same_seed_same_result() {
        let sphere = Sphere::new(vec![0.5, 0.5]);
        let a = ea(60).run(&sphere, &mut StdRng::seed_from_u64(7)).unwrap();
        let sphere = Sphere::new(vec![0.5, 0.5]);
        let b = ea(60).run(&sphere, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_bad_config() {
        let mut config = EvolutionConfig::new();
        config.population_size = 0;
        let ops = Box::new(RandomOperators::new(2, 0.1).unwrap());
        assert!(EvolutionaryAlgorithm::new(config, ops).is_err());
    }
}
