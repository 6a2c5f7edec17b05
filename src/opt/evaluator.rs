use anyhow::{Result, ensure};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Access, Domain};
use crate::sim::cancel::CancelToken;
use crate::sim::config::SimulationConfig;
use crate::sim::simulator::{Automaton, PedestrianParameters, Simulator};
use crate::sim::summary::SimulationSummary;
use crate::vecutils;

/// How per-run fitness values are folded into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Aggregation {
    /// The worst (largest) run.
    #[default]
    WorstCase,
    Median,
}

impl Aggregation {
    pub fn apply(&self, values: &[f64]) -> f64 {
        match self {
            Aggregation::WorstCase => vecutils::max(values),
            Aggregation::Median => vecutils::median(values),
        }
    }
}

/// Scores candidate exits by simulating evacuations of the domain.
///
/// The domain is never modified. Candidates are simulated through a view of
/// the fixed accesses followed by the candidate ones, so `&self` is enough and
/// one evaluator can serve many threads.
pub struct SimulationEvaluator<S: Simulator> {
    simulator: S,
    domain: Domain,
    config: SimulationConfig,
    aggregation: Aggregation,
    cancel: CancelToken,
}

impl<S: Simulator> SimulationEvaluator<S> {
    pub fn new(
        simulator: S,
        domain: Domain,
        config: SimulationConfig,
        aggregation: Aggregation,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            simulator,
            domain,
            config,
            aggregation,
            cancel: CancelToken::new(),
        })
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Runs `num_simulations` evacuations with `accesses` added to the domain.
    ///
    /// Run `i` draws everything from a generator seeded with `seed + i`, so
    /// different candidates face the same crowds.
    pub fn simulate(
        &self,
        accesses: &[Access],
        num_simulations: usize,
    ) -> Result<Vec<SimulationSummary>> {
        let view = self.domain.view(accesses);
        let scenario = self.simulator.build_scenario(
            &view,
            self.config.cell_dimension,
            self.config.floor_field,
        )?;
        let mut automaton = self.simulator.build_automaton(
            &scenario,
            self.config.neighbourhood,
            self.config.time_limit,
            self.config.crowd.pedestrian_reference_velocity,
        )?;

        let crowd = &self.config.crowd;
        let sampler = |rng: &mut StdRng| PedestrianParameters::sample(crowd, rng);

        let mut summaries = Vec::with_capacity(num_simulations);
        for i in 0..num_simulations {
            self.cancel.check()?;
            let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(i as u64));
            automaton.reset();
            let count = crowd.num_pedestrians.sample(&mut rng);
            automaton.add_pedestrians_uniformly(count, &sampler, &mut rng)?;
            automaton.run(&mut rng, &self.cancel)?;
            summaries.push(SimulationSummary::from_automaton(&automaton));
        }
        Ok(summaries)
    }

    /// Fitness of one run in this domain.
    pub fn run_fitness(&self, summary: &SimulationSummary) -> f64 {
        summary.fitness(self.domain.perimeter().diameter(), self.config.time_limit)
    }

    /// Aggregated fitness of `accesses` over `num_simulations` runs. Lower is better.
    pub fn evaluate(&self, accesses: &[Access], num_simulations: usize) -> Result<f64> {
        ensure!(num_simulations >= 1, "At least one simulation is needed");
        let summaries = self.simulate(accesses, num_simulations)?;
        let values: Vec<f64> = summaries.iter().map(|s| self.run_fitness(s)).collect();
        let fitness = self.aggregation.apply(&values);
        debug!(
            accesses = accesses.len(),
            runs = num_simulations,
            fitness,
            "Evaluated candidate exits"
        );
        Ok(fitness)
    }

    /// Same as [`Self::evaluate`] with the configured number of simulations.
    pub fn evaluate_default(&self, accesses: &[Access]) -> Result<f64> {
        self.evaluate(accesses, self.config.num_simulations)
    }
}
