use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::domain::{Access, Domain};
use crate::opt::cache::EvaluationCache;
use crate::opt::codec::{DEFAULT_PRECISION, SolutionCodec};
use crate::opt::evaluator::{Aggregation, SimulationEvaluator};
use crate::search::ObjectiveFunction;
use crate::sim::config::SimulationConfig;
use crate::sim::simulator::Simulator;
use crate::sim::summary::SimulationSummary;

/// What is being optimized: how many exits, how wide, and how they are scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitPlacementConfig {
    pub num_exits: usize,
    /// Width of every new exit in meters.
    pub aperture_width: f64,
    /// Resolution of exit locations in meters.
    pub precision: f64,
    pub aggregation: Aggregation,
}

impl ExitPlacementConfig {
    pub fn new() -> Self {
        Self {
            num_exits: 3,
            aperture_width: 2.0,
            precision: DEFAULT_PRECISION,
            aggregation: Aggregation::WorstCase,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.num_exits >= 1, "numExits must be at least 1");
        ensure!(
            self.aperture_width.is_finite() && self.aperture_width > 0.0,
            "apertureWidth must be positive, got {}",
            self.aperture_width
        );
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).context("Failed to parse exit placement configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .context("Failed to serialize exit placement configuration")
    }
}

impl Default for ExitPlacementConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Running total of simulator work, in full evaluations.
#[derive(Debug, Default)]
pub struct CostLedger(AtomicU64);

impl CostLedger {
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Placement of new exits on the perimeter of a domain, as an objective function.
///
/// A genome holds one gene in `[0, 1)` per exit. Evaluations go through the
/// cache; each miss costs one unit on the ledger.
pub struct ExitPlacementProblem<S: Simulator> {
    config: ExitPlacementConfig,
    codec: SolutionCodec,
    evaluator: SimulationEvaluator<S>,
    cache: EvaluationCache,
    cost: CostLedger,
}

impl<S: Simulator> ExitPlacementProblem<S> {
    pub fn new(
        simulator: S,
        domain: Domain,
        simulation: SimulationConfig,
        config: ExitPlacementConfig,
    ) -> Result<Self> {
        config.validate()?;
        let codec = SolutionCodec::new(domain.perimeter(), config.aperture_width, config.precision)?;
        let evaluator = SimulationEvaluator::new(simulator, domain, simulation, config.aggregation)?;
        Ok(Self {
            config,
            codec,
            evaluator,
            cache: EvaluationCache::new(codec),
            cost: CostLedger::default(),
        })
    }

    pub fn config(&self) -> &ExitPlacementConfig {
        &self.config
    }

    pub fn codec(&self) -> &SolutionCodec {
        &self.codec
    }

    pub fn evaluator(&self) -> &SimulationEvaluator<S> {
        &self.evaluator
    }

    pub fn cache(&self) -> &EvaluationCache {
        &self.cache
    }

    pub fn domain(&self) -> &Domain {
        self.evaluator.domain()
    }

    pub fn num_exits(&self) -> usize {
        self.config.num_exits
    }

    /// Accesses of a genome, numbered after the fixed accesses of the domain.
    pub fn decode(&self, genes: &[f64]) -> Vec<Access> {
        self.codec.accesses(genes, self.domain().accesses().len())
    }

    /// Fitness of `accesses` added to the domain, bypassing cache and ledger.
    pub fn evaluate_accesses(&self, accesses: &[Access]) -> Result<f64> {
        self.evaluator.evaluate_default(accesses)
    }

    /// Re-simulates a genome, e.g. with more runs than used during the search.
    pub fn simulate(&self, genes: &[f64], num_simulations: usize) -> Result<Vec<SimulationSummary>> {
        self.evaluator.simulate(&self.decode(genes), num_simulations)
    }

    /// Cached fitness of a genome.
    pub fn fitness(&self, genes: &[f64]) -> Result<f64> {
        if let Some(fitness) = self.cache.lookup(genes) {
            trace!(fitness, "Cache hit");
            return Ok(fitness);
        }
        let fitness = self.evaluate_accesses(&self.decode(genes))?;
        self.cost.add(1);
        self.cache.store(genes, fitness);
        debug!(
            fitness,
            cached = self.cache.len(),
            cost = self.cost.get(),
            "Evaluated genome"
        );
        Ok(fitness)
    }
}

impl<S: Simulator> ObjectiveFunction for ExitPlacementProblem<S> {
    fn num_variables(&self) -> usize {
        self.config.num_exits
    }

    fn evaluate(&self, x: &[f64]) -> Result<f64> {
        self.fitness(x)
    }

    fn cost(&self) -> u64 {
        self.cost.get()
    }

    fn add_cost(&self, n: u64) {
        self.cost.add(n);
    }
}
