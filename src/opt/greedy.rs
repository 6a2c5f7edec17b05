use anyhow::{Result, anyhow};
use rand::Rng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::debug;

use crate::domain::Access;
use crate::opt::problem::ExitPlacementProblem;
use crate::search::ObjectiveFunction;
use crate::sim::simulator::Simulator;

/// Builds or repairs solutions one exit at a time.
///
/// Each new exit is chosen by a ring search: `ceil(P / w)` equally spaced
/// genes with a random phase are all tried on top of the exits already in
/// place, and the best one is kept. Candidates of one ring are simulated in
/// parallel; the winner is picked in ring order, so ties go to the earliest
/// candidate whatever the scheduling.
pub struct GreedyPlacement<'a, S: Simulator> {
    problem: &'a ExitPlacementProblem<S>,
}

impl<'a, S: Simulator> GreedyPlacement<'a, S> {
    pub fn new(problem: &'a ExitPlacementProblem<S>) -> Self {
        Self { problem }
    }

    /// Candidates tried by one ring search.
    pub fn num_positions(&self) -> usize {
        let codec = self.problem.codec();
        ((codec.perimeter().length() / codec.aperture_width()).ceil() as usize).max(1)
    }

    /// Gene of the best exit to add to `current`, which holds `label` exits.
    pub fn place_next(&self, current: &[Access], label: usize, rng: &mut StdRng) -> Result<f64> {
        let numpos = self.num_positions();
        let inc = 1.0 / numpos as f64;
        let pos0: f64 = rng.gen_range(0.0..1.0);
        let ring: Vec<f64> = (0..numpos)
            .map(|k| (pos0 + k as f64 * inc).fract())
            .collect();

        let fitness = self.evaluate_batch(current, &ring, label)?;
        let best = argmin(&fitness).ok_or_else(|| anyhow!("Ring search had no candidates"))?;
        debug!(
            label,
            numpos,
            gene = ring[best],
            fitness = fitness[best],
            "Placed exit by ring search"
        );
        Ok(ring[best])
    }

    /// Gene of the best exit to add to the exits encoded by `genes`.
    pub fn place_next_among(&self, genes: &[f64], rng: &mut StdRng) -> Result<f64> {
        let current = self.problem.decode(genes);
        self.place_next(&current, genes.len(), rng)
    }

    /// Adds `n` exits to `genes`, one ring search at a time.
    pub fn extend(&self, genes: &[f64], n: usize, rng: &mut StdRng) -> Result<Vec<f64>> {
        let mut genes = genes.to_vec();
        for _ in 0..n {
            let next = self.place_next_among(&genes, rng)?;
            genes.push(next);
        }
        Ok(genes)
    }

    /// Builds a whole solution from scratch.
    pub fn place_all(&self, num_exits: usize, rng: &mut StdRng) -> Result<Vec<f64>> {
        self.extend(&[], num_exits, rng)
    }

    /// Adds `k` exits to `selected`, each the best remaining one from `pool`.
    ///
    /// Once the pool is exhausted the remaining exits come from ring searches.
    pub fn select_from_pool(
        &self,
        k: usize,
        pool: &[f64],
        selected: &[f64],
        rng: &mut StdRng,
    ) -> Result<Vec<f64>> {
        let mut selected = selected.to_vec();
        let mut pool = pool.to_vec();
        for _ in 0..k {
            if pool.is_empty() {
                let next = self.place_next_among(&selected, rng)?;
                selected.push(next);
                continue;
            }
            let current = self.problem.decode(&selected);
            let fitness = self.evaluate_batch(&current, &pool, selected.len())?;
            let best = argmin(&fitness).ok_or_else(|| anyhow!("Empty candidate pool"))?;
            selected.push(pool.remove(best));
        }
        Ok(selected)
    }

    /// Fitness of each gene added on its own to `current`. Charges one unit per gene.
    fn evaluate_batch(&self, current: &[Access], genes: &[f64], label: usize) -> Result<Vec<f64>> {
        let codec = self.problem.codec();
        let base_id = self.problem.domain().accesses().len() + current.len();
        let results: Vec<Result<f64>> = genes
            .par_iter()
            .map(|&gene| {
                let mut accesses = current.to_vec();
                accesses.extend(codec.exit_accesses(gene, label, base_id));
                self.problem.evaluate_accesses(&accesses)
            })
            .collect();
        self.problem.add_cost(genes.len() as u64);
        results.into_iter().collect()
    }
}

/// Index of the smallest value, the first one on ties.
fn argmin(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        if best.is_none_or(|b| v < values[b]) {
            best = Some(i);
        }
    }
    best
}
