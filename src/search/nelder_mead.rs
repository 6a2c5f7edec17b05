use anyhow::{Result, ensure};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ObjectiveFunction, SearchResult, clamp_to_bounds, random_point};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NelderMeadConfig {
    pub budget: u64,
    pub max_iterations: usize,
    /// Edge length of the initial simplex.
    pub initial_step: f64,
    /// Restart once every vertex is this close to the best one.
    pub tolerance: f64,
    pub reflection: f64,
    pub expansion: f64,
    pub contraction: f64,
    pub shrink: f64,
}

impl NelderMeadConfig {
    pub fn new() -> Self {
        Self {
            budget: 500,
            max_iterations: 100_000,
            initial_step: 0.1,
            tolerance: 1e-3,
            reflection: 1.0,
            expansion: 2.0,
            contraction: 0.5,
            shrink: 0.5,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.initial_step > 0.0, "initialStep must be positive");
        ensure!(self.tolerance > 0.0, "tolerance must be positive");
        ensure!(self.reflection > 0.0, "reflection must be positive");
        ensure!(
            self.expansion > 1.0 && self.expansion > self.reflection,
            "expansion must exceed both 1 and the reflection coefficient"
        );
        ensure!(
            0.0 < self.contraction && self.contraction < 1.0,
            "contraction must lie in (0, 1)"
        );
        ensure!(
            0.0 < self.shrink && self.shrink < 1.0,
            "shrink must lie in (0, 1)"
        );
        Ok(())
    }
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded Nelder-Mead simplex search, restarted from a random point every
/// time the simplex collapses, until the budget is spent.
pub struct NelderMead {
    config: NelderMeadConfig,
}

impl NelderMead {
    pub fn new(config: NelderMeadConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run<F: ObjectiveFunction + ?Sized>(
        &self,
        objective: &F,
        rng: &mut StdRng,
    ) -> Result<SearchResult> {
        let c = &self.config;
        let n = objective.num_variables();
        let mut best: Option<(Vec<f64>, f64)> = None;
        let mut iterations = 0;
        let mut restarts = 0;

        while objective.cost() < c.budget && iterations < c.max_iterations {
            let mut simplex = self.initial_simplex(objective, random_point(objective, rng));
            let mut values = simplex
                .iter()
                .map(|x| objective.evaluate(x))
                .collect::<Result<Vec<f64>>>()?;

            while objective.cost() < c.budget && iterations < c.max_iterations {
                iterations += 1;
                sort_simplex(&mut simplex, &mut values);
                if simplex_size(&simplex) < c.tolerance {
                    break;
                }

                let worst = n;
                let centroid: Vec<f64> = (0..n)
                    .map(|j| simplex[..n].iter().map(|x| x[j]).sum::<f64>() / n as f64)
                    .collect();
                let toward = |from: &[f64], coef: f64| -> Vec<f64> {
                    let mut p: Vec<f64> = centroid
                        .iter()
                        .zip(from)
                        .map(|(ci, fi)| ci + coef * (fi - ci))
                        .collect();
                    clamp_to_bounds(objective, &mut p);
                    p
                };

                let reflected = toward(&simplex[worst], -c.reflection);
                let fr = objective.evaluate(&reflected)?;
                if fr < values[0] {
                    let expanded = toward(&simplex[worst], -c.expansion);
                    let fe = objective.evaluate(&expanded)?;
                    if fe < fr {
                        simplex[worst] = expanded;
                        values[worst] = fe;
                    } else {
                        simplex[worst] = reflected;
                        values[worst] = fr;
                    }
                } else if fr < values[n - 1] {
                    simplex[worst] = reflected;
                    values[worst] = fr;
                } else {
                    let (contracted, reference) = if fr < values[worst] {
                        (toward(&simplex[worst], -c.contraction), fr)
                    } else {
                        (toward(&simplex[worst], c.contraction), values[worst])
                    };
                    let fc = objective.evaluate(&contracted)?;
                    if fc < reference {
                        simplex[worst] = contracted;
                        values[worst] = fc;
                    } else {
                        let anchor = simplex[0].clone();
                        for i in 1..=n {
                            for (xj, aj) in simplex[i].iter_mut().zip(&anchor) {
                                *xj = aj + c.shrink * (*xj - aj);
                            }
                            values[i] = objective.evaluate(&simplex[i])?;
                        }
                    }
                }
            }

            sort_simplex(&mut simplex, &mut values);
            if best.as_ref().is_none_or(|(_, f)| values[0] < *f) {
                info!(
                    fitness = values[0],
                    cost = objective.cost(),
                    restarts,
                    "Nelder-Mead improved"
                );
                best = Some((simplex[0].clone(), values[0]));
            }
            restarts += 1;
            debug!(restarts, cost = objective.cost(), "Nelder-Mead restart");
        }

        let (best, fitness) = best.unwrap_or_else(|| (vec![], f64::INFINITY));
        Ok(SearchResult {
            best,
            fitness,
            cost: objective.cost(),
            iterations,
        })
    }

    fn initial_simplex<F: ObjectiveFunction + ?Sized>(&self, objective: &F, x0: Vec<f64>) -> Vec<Vec<f64>> {
        let mut simplex = vec![x0.clone()];
        for i in 0..x0.len() {
            let (_, hi) = objective.bounds(i);
            let mut x = x0.clone();
            // Step inwards when the vertex would leave the box
            if x[i] + self.config.initial_step <= hi {
                x[i] += self.config.initial_step;
            } else {
                x[i] -= self.config.initial_step;
            }
            clamp_to_bounds(objective, &mut x);
            simplex.push(x);
        }
        simplex
    }
}

fn sort_simplex(simplex: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    *simplex = order.iter().map(|&i| simplex[i].clone()).collect();
    *values = order.iter().map(|&i| values[i]).collect();
}

/// Largest coordinate distance from a vertex to the first one.
fn simplex_size(simplex: &[Vec<f64>]) -> f64 {
    simplex[1..]
        .iter()
        .flat_map(|x| x.iter().zip(&simplex[0]).map(|(a, b)| (a - b).abs()))
        .fold(0.0, f64::max)
}
