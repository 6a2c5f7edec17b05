use anyhow::{Result, ensure};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ObjectiveFunction, SearchResult, clamp_to_bounds, random_point};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookeJeevesConfig {
    pub budget: u64,
    pub max_iterations: usize,
    pub initial_step: f64,
    /// Restart from a random point once the step falls below this.
    pub min_step: f64,
    /// Factor applied to the step after a failed exploration.
    pub step_reduction: f64,
}

impl HookeJeevesConfig {
    pub fn new() -> Self {
        Self {
            budget: 500,
            max_iterations: 100_000,
            initial_step: 0.1,
            min_step: 1e-3,
            step_reduction: 0.5,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.initial_step > 0.0 && self.min_step > 0.0,
            "Steps must be positive"
        );
        ensure!(
            self.min_step <= self.initial_step,
            "minStep cannot exceed initialStep"
        );
        ensure!(
            0.0 < self.step_reduction && self.step_reduction < 1.0,
            "stepReduction must lie in (0, 1)"
        );
        Ok(())
    }
}

impl Default for HookeJeevesConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Hooke-Jeeves pattern search with random restarts.
///
/// Exploratory moves try `+step` then `-step` on each coordinate; a successful
/// exploration is followed by pattern moves along the improving direction.
pub struct HookeJeeves {
    config: HookeJeevesConfig,
}

impl HookeJeeves {
    pub fn new(config: HookeJeevesConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run<F: ObjectiveFunction + ?Sized>(
        &self,
        objective: &F,
        rng: &mut StdRng,
    ) -> Result<SearchResult> {
        let c = &self.config;
        let mut best: Option<(Vec<f64>, f64)> = None;
        let mut iterations = 0;

        while objective.cost() < c.budget && iterations < c.max_iterations {
            let mut x = random_point(objective, rng);
            let mut fx = objective.evaluate(&x)?;
            let mut step = c.initial_step;

            while step >= c.min_step && objective.cost() < c.budget && iterations < c.max_iterations
            {
                iterations += 1;
                let (mut y, mut fy) = self.explore(objective, &x, fx, step)?;
                if fy < fx {
                    loop {
                        let mut pattern: Vec<f64> =
                            y.iter().zip(&x).map(|(yi, xi)| 2.0 * yi - xi).collect();
                        clamp_to_bounds(objective, &mut pattern);
                        x = y;
                        fx = fy;
                        let fp = objective.evaluate(&pattern)?;
                        let (z, fz) = self.explore(objective, &pattern, fp, step)?;
                        if fz < fx && objective.cost() < c.budget {
                            y = z;
                            fy = fz;
                        } else {
                            if fz < fx {
                                x = z;
                                fx = fz;
                            }
                            break;
                        }
                    }
                } else {
                    step *= c.step_reduction;
                }
            }

            if best.as_ref().is_none_or(|(_, f)| fx < *f) {
                info!(fitness = fx, cost = objective.cost(), "Hooke-Jeeves improved");
                best = Some((x, fx));
            }
            debug!(cost = objective.cost(), "Hooke-Jeeves restart");
        }

        let (best, fitness) = best.unwrap_or_else(|| (vec![], f64::INFINITY));
        Ok(SearchResult {
            best,
            fitness,
            cost: objective.cost(),
            iterations,
        })
    }

    fn explore<F: ObjectiveFunction + ?Sized>(
        &self,
        objective: &F,
        base: &[f64],
        f_base: f64,
        step: f64,
    ) -> Result<(Vec<f64>, f64)> {
        let mut x = base.to_vec();
        let mut fx = f_base;
        for i in 0..x.len() {
            let (lo, hi) = objective.bounds(i);
            let original = x[i];
            let mut improved = false;
            for candidate in [original + step, original - step] {
                let candidate = candidate.clamp(lo, hi);
                if candidate == original {
                    continue;
                }
                x[i] = candidate;
                let f = objective.evaluate(&x)?;
                if f < fx {
                    fx = f;
                    improved = true;
                    break;
                }
            }
            if !improved {
                x[i] = original;
            }
        }
        Ok((x, fx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::testing::Sphere;
    use rand::SeedableRng;

    #[test]
    fn test_minimizes_sphere() {
        let sphere = Sphere::new(vec![0.25, 0.6]);
        let hj = HookeJeeves::new(HookeJeevesConfig::new()).unwrap();
        let result = hj.run(&sphere, &mut StdRng::seed_from_u64(0)).unwrap();
        assert!(result.fitness < 1e-5, "fitness {}", result.fitness);
        assert_eq!(result.best.len(), 2);
    }

    #[test]
    fn test_explore_moves_toward_optimum() {
        let sphere = Sphere::new(vec![0.5, 0.5]);
        let hj = HookeJeeves::new(HookeJeevesConfig::new()).unwrap();
        let base = vec![0.3, 0.5];
        let f = sphere.evaluate(&base).unwrap();
        let (x, fx) = hj.explore(&sphere, &base, f, 0.1).unwrap();
        assert!((x[0] - 0.4).abs() < 1e-12);
        assert!((x[1] - 0.5).abs() < 1e-12);
        assert!(fx < f);
    }

    #[test]
    fn test_rejects_bad_config() {
        let mut config = HookeJeevesConfig::new();
        config.min_step = 1.0;
        assert!(HookeJeeves::new(config).is_err());
    }
}
