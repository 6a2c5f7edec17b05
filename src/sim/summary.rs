use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sim::simulator::Automaton;
use crate::vecutils;

/// Outcome of one simulation run.
///
/// When somebody did not get out, only the distance statistics are set;
/// otherwise only the time statistics are.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub non_evacuees: usize,
    pub min_distance: f64,
    pub mean_distance: f64,
    pub max_time: f64,
    pub mean_time: f64,
}

impl SimulationSummary {
    pub fn from_automaton(automaton: &impl Automaton) -> Self {
        let non_evacuees = automaton.number_of_non_evacuees();
        if non_evacuees > 0 {
            let distances = automaton.distances_to_closest_exit();
            Self {
                non_evacuees,
                min_distance: vecutils::min(&distances),
                mean_distance: vecutils::mean(&distances),
                ..Self::default()
            }
        } else {
            let times = automaton.evacuation_times();
            Self {
                max_time: vecutils::max(&times),
                mean_time: vecutils::mean(&times),
                ..Self::default()
            }
        }
    }

    /// Scalar harm of this run, lower is better.
    ///
    /// Any non-evacuee outweighs a complete evacuation: the distance terms are
    /// scaled by the domain `diameter` and the time terms by `time_limit`.
    pub fn fitness(&self, diameter: f64, time_limit: f64) -> f64 {
        if self.non_evacuees > 0 {
            self.non_evacuees as f64
                + self.min_distance / diameter
                + self.mean_distance / (diameter * diameter)
        } else {
            self.max_time / time_limit + self.mean_time / (time_limit * time_limit)
        }
    }
}

impl fmt::Display for SimulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(2);
        if self.non_evacuees > 0 {
            write!(
                f,
                "SimulationSummary(non_evacuees={}, min_distance={:.*}, mean_distance={:.*})",
                self.non_evacuees, prec, self.min_distance, prec, self.mean_distance
            )
        } else {
            write!(
                f,
                "SimulationSummary(max_time={:.*}, mean_time={:.*})",
                prec, self.max_time, prec, self.mean_time
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trapped(n: usize, min_d: f64, mean_d: f64) -> SimulationSummary {
        SimulationSummary {
            non_evacuees: n,
            min_distance: min_d,
            mean_distance: mean_d,
            ..SimulationSummary::default()
        }
    }

    #[test]
    fn test_fitness_of_complete_evacuation() {
        let s = SimulationSummary {
            max_time: 60.0,
            mean_time: 30.0,
            ..SimulationSummary::default()
        };
        let f = s.fitness(10.0, 600.0);
        assert!((f - (0.1 + 30.0 / 360000.0)).abs() < 1e-12);
        assert!(f < 1.0);
    }

    #[test]
    fn test_fitness_grows_with_non_evacuees() {
        let diameter = 5.0_f64.hypot(10.0);
        let mut previous = 0.0;
        for n in 1..6 {
            // Distances are bounded by the diameter
            let f = trapped(n, 0.5 * diameter, 0.7 * diameter).fitness(diameter, 600.0);
            assert!(f > previous, "fitness {f} with {n} non-evacuees");
            previous = f;
        }
        let evacuated = SimulationSummary {
            max_time: 599.0,
            mean_time: 599.0,
            ..SimulationSummary::default()
        };
        assert!(evacuated.fitness(diameter, 600.0) < trapped(1, 0.0, 0.0).fitness(diameter, 600.0));
    }

    #[test]
    fn test_display() {
        let s = trapped(2, 1.0, 1.5);
        assert_eq!(
            format!("{s}"),
            "SimulationSummary(non_evacuees=2, min_distance=1.00, mean_distance=1.50)"
        );
    }
}
