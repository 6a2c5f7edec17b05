use anyhow::{Result, ensure};
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::trace;

use crate::sim::cancel::CancelToken;
use crate::sim::config::NeighbourhoodKind;
use crate::sim::simulator::{Automaton, ParameterSampler, PedestrianParameters};

use super::scenario::{Cell, Scenario, offsets};

/// How sharply pedestrians prefer cells closer to an exit.
const FIELD_SENSITIVITY: f64 = 4.0;

#[derive(Debug, Clone)]
struct Pedestrian {
    cell: usize,
    params: PedestrianParameters,
    exit_time: Option<f64>,
}

/// Floor-field cellular automaton.
///
/// One step lasts the time the fastest pedestrian needs to cross a cell. At
/// every step active pedestrians move in random order; each one attempts a
/// move with probability equal to its velocity factor and picks a free
/// neighbouring cell with probability proportional to
/// `exp(sensitivity * bias * gain - repulsion * crowding)`, where `gain` is
/// the floor field decrease in cells and `crowding` the occupied fraction of
/// the target's neighbourhood.
#[derive(Debug, Clone)]
pub struct CellularAutomaton {
    scenario: Scenario,
    neighbourhood: NeighbourhoodKind,
    time_limit: f64,
    time_step: f64,
    pedestrians: Vec<Pedestrian>,
    occupied: Vec<bool>,
    time: f64,
}

impl CellularAutomaton {
    pub fn new(
        scenario: Scenario,
        neighbourhood: NeighbourhoodKind,
        time_limit: f64,
        reference_velocity: f64,
    ) -> Result<Self> {
        ensure!(
            time_limit.is_finite() && time_limit > 0.0,
            "Time limit must be positive, got {time_limit}"
        );
        ensure!(
            reference_velocity.is_finite() && reference_velocity > 0.0,
            "Reference velocity must be positive, got {reference_velocity}"
        );
        let time_step = scenario.cell_dimension() / reference_velocity;
        let occupied = vec![false; scenario.num_cells()];
        Ok(Self {
            scenario,
            neighbourhood,
            time_limit,
            time_step,
            pedestrians: vec![],
            occupied,
            time: 0.0,
        })
    }

    /// Simulated seconds elapsed since the last reset.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn num_pedestrians(&self) -> usize {
        self.pedestrians.len()
    }

    fn choose_move(&self, cell: usize, params: &PedestrianParameters, rng: &mut StdRng) -> Option<usize> {
        let here = self.scenario.floor_field(cell);
        if !here.is_finite() {
            return None;
        }
        let cd = self.scenario.cell_dimension();
        let steps = offsets(self.neighbourhood);

        let mut targets = Vec::with_capacity(steps.len());
        let mut weights = Vec::with_capacity(steps.len());
        for &(dr, dc) in steps {
            let Some(next) = self.scenario.neighbour(cell, dr, dc) else {
                continue;
            };
            if self.occupied[next] || self.scenario.cell(next) == Cell::Blocked {
                continue;
            }
            let field = self.scenario.floor_field(next);
            if !field.is_finite() {
                continue;
            }
            let gain = (here - field) / cd;
            let crowded = steps
                .iter()
                .filter_map(|&(r, c)| self.scenario.neighbour(next, r, c))
                .filter(|&n| n != cell && self.occupied[n])
                .count() as f64
                / steps.len() as f64;
            targets.push(next);
            weights.push(
                (FIELD_SENSITIVITY * params.attraction_bias * gain
                    - params.crowd_repulsion * crowded)
                    .exp(),
            );
        }

        let choice = WeightedIndex::new(&weights).ok()?;
        Some(targets[choice.sample(rng)])
    }
}

impl Automaton for CellularAutomaton {
    fn reset(&mut self) {
        self.pedestrians.clear();
        self.occupied.iter_mut().for_each(|o| *o = false);
        self.time = 0.0;
    }

    fn add_pedestrians_uniformly(
        &mut self,
        count: usize,
        sampler: &ParameterSampler,
        rng: &mut StdRng,
    ) -> Result<()> {
        let free: Vec<usize> = (0..self.scenario.num_cells())
            .filter(|&i| self.scenario.cell(i) == Cell::Free && !self.occupied[i])
            .collect();
        ensure!(
            count <= free.len(),
            "Cannot place {count} pedestrians in {} free cells",
            free.len()
        );

        let chosen = rand::seq::index::sample(rng, free.len(), count);
        for k in chosen.iter() {
            let cell = free[k];
            self.occupied[cell] = true;
            self.pedestrians.push(Pedestrian {
                cell,
                params: sampler(&mut *rng),
                exit_time: None,
            });
        }
        Ok(())
    }

    fn run(&mut self, rng: &mut StdRng, cancel: &CancelToken) -> Result<()> {
        let max_steps = (self.time_limit / self.time_step).floor() as usize;
        let mut order = Vec::with_capacity(self.pedestrians.len());

        for step in 0..max_steps {
            cancel.check()?;
            order.clear();
            order.extend((0..self.pedestrians.len()).filter(|&i| self.pedestrians[i].exit_time.is_none()));
            if order.is_empty() {
                break;
            }
            order.shuffle(rng);

            let now = (step + 1) as f64 * self.time_step;
            for &i in &order {
                let Pedestrian { cell, params, .. } = self.pedestrians[i].clone();
                let roll: f64 = rng.gen_range(0.0..1.0);
                if roll >= params.velocity_factor {
                    continue;
                }
                let Some(next) = self.choose_move(cell, &params, rng) else {
                    continue;
                };
                self.occupied[cell] = false;
                self.pedestrians[i].cell = next;
                if self.scenario.cell(next) == Cell::Exit {
                    self.pedestrians[i].exit_time = Some(now);
                } else {
                    self.occupied[next] = true;
                }
            }
            self.time = now;
        }

        trace!(
            time = self.time,
            remaining = self.number_of_non_evacuees(),
            "Cellular automaton finished"
        );
        Ok(())
    }

    fn number_of_non_evacuees(&self) -> usize {
        self.pedestrians
            .iter()
            .filter(|p| p.exit_time.is_none())
            .count()
    }

    fn distances_to_closest_exit(&self) -> Vec<f64> {
        self.pedestrians
            .iter()
            .filter(|p| p.exit_time.is_none())
            .map(|p| self.scenario.distance_to_closest_exit(p.cell))
            .collect()
    }

    fn evacuation_times(&self) -> Vec<f64> {
        self.pedestrians.iter().filter_map(|p| p.exit_time).collect()
    }
}
