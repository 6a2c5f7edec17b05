//! Cheap deterministic simulator for unit tests of the search layer.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use rand::rngs::StdRng;

use crate::domain::{Domain, DomainView};
use crate::opt::problem::{ExitPlacementConfig, ExitPlacementProblem};
use crate::sim::cancel::CancelToken;
use crate::sim::config::{FloorFieldKind, Interval, NeighbourhoodKind, SimulationConfig};
use crate::sim::simulator::{Automaton, ParameterSampler, Simulator};

/// Everybody leaves; the evacuation takes `1 + distance` seconds, `distance`
/// being how far the closest access center lies from `target`.
pub struct Beacon {
    pub target: (f64, f64),
    pub scenarios_built: AtomicUsize,
}

impl Beacon {
    pub fn new(target: (f64, f64)) -> Self {
        Self {
            target,
            scenarios_built: AtomicUsize::new(0),
        }
    }
}

pub struct BeaconRun {
    time: f64,
    count: usize,
}

impl Simulator for Beacon {
    type Scenario = f64;
    type Automaton = BeaconRun;

    fn build_scenario(&self, view: &DomainView, _: f64, _: FloorFieldKind) -> Result<f64> {
        self.scenarios_built.fetch_add(1, Ordering::Relaxed);
        let (tx, ty) = self.target;
        Ok(view
            .accesses()
            .map(|a| {
                let cx = a.shape.left + 0.5 * a.shape.width;
                let cy = a.shape.bottom + 0.5 * a.shape.height;
                (cx - tx).hypot(cy - ty)
            })
            .fold(view.width().hypot(view.height()), f64::min))
    }

    fn build_automaton(&self, scenario: &f64, _: NeighbourhoodKind, _: f64, _: f64) -> Result<BeaconRun> {
        Ok(BeaconRun {
            time: 1.0 + scenario,
            count: 0,
        })
    }
}

impl Automaton for BeaconRun {
    fn reset(&mut self) {
        self.count = 0;
    }

    fn add_pedestrians_uniformly(&mut self, count: usize, _: &ParameterSampler, _: &mut StdRng) -> Result<()> {
        self.count = count;
        Ok(())
    }

    fn run(&mut self, _: &mut StdRng, cancel: &CancelToken) -> Result<()> {
        cancel.check()
    }

    fn number_of_non_evacuees(&self) -> usize {
        0
    }

    fn distances_to_closest_exit(&self) -> Vec<f64> {
        vec![]
    }

    fn evacuation_times(&self) -> Vec<f64> {
        vec![self.time; self.count]
    }
}

/// A 20x10 domain without accesses, scored by a beacon at `target`.
pub fn beacon_problem(target: (f64, f64), num_exits: usize) -> ExitPlacementProblem<Beacon> {
    let domain = Domain::new("beacon", 20.0, 10.0).unwrap();
    let mut simulation = SimulationConfig::new();
    simulation.num_simulations = 2;
    simulation.crowd.num_pedestrians = Interval::new(5, 5);
    let mut config = ExitPlacementConfig::new();
    config.num_exits = num_exits;
    ExitPlacementProblem::new(Beacon::new(target), domain, simulation, config).unwrap()
}
