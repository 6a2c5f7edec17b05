//! Reference pedestrian simulator: a floor-field cellular automaton on a square grid.

pub mod automaton;
pub mod floor_field;
pub mod scenario;

use anyhow::Result;

use crate::domain::DomainView;
use crate::sim::config::{FloorFieldKind, NeighbourhoodKind};
use crate::sim::simulator::Simulator;

pub use automaton::CellularAutomaton;
pub use scenario::{Cell, Scenario};

#[derive(Debug, Clone, Copy, Default)]
pub struct CellularSimulator;

impl Simulator for CellularSimulator {
    type Scenario = Scenario;
    type Automaton = CellularAutomaton;

    fn build_scenario(
        &self,
        view: &DomainView,
        cell_dimension: f64,
        floor_field: FloorFieldKind,
    ) -> Result<Scenario> {
        Scenario::new(view, cell_dimension, floor_field)
    }

    fn build_automaton(
        &self,
        scenario: &Scenario,
        neighbourhood: NeighbourhoodKind,
        time_limit: f64,
        reference_velocity: f64,
    ) -> Result<CellularAutomaton> {
        CellularAutomaton::new(
            scenario.clone(),
            neighbourhood,
            time_limit,
            reference_velocity,
        )
    }
}
