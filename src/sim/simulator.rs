use anyhow::Result;
use rand::Rng;
use rand::rngs::StdRng;

use crate::domain::DomainView;
use crate::sim::cancel::CancelToken;
use crate::sim::config::{CrowdConfig, FloorFieldKind, NeighbourhoodKind};

/// Behavioural parameters of a single pedestrian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PedestrianParameters {
    pub attraction_bias: f64,
    pub crowd_repulsion: f64,
    pub velocity_factor: f64,
}

impl PedestrianParameters {
    /// Draws every parameter independently from the crowd intervals.
    pub fn sample(crowd: &CrowdConfig, rng: &mut impl Rng) -> Self {
        Self {
            attraction_bias: crowd.attraction_bias.sample(rng),
            crowd_repulsion: crowd.crowd_repulsion.sample(rng),
            velocity_factor: crowd.velocity_factor.sample(rng),
        }
    }
}

/// Draws parameters for one pedestrian.
pub type ParameterSampler<'a> = dyn Fn(&mut StdRng) -> PedestrianParameters + 'a;

/// A pedestrian evacuation simulator.
///
/// A scenario is built once per domain view and is expensive (floor fields).
/// An automaton runs crowds on a scenario and is reset between runs.
pub trait Simulator: Send + Sync {
    type Scenario;
    type Automaton: Automaton;

    fn build_scenario(
        &self,
        view: &DomainView,
        cell_dimension: f64,
        floor_field: FloorFieldKind,
    ) -> Result<Self::Scenario>;

    fn build_automaton(
        &self,
        scenario: &Self::Scenario,
        neighbourhood: NeighbourhoodKind,
        time_limit: f64,
        reference_velocity: f64,
    ) -> Result<Self::Automaton>;
}

/// A runnable crowd on a fixed scenario.
pub trait Automaton {
    /// Removes all pedestrians and rewinds the clock.
    fn reset(&mut self);

    /// Places `count` pedestrians on distinct free cells chosen uniformly at random.
    fn add_pedestrians_uniformly(
        &mut self,
        count: usize,
        sampler: &ParameterSampler,
        rng: &mut StdRng,
    ) -> Result<()>;

    /// Advances until everyone has left or the time limit is reached.
    fn run(&mut self, rng: &mut StdRng, cancel: &CancelToken) -> Result<()>;

    fn number_of_non_evacuees(&self) -> usize;

    /// Distance from each non-evacuee to the closest exit, in meters.
    fn distances_to_closest_exit(&self) -> Vec<f64>;

    /// Evacuation time of each evacuee, in seconds.
    fn evacuation_times(&self) -> Vec<f64>;
}
