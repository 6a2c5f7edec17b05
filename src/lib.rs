pub mod domain;
pub mod geom;
pub mod opt;
pub mod search;
pub mod sim;
pub mod vecutils;

// Prelude
pub use domain::{Access, Domain, DomainView};
pub use geom::aperture::ApertureDecoder;
pub use geom::perimeter::Perimeter;
pub use geom::rectangle::Rectangle;
pub use opt::evaluator::{Aggregation, SimulationEvaluator};
pub use opt::greedy::GreedyPlacement;
pub use opt::problem::{ExitPlacementConfig, ExitPlacementProblem};
pub use sim::cellular::CellularSimulator;
pub use sim::config::SimulationConfig;
