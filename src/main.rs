use std::sync::Arc;

use anyhow::Result;
use egress::opt::diversity::circular_set_diversity;
use egress::opt::operators::{GreedyOperatorConfig, GreedyOperators};
use egress::search::{EvolutionConfig, EvolutionaryAlgorithm, ObjectiveFunction};
use egress::{
    Access, CellularSimulator, Domain, ExitPlacementConfig, ExitPlacementProblem, GreedyPlacement,
    Rectangle, SimulationConfig,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("egress=info".parse()?))
        .init();

    // Hall with two pillars and a main door on the bottom wall
    let domain = Domain::new("hall", 50.0, 25.0)?
        .with_obstacle(Rectangle::new(15.0, 10.0, 2.0, 5.0))?
        .with_obstacle(Rectangle::new(33.0, 10.0, 2.0, 5.0))?
        .with_access(Access::new(0, "main door", Rectangle::new(24.0, 0.0, 2.0, 0.1)));

    let mut simulation = SimulationConfig::new();
    simulation.num_simulations = 5;
    simulation.time_limit = 120.0;
    let mut placement = ExitPlacementConfig::new();
    placement.aperture_width = 2.5;

    let problem = Arc::new(ExitPlacementProblem::new(
        CellularSimulator,
        domain,
        simulation,
        placement,
    )?);
    let mut rng = StdRng::seed_from_u64(1);

    // Greedy construction
    let greedy = GreedyPlacement::new(&problem).place_all(problem.num_exits(), &mut rng)?;
    let fitness = problem.evaluate(&greedy)?;
    info!(fitness, cost = problem.cost(), "Greedy solution");
    for access in problem.decode(&greedy) {
        println!("{}: {:.1}", access.name, access.shape);
    }

    // Memetic refinement, starting from the greedy cost
    let mut config = EvolutionConfig::new();
    config.budget = problem.cost() + 200;
    let operators = GreedyOperators::new(problem.clone(), GreedyOperatorConfig::new())?;
    let ea = EvolutionaryAlgorithm::new(config, Box::new(operators))?
        .with_diversity(Box::new(|pop: &[Vec<f64>]| circular_set_diversity(pop, 1.0)));
    let result = ea.run(problem.as_ref(), &mut rng)?;
    info!(
        fitness = result.fitness,
        cost = result.cost,
        cache_hits = problem.cache().hits(),
        "Evolutionary search finished"
    );

    for summary in problem.simulate(&result.best, 20)? {
        println!("{summary:.2}");
    }
    Ok(())
}
