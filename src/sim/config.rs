use anyhow::{Context, Result, ensure};
use rand::Rng;
use rand::distributions::uniform::SampleUniform;
use serde::{Deserialize, Serialize};

/// Pedestrian simulator family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulatorKind {
    /// Cellular automaton on a square grid.
    #[serde(rename = "CA")]
    CellularAutomaton,
}

/// Static floor field guiding pedestrians towards exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloorFieldKind {
    /// Shortest walkable path, 8-connected (diagonal steps cost `sqrt(2)`).
    DijkstraStaticMoore,
    /// Shortest walkable path, 4-connected.
    DijkstraStaticVonNeumann,
    /// Manhattan distance to the nearest exit cell, ignoring obstacles.
    ManhattanStatic,
}

/// Cells a pedestrian may step into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeighbourhoodKind {
    Moore,
    VonNeumann,
}

/// Closed interval `[min, max]`, written as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[T; 2]", into = "[T; 2]")]
pub struct Interval<T: Copy> {
    pub min: T,
    pub max: T,
}

impl<T: Copy> Interval<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: Copy> From<[T; 2]> for Interval<T> {
    fn from(pair: [T; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl<T: Copy> From<Interval<T>> for [T; 2] {
    fn from(interval: Interval<T>) -> Self {
        [interval.min, interval.max]
    }
}

impl Interval<f64> {
    /// Samples from `[min, max)`. A degenerate interval always yields `min`.
    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        sample_half_open(self.min, self.max, rng)
    }
}

impl Interval<usize> {
    /// Samples from `[min, max]`, both ends included.
    pub fn sample(&self, rng: &mut impl Rng) -> usize {
        if self.min == self.max {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }
}

fn sample_half_open<T: SampleUniform + PartialOrd + Copy>(l: T, u: T, rng: &mut impl Rng) -> T {
    if l < u { rng.gen_range(l..u) } else { l }
}

/// Size and behaviour of the simulated crowd.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrowdConfig {
    /// Speed of the fastest pedestrian in m/s.
    pub pedestrian_reference_velocity: f64,
    pub num_pedestrians: Interval<usize>,
    /// Strength of the pull of the floor field.
    pub attraction_bias: Interval<f64>,
    /// Reluctance to step next to other pedestrians.
    pub crowd_repulsion: Interval<f64>,
    /// Fraction of the reference velocity, in `[0, 1]`.
    pub velocity_factor: Interval<f64>,
}

impl CrowdConfig {
    pub fn new() -> Self {
        Self {
            pedestrian_reference_velocity: 1.3,
            num_pedestrians: Interval::new(100, 150),
            attraction_bias: Interval::new(0.65, 1.0),
            crowd_repulsion: Interval::new(1.0, 1.5),
            velocity_factor: Interval::new(0.5, 1.0),
        }
    }
}

impl Default for CrowdConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration of the pedestrian simulations run per evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    /// Base seed; simulation `i` of every evaluation uses `seed + i`.
    pub seed: u64,
    /// Independent simulations per evaluation.
    pub num_simulations: usize,
    pub simulator_type: SimulatorKind,
    /// Simulated seconds after which remaining pedestrians count as non-evacuees.
    pub time_limit: f64,
    /// Side of a square automaton cell in meters.
    pub cell_dimension: f64,
    pub floor_field: FloorFieldKind,
    pub neighbourhood: NeighbourhoodKind,
    pub crowd: CrowdConfig,
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self {
            seed: 1,
            num_simulations: 10,
            simulator_type: SimulatorKind::CellularAutomaton,
            time_limit: 600.0,
            cell_dimension: 0.4,
            floor_field: FloorFieldKind::DijkstraStaticMoore,
            neighbourhood: NeighbourhoodKind::Moore,
            crowd: CrowdConfig::new(),
        }
    }

    /// Rejects configurations that cannot describe a simulation.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.num_simulations >= 1,
            "numSimulations must be at least 1"
        );
        ensure!(
            self.time_limit.is_finite() && self.time_limit > 0.0,
            "timeLimit must be positive, got {}",
            self.time_limit
        );
        ensure!(
            self.cell_dimension.is_finite() && self.cell_dimension > 0.0,
            "cellDimension must be positive, got {}",
            self.cell_dimension
        );

        let crowd = &self.crowd;
        ensure!(
            crowd.pedestrian_reference_velocity.is_finite()
                && crowd.pedestrian_reference_velocity > 0.0,
            "pedestrianReferenceVelocity must be positive, got {}",
            crowd.pedestrian_reference_velocity
        );
        ensure!(
            crowd.num_pedestrians.min <= crowd.num_pedestrians.max,
            "numPedestrians interval is inverted: [{}, {}]",
            crowd.num_pedestrians.min,
            crowd.num_pedestrians.max
        );
        for (name, interval) in [
            ("attractionBias", crowd.attraction_bias),
            ("crowdRepulsion", crowd.crowd_repulsion),
            ("velocityFactor", crowd.velocity_factor),
        ] {
            ensure!(
                interval.min.is_finite() && interval.max.is_finite(),
                "{name} interval must be finite"
            );
            ensure!(
                0.0 <= interval.min && interval.min <= interval.max,
                "{name} interval is malformed: [{}, {}]",
                interval.min,
                interval.max
            );
        }
        ensure!(
            crowd.velocity_factor.max <= 1.0,
            "velocityFactor cannot exceed 1, got {}",
            crowd.velocity_factor.max
        );
        Ok(())
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).context("Failed to parse simulation configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize simulation configuration")
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_config_defaults_are_valid() {
        let config = SimulationConfig::new();
        assert_eq!(config.num_simulations, 10);
        assert!((config.time_limit - 600.0).abs() < 1e-10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_interval() {
        let mut config = SimulationConfig::new();
        config.crowd.attraction_bias = Interval::new(1.0, 0.5);
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::new();
        config.crowd.num_pedestrians = Interval::new(10, 5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_simulations() {
        let mut config = SimulationConfig::new();
        config.num_simulations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_uses_original_names() {
        let json = r#"{
            "seed": 7,
            "numSimulations": 3,
            "simulatorType": "CA",
            "timeLimit": 300.0,
            "cellDimension": 0.4,
            "floorField": "ManhattanStatic",
            "neighbourhood": "VonNeumann",
            "crowd": {
                "pedestrianReferenceVelocity": 1.3,
                "numPedestrians": [20, 30],
                "attractionBias": [0.6, 1.0],
                "crowdRepulsion": [1.0, 1.0],
                "velocityFactor": [0.5, 1.0]
            }
        }"#;
        let config = SimulationConfig::from_json_str(json).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.floor_field, FloorFieldKind::ManhattanStatic);
        assert_eq!(config.neighbourhood, NeighbourhoodKind::VonNeumann);
        assert_eq!(config.crowd.num_pedestrians, Interval::new(20, 30));

        let back = SimulationConfig::from_json_str(&config.to_json_string().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_unknown_floor_field_is_rejected() {
        let mut value = serde_json::to_value(SimulationConfig::new()).unwrap();
        value["floorField"] = serde_json::Value::from("Teleport");
        assert!(SimulationConfig::from_json_str(&value.to_string()).is_err());
    }

    #[test]
    fn test_interval_sampling() {
        let mut rng = StdRng::seed_from_u64(3);
        let fixed = Interval::new(1.5, 1.5);
        assert_eq!(fixed.sample(&mut rng), 1.5);
        let range = Interval::new(0.2, 0.4);
        for _ in 0..100 {
            let x = range.sample(&mut rng);
            assert!((0.2..0.4).contains(&x));
        }
        let count = Interval::new(3_usize, 4);
        for _ in 0..100 {
            let n = count.sample(&mut rng);
            assert!(n == 3 || n == 4);
        }
    }
}
