use crate::evaluation::scenario::Scenario;
use crate::evolution::bounds::{Bounds, BoundsError};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid bounds: {0}")]
    Bounds(#[from] BoundsError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ga: GaConfig,
    pub bounds: BoundsConfig,
    pub simulation: SimulationConfig,
    pub output: OutputConfig,
}

/// Evolutionary-search parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct GaConfig {
    pub population_size: usize,
    pub max_evaluations: usize,
    pub num_selected: usize,
    pub tournament_size: usize,
    pub num_elites: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub mutation_stdev: f64,
    /// Fixed seed for reproducible runs; absent means OS entropy.
    pub seed: Option<u64>,
}

/// Per-gene box constraints, lower and upper.
#[derive(Debug, Clone, Deserialize)]
pub struct BoundsConfig {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// One of the named obstacle layouts.
    pub scenario: String,
    pub time_step: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the CSV artifacts.
    pub directory: String,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Fails fast on anything that would corrupt a run: malformed bounds,
    /// nonsense rates, an unknown scenario or a degenerate time step.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ga = &self.ga;
        if ga.population_size == 0 {
            return Err(ConfigError::Invalid("population_size must be > 0".into()));
        }
        if ga.max_evaluations == 0 {
            return Err(ConfigError::Invalid("max_evaluations must be > 0".into()));
        }
        if ga.tournament_size == 0 {
            return Err(ConfigError::Invalid("tournament_size must be > 0".into()));
        }
        if ga.num_elites >= ga.population_size {
            return Err(ConfigError::Invalid(format!(
                "num_elites ({}) must be smaller than population_size ({})",
                ga.num_elites, ga.population_size
            )));
        }
        if ga.num_selected < ga.population_size - ga.num_elites {
            return Err(ConfigError::Invalid(format!(
                "num_selected ({}) yields too few offspring to refill the population",
                ga.num_selected
            )));
        }
        for (name, rate) in [
            ("crossover_rate", ga.crossover_rate),
            ("mutation_rate", ga.mutation_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must lie in [0, 1], got {rate}"
                )));
            }
        }
        if !ga.mutation_stdev.is_finite() || ga.mutation_stdev < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "mutation_stdev must be a finite non-negative number, got {}",
                ga.mutation_stdev
            )));
        }

        self.bounds()?;

        if Scenario::by_name(&self.simulation.scenario).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown scenario '{}', expected one of {:?}",
                self.simulation.scenario,
                Scenario::names()
            )));
        }
        let time_step = self.simulation.time_step;
        if !time_step.is_finite() || time_step <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "time_step must be positive, got {time_step}"
            )));
        }
        if (time_step * 100_000.0).floor() < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "time_step {time_step} leaves no simulation iterations"
            )));
        }
        Ok(())
    }

    /// The validated box constraints for the five genes.
    pub fn bounds(&self) -> Result<Bounds, ConfigError> {
        Ok(Bounds::new(&self.bounds.lower, &self.bounds.upper)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    const VALID_CONFIG: &str = r#"
[ga]
population_size = 100
max_evaluations = 100000
num_selected = 100
tournament_size = 4
num_elites = 1
crossover_rate = 0.6
mutation_rate = 0.4
mutation_stdev = 1.0
seed = 42

[bounds]
lower = [0.1, 1.0, 0.1, 0.1, 0.5]
upper = [5.0, 3.0, 10.0, 10.0, 5.0]

[simulation]
scenario = "scenario4"
time_step = 0.016666666666666666

[output]
directory = "."
"#;

    fn parse(content: &str) -> Config {
        toml::from_str(content).unwrap()
    }

    #[test]
    fn test_load_and_validate_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{VALID_CONFIG}").unwrap();

        let config = Config::load(&path).unwrap();
        config.validate().unwrap();
        assert_eq!(config.ga.population_size, 100);
        assert_eq!(config.ga.seed, Some(42));
        assert_eq!(config.simulation.scenario, "scenario4");
        assert_eq!(config.bounds().unwrap().lower()[0], 0.1);
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let result = Config::load(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_inverted_bounds_are_rejected() {
        let mut config = parse(VALID_CONFIG);
        config.bounds.lower[2] = 20.0;
        assert!(matches!(config.validate(), Err(ConfigError::Bounds(_))));
    }

    #[test]
    fn test_bound_arity_is_checked() {
        let mut config = parse(VALID_CONFIG);
        config.bounds.upper.pop();
        assert!(matches!(config.validate(), Err(ConfigError::Bounds(_))));
    }

    #[test]
    fn test_unknown_scenario_is_rejected() {
        let mut config = parse(VALID_CONFIG);
        config.simulation.scenario = "scenario9".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rates_outside_unit_interval_are_rejected() {
        let mut config = parse(VALID_CONFIG);
        config.ga.crossover_rate = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_elite_count_must_leave_room_for_offspring() {
        let mut config = parse(VALID_CONFIG);
        config.ga.num_elites = 100;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_degenerate_time_step_is_rejected() {
        let mut config = parse(VALID_CONFIG);
        config.simulation.time_step = 1e-6;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
