use navtune::config::Config;
use navtune::evaluation::scenario::Scenario;
use navtune::evaluation::ScenarioEvaluator;
use navtune::evolution::{EvolutionEngine, Observer};
use navtune::export::{best_individual_path, write_best_individual, FileObserver, LogObserver};
use navtune::sim::OrcaFactory;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::process;

fn main() {
    env_logger::init();
    log::info!("Booting navtune...");

    // 1. Load and validate configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = match Config::load(Path::new(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = config.validate() {
        log::error!("Invalid configuration: {}", e);
        process::exit(1);
    }
    log::info!("Configuration loaded and validated.");

    // 2. Resolve the scenario and bounds
    let scenario = match Scenario::by_name(&config.simulation.scenario) {
        Some(s) => s,
        None => {
            log::error!("Unknown scenario '{}'.", config.simulation.scenario);
            process::exit(1);
        }
    };
    let bounds = match config.bounds() {
        Ok(b) => b,
        Err(e) => {
            log::error!("Invalid bounds: {}", e);
            process::exit(1);
        }
    };
    let run_label = scenario.name;
    log::info!("Optimizing avoidance parameters for '{}'.", run_label);

    // 3. Wire up evaluator, observers and engine
    let output_dir = Path::new(&config.output.directory);
    let file_observer = match FileObserver::create(output_dir, run_label) {
        Ok(o) => o,
        Err(e) => {
            log::error!("Failed to create artifact files: {}", e);
            process::exit(1);
        }
    };
    let observers: Vec<Box<dyn Observer>> = vec![Box::new(LogObserver), Box::new(file_observer)];
    let evaluator = ScenarioEvaluator::new(scenario, config.simulation.time_step, OrcaFactory);
    let rng = match config.ga.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut engine = match EvolutionEngine::new(&config.ga, bounds, &evaluator, observers, rng) {
        Ok(e) => e,
        Err(e) => {
            log::error!("Failed to build the evolution engine: {}", e);
            process::exit(1);
        }
    };

    // 4. Run the evolution
    log::info!("--- Starting Evolution ---");
    let final_population = match engine.evolve() {
        Ok(p) => p,
        Err(e) => {
            log::error!("Evolution run aborted: {}", e);
            process::exit(1);
        }
    };

    // 5. Persist the fittest candidate
    let best = match final_population.first() {
        Some(b) => b,
        None => {
            log::error!("Evolution returned an empty population.");
            process::exit(1);
        }
    };
    log::info!(
        "Fittest individual: {:?} with fitness {:.4}",
        best.chromosome.genes(),
        best.fitness.unwrap_or(f64::INFINITY)
    );
    let best_path = best_individual_path(output_dir, run_label);
    if let Err(e) = write_best_individual(&best_path, best) {
        log::error!("Failed to write the best individual: {}", e);
        process::exit(1);
    }
    log::info!("Best individual written to '{}'.", best_path.display());
}
