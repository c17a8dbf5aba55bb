pub mod bounds;

use crate::chromosome::{Chromosome, GENE_COUNT};
use crate::config::GaConfig;
use self::bounds::Bounds;
use log::info;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::cmp::Ordering;
use thiserror::Error;

/// A chromosome together with its fitness, once evaluated.
/// Lower fitness is better.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub chromosome: Chromosome,
    pub fitness: Option<f64>,
}

impl Candidate {
    fn fitness_or_worst(&self) -> f64 {
        self.fitness.unwrap_or(f64::INFINITY)
    }
}

fn by_fitness(a: &Candidate, b: &Candidate) -> Ordering {
    a.fitness_or_worst()
        .partial_cmp(&b.fitness_or_worst())
        .unwrap_or(Ordering::Equal)
}

#[derive(Debug, Error)]
#[error("evaluation failed: {reason}")]
pub struct EvaluationError {
    pub reason: String,
}

/// Scores one chromosome. Implementations must be pure functions of the
/// chromosome so that a generation can be evaluated in parallel.
pub trait FitnessEvaluator: Sync {
    fn evaluate(&self, chromosome: &Chromosome) -> Result<f64, EvaluationError>;
}

/// Read-only per-generation callback for external statistics recording.
///
/// A failing observer aborts the whole run: continuing past one would
/// silently discard run data.
pub trait Observer {
    fn observe(
        &mut self,
        population: &[Candidate],
        generation: usize,
        evaluations: usize,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Debug, Error)]
pub enum EvolutionError {
    #[error("candidate evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
    #[error("observer failed at generation {generation}: {source}")]
    Observer {
        generation: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

/// Orchestrates the evolutionary run: evaluate, select, vary, bound,
/// replace, check termination. Owns the population and the run counters.
pub struct EvolutionEngine<'a, E: FitnessEvaluator> {
    config: &'a GaConfig,
    bounds: Bounds,
    evaluator: &'a E,
    observers: Vec<Box<dyn Observer>>,
    rng: StdRng,
    mutation_noise: Normal<f64>,
    population: Vec<Candidate>,
    generation: usize,
    evaluations: usize,
}

impl<'a, E: FitnessEvaluator> EvolutionEngine<'a, E> {
    pub fn new(
        config: &'a GaConfig,
        bounds: Bounds,
        evaluator: &'a E,
        observers: Vec<Box<dyn Observer>>,
        rng: StdRng,
    ) -> Result<Self, EvolutionError> {
        let mutation_noise = Normal::new(0.0, config.mutation_stdev).map_err(|e| {
            EvolutionError::InvalidConfig(format!("mutation stdev {}: {e}", config.mutation_stdev))
        })?;
        Ok(Self {
            config,
            bounds,
            evaluator,
            observers,
            rng,
            mutation_noise,
            population: Vec::with_capacity(config.population_size),
            generation: 0,
            evaluations: 0,
        })
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn population(&self) -> &[Candidate] {
        &self.population
    }

    /// Runs the evolution until the evaluation budget is exhausted and
    /// returns the final population sorted best-first.
    pub fn evolve(&mut self) -> Result<Vec<Candidate>, EvolutionError> {
        self.generation = 0;
        self.evaluations = 0;

        info!(
            "Initializing population of size {}...",
            self.config.population_size
        );
        let mut initial: Vec<Candidate> = (0..self.config.population_size)
            .map(|_| Candidate {
                chromosome: self.bounds.random(&mut self.rng),
                fitness: None,
            })
            .collect();
        self.evaluate_candidates(&mut initial)?;
        self.population = initial;
        self.log_generation();
        self.notify_observers()?;

        while self.evaluations < self.config.max_evaluations {
            let parents = self.select_parents();
            let mut offspring = self.breed(parents);
            self.evaluate_candidates(&mut offspring)?;
            self.replace(offspring);
            self.generation += 1;
            self.log_generation();
            self.notify_observers()?;
        }

        self.population.sort_by(by_fitness);
        info!(
            "Evolution complete after {} generations and {} evaluations.",
            self.generation, self.evaluations
        );
        Ok(self.population.clone())
    }

    /// Scores every unevaluated candidate. Evaluations within a generation
    /// are independent, so they run on the rayon pool; the collect below is
    /// the synchronization barrier the replacement step relies on.
    fn evaluate_candidates(&mut self, candidates: &mut [Candidate]) -> Result<(), EvolutionError> {
        let work: Vec<(usize, Chromosome)> = candidates
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.fitness.is_none().then_some((i, c.chromosome)))
            .collect();
        if work.is_empty() {
            return Ok(());
        }

        let evaluator = self.evaluator;
        let results: Result<Vec<(usize, f64)>, EvaluationError> = work
            .par_iter()
            .map(|(i, chromosome)| evaluator.evaluate(chromosome).map(|fitness| (*i, fitness)))
            .collect();

        for (i, fitness) in results? {
            candidates[i].fitness = Some(fitness);
        }
        self.evaluations += work.len();
        Ok(())
    }

    /// Tournament selection with replacement; ties go to the earlier draw.
    fn select_parents(&mut self) -> Vec<Candidate> {
        let mut parents = Vec::with_capacity(self.config.num_selected);
        for _ in 0..self.config.num_selected {
            let mut winner = self.rng.random_range(0..self.population.len());
            for _ in 1..self.config.tournament_size {
                let challenger = self.rng.random_range(0..self.population.len());
                if self.population[challenger].fitness_or_worst()
                    < self.population[winner].fitness_or_worst()
                {
                    winner = challenger;
                }
            }
            parents.push(self.population[winner].clone());
        }
        parents
    }

    /// Heuristic crossover per pair, then per-gene gaussian mutation, then
    /// bounding. A trailing unpaired parent passes through unmodified.
    fn breed(&mut self, parents: Vec<Candidate>) -> Vec<Candidate> {
        let mut raw = Vec::with_capacity(parents.len());
        for pair in parents.chunks(2) {
            match pair {
                [mom, dad] => {
                    if self.rng.random::<f64>() < self.config.crossover_rate {
                        let (first, second) = self.heuristic_crossover(mom, dad);
                        raw.push(first);
                        raw.push(second);
                    } else {
                        raw.push(mom.chromosome);
                        raw.push(dad.chromosome);
                    }
                }
                [single] => raw.push(single.chromosome),
                _ => {}
            }
        }

        let mut offspring = Vec::with_capacity(raw.len());
        for mut chromosome in raw {
            self.mutate(&mut chromosome);
            offspring.push(Candidate {
                chromosome: self.bounds.clamp(&chromosome),
                fitness: None,
            });
        }
        offspring
    }

    /// Each child gene interpolates from the worse parent toward the better
    /// one with a fresh mixing factor per gene.
    fn heuristic_crossover(&mut self, mom: &Candidate, dad: &Candidate) -> (Chromosome, Chromosome) {
        let (better, worse) = if by_fitness(mom, dad) != Ordering::Greater {
            (mom, dad)
        } else {
            (dad, mom)
        };

        let mut first = Chromosome([0.0; GENE_COUNT]);
        let mut second = Chromosome([0.0; GENE_COUNT]);
        for child in [&mut first, &mut second] {
            for i in 0..GENE_COUNT {
                let r: f64 = self.rng.random();
                child.0[i] =
                    worse.chromosome.0[i] + r * (better.chromosome.0[i] - worse.chromosome.0[i]);
            }
        }
        (first, second)
    }

    fn mutate(&mut self, chromosome: &mut Chromosome) {
        for gene in chromosome.0.iter_mut() {
            if self.rng.random::<f64>() < self.config.mutation_rate {
                *gene += self.mutation_noise.sample(&mut self.rng);
            }
        }
    }

    /// Generational replacement with elitism: the best `num_elites` of the
    /// current population survive unconditionally, the best offspring fill
    /// the remaining slots.
    fn replace(&mut self, mut offspring: Vec<Candidate>) {
        self.population.sort_by(by_fitness);
        offspring.sort_by(by_fitness);

        let mut next = Vec::with_capacity(self.config.population_size);
        next.extend(self.population.iter().take(self.config.num_elites).cloned());
        let remaining = self.config.population_size - next.len();
        next.extend(offspring.into_iter().take(remaining));
        debug_assert_eq!(next.len(), self.config.population_size);
        self.population = next;
    }

    fn log_generation(&self) {
        if let Some(best) = self.population.iter().min_by(|a, b| by_fitness(a, b)) {
            info!(
                "Gen {}: Best Fitness={:.4} | Evaluations={}",
                self.generation,
                best.fitness_or_worst(),
                self.evaluations
            );
        }
    }

    fn notify_observers(&mut self) -> Result<(), EvolutionError> {
        let generation = self.generation;
        let evaluations = self.evaluations;
        for observer in self.observers.iter_mut() {
            observer
                .observe(&self.population, generation, evaluations)
                .map_err(|source| EvolutionError::Observer { generation, source })?;
        }
        Ok(())
    }
}
