//! Run artifacts: per-generation statistics, per-individual records and the
//! final best-individual file, in the CSV layouts the downstream plotting
//! and replay tools consume.

use crate::evolution::{Candidate, Observer};
use chrono::Local;
use csv::Writer;
use log::info;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create artifact file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to write CSV record: {0}")]
    Csv(#[from] csv::Error),
}

/// Console statistics line, once per generation.
pub struct LogObserver;

impl Observer for LogObserver {
    fn observe(
        &mut self,
        population: &[Candidate],
        generation: usize,
        evaluations: usize,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let best = population
            .iter()
            .filter_map(|c| c.fitness)
            .fold(f64::INFINITY, f64::min);
        info!(
            "Generations: {}  Evaluations: {}  Best: {}",
            generation, evaluations, best
        );
        Ok(())
    }
}

/// Appends the statistics and individuals files each generation.
///
/// Statistics rows are `[generation, population_size, worst, best, median,
/// mean, stdev]` — the fitness-trend plotting reads the best fitness from
/// column index 3, so the column order is load-bearing. Individuals rows are
/// the five genes followed by the fitness.
pub struct FileObserver {
    statistics: Writer<File>,
    individuals: Writer<File>,
}

impl FileObserver {
    /// Creates both artifact files in `directory`, timestamped like the
    /// original tooling.
    pub fn create(directory: &Path, run_label: &str) -> Result<Self, ExportError> {
        let timestamp = Local::now().format("%Y_%m_%d_%H_%M_%S");
        let statistics = directory.join(format!("statistics_{run_label}_{timestamp}.csv"));
        let individuals = directory.join(format!("individuals_{run_label}_{timestamp}.csv"));
        Self::create_at(&statistics, &individuals)
    }

    pub fn create_at(statistics: &Path, individuals: &Path) -> Result<Self, ExportError> {
        Ok(Self {
            statistics: Writer::from_path(statistics)?,
            individuals: Writer::from_path(individuals)?,
        })
    }
}

impl Observer for FileObserver {
    fn observe(
        &mut self,
        population: &[Candidate],
        generation: usize,
        _evaluations: usize,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut fitnesses: Vec<f64> = population.iter().filter_map(|c| c.fitness).collect();
        if fitnesses.is_empty() {
            return Ok(());
        }
        fitnesses.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let best = fitnesses[0];
        let worst = fitnesses[fitnesses.len() - 1];
        let median = if fitnesses.len() % 2 == 0 {
            (fitnesses[fitnesses.len() / 2 - 1] + fitnesses[fitnesses.len() / 2]) / 2.0
        } else {
            fitnesses[fitnesses.len() / 2]
        };
        let mean = fitnesses.iter().sum::<f64>() / fitnesses.len() as f64;
        let variance = fitnesses
            .iter()
            .map(|f| (f - mean) * (f - mean))
            .sum::<f64>()
            / fitnesses.len() as f64;
        let stdev = variance.sqrt();

        self.statistics.write_record([
            generation.to_string(),
            population.len().to_string(),
            worst.to_string(),
            best.to_string(),
            median.to_string(),
            mean.to_string(),
            stdev.to_string(),
        ])?;
        self.statistics.flush()?;

        for candidate in population {
            let mut record: Vec<String> = candidate
                .chromosome
                .genes()
                .iter()
                .map(|g| g.to_string())
                .collect();
            record.push(candidate.fitness.unwrap_or(f64::INFINITY).to_string());
            self.individuals.write_record(&record)?;
        }
        self.individuals.flush()?;
        Ok(())
    }
}

/// Timestamped path for the best-individual artifact.
pub fn best_individual_path(directory: &Path, run_label: &str) -> PathBuf {
    let timestamp = Local::now().format("%Y_%m_%d_%H_%M_%S");
    directory.join(format!("best_individual_{run_label}_{timestamp}.csv"))
}

/// Writes the single-row artifact the replay tooling consumes: the five
/// genes of the fittest candidate.
pub fn write_best_individual(path: &Path, candidate: &Candidate) -> Result<(), ExportError> {
    let mut writer = Writer::from_path(path)?;
    let record: Vec<String> = candidate
        .chromosome
        .genes()
        .iter()
        .map(|g| g.to_string())
        .collect();
    writer.write_record(&record)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chromosome::Chromosome;
    use csv::ReaderBuilder;
    use tempfile::tempdir;

    fn candidate(genes: [f64; 5], fitness: f64) -> Candidate {
        Candidate {
            chromosome: Chromosome(genes),
            fitness: Some(fitness),
        }
    }

    fn test_population() -> Vec<Candidate> {
        vec![
            candidate([1.0, 2.0, 3.0, 4.0, 5.0], 2.5),
            candidate([0.5, 1.0, 1.5, 2.0, 2.5], 0.75),
            candidate([2.0, 2.0, 2.0, 2.0, 2.0], 4.0),
        ]
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(|f| f.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_statistics_row_carries_best_at_column_three() {
        let dir = tempdir().unwrap();
        let stats_path = dir.path().join("statistics.csv");
        let individuals_path = dir.path().join("individuals.csv");
        let mut observer = FileObserver::create_at(&stats_path, &individuals_path).unwrap();

        observer.observe(&test_population(), 0, 3).unwrap();
        observer.observe(&test_population(), 1, 6).unwrap();

        let rows = read_rows(&stats_path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "0");
        assert_eq!(rows[0][1], "3");
        assert_eq!(rows[0][2], "4"); // worst
        assert_eq!(rows[0][3], "0.75"); // best, read by the trend plots
        assert_eq!(rows[1][0], "1");
    }

    #[test]
    fn test_individuals_rows_are_genes_then_fitness() {
        let dir = tempdir().unwrap();
        let stats_path = dir.path().join("statistics.csv");
        let individuals_path = dir.path().join("individuals.csv");
        let mut observer = FileObserver::create_at(&stats_path, &individuals_path).unwrap();

        observer.observe(&test_population(), 0, 3).unwrap();

        let rows = read_rows(&individuals_path);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].len(), 6);
        assert_eq!(rows[0][0], "1");
        assert_eq!(rows[0][4], "5");
        assert_eq!(rows[0][5], "2.5");
    }

    #[test]
    fn test_best_individual_is_a_single_gene_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("best.csv");
        write_best_individual(&path, &candidate([1.25, 2.0, 7.5, 3.0, 4.5], 0.4)).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0],
            vec!["1.25", "2", "7.5", "3", "4.5"]
        );
    }

    #[test]
    fn test_unevaluated_population_writes_nothing() {
        let dir = tempdir().unwrap();
        let stats_path = dir.path().join("statistics.csv");
        let individuals_path = dir.path().join("individuals.csv");
        let mut observer = FileObserver::create_at(&stats_path, &individuals_path).unwrap();

        let unevaluated = vec![Candidate {
            chromosome: Chromosome([1.0; 5]),
            fitness: None,
        }];
        observer.observe(&unevaluated, 0, 0).unwrap();
        assert!(read_rows(&stats_path).is_empty());
    }
}
