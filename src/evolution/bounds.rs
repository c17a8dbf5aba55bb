use crate::chromosome::{Chromosome, GENE_COUNT};
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoundsError {
    #[error(
        "bound vectors must have {GENE_COUNT} entries each, got {lower} lower and {upper} upper"
    )]
    ArityMismatch { lower: usize, upper: usize },
    #[error("lower bound {lower} exceeds upper bound {upper} for gene {index}")]
    InvertedBound {
        index: usize,
        lower: f64,
        upper: f64,
    },
}

/// Box constraints for the five tunable genes.
///
/// Malformed bounds are a configuration error and are rejected here, once,
/// before any run starts — never silently repaired or reordered.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    lower: [f64; GENE_COUNT],
    upper: [f64; GENE_COUNT],
}

impl Bounds {
    pub fn new(lower: &[f64], upper: &[f64]) -> Result<Self, BoundsError> {
        if lower.len() != GENE_COUNT || upper.len() != GENE_COUNT {
            return Err(BoundsError::ArityMismatch {
                lower: lower.len(),
                upper: upper.len(),
            });
        }
        for (index, (&lo, &hi)) in lower.iter().zip(upper).enumerate() {
            if lo > hi {
                return Err(BoundsError::InvertedBound {
                    index,
                    lower: lo,
                    upper: hi,
                });
            }
        }

        let mut bounds = Self {
            lower: [0.0; GENE_COUNT],
            upper: [0.0; GENE_COUNT],
        };
        bounds.lower.copy_from_slice(lower);
        bounds.upper.copy_from_slice(upper);
        Ok(bounds)
    }

    pub fn lower(&self) -> &[f64; GENE_COUNT] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64; GENE_COUNT] {
        &self.upper
    }

    /// Componentwise clamp into the box. Idempotent.
    pub fn clamp(&self, chromosome: &Chromosome) -> Chromosome {
        let mut genes = *chromosome.genes();
        for (gene, (&lo, &hi)) in genes.iter_mut().zip(self.lower.iter().zip(&self.upper)) {
            *gene = gene.clamp(lo, hi);
        }
        Chromosome(genes)
    }

    /// Draws each gene independently and uniformly within its bound.
    /// Stateless given the rng.
    pub fn random<R: Rng>(&self, rng: &mut R) -> Chromosome {
        let mut genes = [0.0; GENE_COUNT];
        for (gene, (&lo, &hi)) in genes.iter_mut().zip(self.lower.iter().zip(&self.upper)) {
            *gene = rng.random_range(lo..=hi);
        }
        Chromosome(genes)
    }
}
