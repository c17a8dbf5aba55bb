/// Number of tunable simulator parameters under search.
pub const GENE_COUNT: usize = 5;

/// Ordered parameter vector fed to the avoidance simulator:
/// `(neighbor_dist, max_neighbors, time_horizon, time_horizon_obst, max_speed)`.
///
/// All genes are reals, including `max_neighbors`; the integer conversion
/// happens only when a simulator is instantiated (see [`AvoidanceParams`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chromosome(pub [f64; GENE_COUNT]);

impl Chromosome {
    pub fn genes(&self) -> &[f64; GENE_COUNT] {
        &self.0
    }

    pub fn neighbor_dist(&self) -> f64 {
        self.0[0]
    }

    pub fn max_neighbors(&self) -> f64 {
        self.0[1]
    }

    pub fn time_horizon(&self) -> f64 {
        self.0[2]
    }

    pub fn time_horizon_obst(&self) -> f64 {
        self.0[3]
    }

    pub fn max_speed(&self) -> f64 {
        self.0[4]
    }
}

/// Simulator-ready view of a chromosome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvoidanceParams {
    pub neighbor_dist: f64,
    /// Truncated toward zero from the real-valued gene.
    pub max_neighbors: usize,
    pub time_horizon: f64,
    pub time_horizon_obst: f64,
    pub max_speed: f64,
}

impl From<&Chromosome> for AvoidanceParams {
    fn from(chromosome: &Chromosome) -> Self {
        Self {
            neighbor_dist: chromosome.neighbor_dist(),
            max_neighbors: chromosome.max_neighbors().max(0.0) as usize,
            time_horizon: chromosome.time_horizon(),
            time_horizon_obst: chromosome.time_horizon_obst(),
            max_speed: chromosome.max_speed(),
        }
    }
}
