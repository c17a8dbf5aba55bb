//! Fixed-duration scenario evaluation: one simulation per chromosome,
//! scored by goal error, normalized travel time and collision count.

pub mod scenario;

use crate::chromosome::{AvoidanceParams, Chromosome};
use crate::evolution::{EvaluationError, FitnessEvaluator};
use crate::sim::vec2::Vec2;
use crate::sim::{AgentHandle, Simulator, SimulatorFactory};
use log::debug;
use self::scenario::{Scenario, ARENA_SIZE};

/// Fixed body radius of every simulated agent.
pub const AGENT_RADIUS: f64 = 0.1;

/// Per-axis absolute tolerance for deciding an agent has reached its goal.
pub const GOAL_TOLERANCE: f64 = 0.1;

/// Two agents closer than `2 * AGENT_RADIUS + COLLISION_BUFFER` count as
/// colliding.
pub const COLLISION_BUFFER: f64 = 1e-2;

const AGENT_COUNT: usize = 4;

/// Per-agent simulation bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentOutcome {
    pub reached: bool,
    /// Step at which the goal was first reached; the full iteration budget
    /// if it never was.
    pub reached_step: usize,
    /// Position at first arrival. Later re-entries are ignored.
    pub reached_position: Option<Vec2>,
}

/// Everything a single simulation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    pub agents: [AgentOutcome; AGENT_COUNT],
    pub final_positions: [Vec2; AGENT_COUNT],
    pub collisions: usize,
    /// Steps actually executed (the loop exits early once everyone arrived).
    pub steps: usize,
    pub breakdown: FitnessBreakdown,
}

/// Fitness terms, reported individually.
///
/// The sum is `mean_error + mean_duration_norm + collisions` with the raw
/// collision count; `mean_error_norm` and `collisions_norm` are computed and
/// reported but deliberately not part of the sum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitnessBreakdown {
    pub mean_error: f64,
    pub mean_error_norm: f64,
    pub mean_duration: f64,
    pub mean_duration_norm: f64,
    pub collisions_norm: f64,
    pub fitness: f64,
}

/// Runs one fixed-duration simulation per chromosome against an immutable
/// obstacle layout. Deterministic: no randomness anywhere in an evaluation.
pub struct ScenarioEvaluator<F: SimulatorFactory> {
    scenario: Scenario,
    time_step: f64,
    factory: F,
}

impl<F: SimulatorFactory> ScenarioEvaluator<F> {
    pub fn new(scenario: Scenario, time_step: f64, factory: F) -> Self {
        Self {
            scenario,
            time_step,
            factory,
        }
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn iteration_budget(&self) -> usize {
        (self.time_step * 100_000.0).floor() as usize
    }

    /// Runs the full simulation and returns the detailed outcome.
    pub fn run(&self, chromosome: &Chromosome) -> SimulationOutcome {
        let params = AvoidanceParams::from(chromosome);
        let mut sim = self.factory.create(self.time_step, &params, AGENT_RADIUS);

        let mut handles: Vec<AgentHandle> = Vec::with_capacity(AGENT_COUNT);
        for (start, _) in &self.scenario.agents {
            handles.push(sim.add_agent(*start));
        }
        for boundary in &self.scenario.boundaries {
            sim.add_obstacle(boundary);
        }
        for obstacle in &self.scenario.obstacles {
            sim.add_obstacle(obstacle);
        }
        sim.finalize_obstacles();

        // initial preferred velocities along the corner diagonals
        for (handle, (start, goal)) in handles.iter().zip(&self.scenario.agents) {
            sim.set_preferred_velocity(*handle, (*goal - *start) * (1.0 / ARENA_SIZE));
        }

        let budget = self.iteration_budget();
        let mut positions: [Vec2; AGENT_COUNT] = [Vec2::ZERO; AGENT_COUNT];
        for (slot, (start, _)) in positions.iter_mut().zip(&self.scenario.agents) {
            *slot = *start;
        }
        let mut agents = [AgentOutcome {
            reached: false,
            reached_step: budget,
            reached_position: None,
        }; AGENT_COUNT];
        let mut collisions = 0usize;
        let mut steps = 0usize;

        for step in 0..budget {
            if agents.iter().all(|a| a.reached) {
                break;
            }

            sim.step();
            steps += 1;
            for (slot, handle) in positions.iter_mut().zip(&handles) {
                *slot = quantize(sim.agent_position(*handle));
            }

            for a in 0..AGENT_COUNT {
                for b in (a + 1)..AGENT_COUNT {
                    if positions[a].distance(positions[b])
                        < 2.0 * AGENT_RADIUS + COLLISION_BUFFER
                    {
                        collisions += 1;
                    }
                }
            }

            for (i, handle) in handles.iter().enumerate() {
                let goal = self.scenario.agents[i].1;
                sim.set_preferred_velocity(*handle, goal - positions[i]);
            }

            for (i, agent) in agents.iter_mut().enumerate() {
                let goal = self.scenario.agents[i].1;
                if !agent.reached
                    && within_tolerance(positions[i].x, goal.x)
                    && within_tolerance(positions[i].y, goal.y)
                {
                    agent.reached = true;
                    agent.reached_step = step;
                    agent.reached_position = Some(positions[i]);
                }
            }
        }

        let breakdown = self.score(&agents, &positions, collisions, budget);
        debug!(
            "{}: fitness={:.4} (error={:.4}, duration_norm={:.4}, collisions={})",
            self.scenario.name,
            breakdown.fitness,
            breakdown.mean_error,
            breakdown.mean_duration_norm,
            collisions
        );

        SimulationOutcome {
            agents,
            final_positions: positions,
            collisions,
            steps,
            breakdown,
        }
    }

    fn score(
        &self,
        agents: &[AgentOutcome; AGENT_COUNT],
        final_positions: &[Vec2; AGENT_COUNT],
        collisions: usize,
        budget: usize,
    ) -> FitnessBreakdown {
        let mean_error = final_positions
            .iter()
            .zip(&self.scenario.agents)
            .map(|(position, (_, goal))| position.distance(*goal))
            .sum::<f64>()
            / AGENT_COUNT as f64;
        let diagonal = ARENA_SIZE * std::f64::consts::SQRT_2;
        let mean_error_norm = mean_error / diagonal;

        let mean_duration = agents
            .iter()
            .map(|a| a.reached_step as f64)
            .sum::<f64>()
            / AGENT_COUNT as f64;
        let mean_duration_norm = mean_duration / budget as f64;

        let pair_count = AGENT_COUNT * (AGENT_COUNT - 1) / 2;
        let collisions_norm = collisions as f64 / (pair_count * budget) as f64;

        // the raw collision count enters the sum; the normalized variants
        // are reported alongside it
        let fitness = mean_error + mean_duration_norm + collisions as f64;

        FitnessBreakdown {
            mean_error,
            mean_error_norm,
            mean_duration,
            mean_duration_norm,
            collisions_norm,
            fitness,
        }
    }
}

impl<F: SimulatorFactory> FitnessEvaluator for ScenarioEvaluator<F> {
    fn evaluate(&self, chromosome: &Chromosome) -> Result<f64, EvaluationError> {
        Ok(self.run(chromosome).breakdown.fitness)
    }
}

/// Positions are snapped to a millimeter-ish grid before every tolerance
/// and distance check, like the reference tooling recorded them.
fn quantize(position: Vec2) -> Vec2 {
    Vec2::new(round3(position.x), round3(position.y))
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn within_tolerance(a: f64, b: f64) -> bool {
    (a - b).abs() <= GOAL_TOLERANCE
}
