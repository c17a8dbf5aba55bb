//! Interface boundary to the collision-avoidance simulator.
//!
//! The evaluator drives whatever sits behind [`Simulator`]; the bundled
//! [`OrcaSimulator`] is the default implementation. Handles are opaque
//! indices, valid only for the simulator instance that issued them.

pub mod orca;
pub mod vec2;

use crate::chromosome::AvoidanceParams;
use self::vec2::Vec2;

pub use self::orca::OrcaSimulator;

/// Opaque handle to an agent registered with a simulator instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentHandle(pub(crate) usize);

/// Opaque handle to an obstacle registered with a simulator instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObstacleHandle(pub(crate) usize);

/// Step-based 2D multi-agent collision-avoidance engine.
///
/// Callers must register all obstacles and call [`finalize_obstacles`]
/// exactly once before the first [`step`].
///
/// [`finalize_obstacles`]: Simulator::finalize_obstacles
/// [`step`]: Simulator::step
pub trait Simulator {
    fn add_agent(&mut self, position: Vec2) -> AgentHandle;

    /// Registers a polygonal obstacle from an ordered vertex list.
    fn add_obstacle(&mut self, vertices: &[Vec2]) -> ObstacleHandle;

    fn finalize_obstacles(&mut self);

    fn set_preferred_velocity(&mut self, agent: AgentHandle, velocity: Vec2);

    /// Advances every agent by one fixed time step, honoring avoidance and
    /// obstacle constraints.
    fn step(&mut self);

    fn agent_position(&self, agent: AgentHandle) -> Vec2;
}

/// Builds a fresh simulator per evaluation.
pub trait SimulatorFactory: Sync {
    type Sim: Simulator;

    fn create(&self, time_step: f64, params: &AvoidanceParams, radius: f64) -> Self::Sim;
}

/// Factory for the bundled ORCA-style simulator.
pub struct OrcaFactory;

impl SimulatorFactory for OrcaFactory {
    type Sim = OrcaSimulator;

    fn create(&self, time_step: f64, params: &AvoidanceParams, radius: f64) -> OrcaSimulator {
        OrcaSimulator::new(time_step, params, radius)
    }
}
