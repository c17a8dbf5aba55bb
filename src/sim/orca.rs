//! Bundled ORCA-style local collision-avoidance simulator.
//!
//! Each step, every agent builds a set of half-plane velocity constraints —
//! one per neighboring agent (the reciprocal construction) and one per
//! nearby obstacle segment — and picks the feasible velocity closest to its
//! preferred velocity by sequential 2D linear programming. When the agent
//! constraints are jointly infeasible the least-violating velocity is chosen
//! while obstacle constraints stay hard.
//!
//! The simulator is fully deterministic: symmetric head-on encounters are
//! broken by a fixed clockwise bias on preferred velocities rather than by
//! randomness.

use super::vec2::Vec2;
use super::{AgentHandle, ObstacleHandle, Simulator};
use crate::chromosome::AvoidanceParams;

const EPSILON: f64 = 1e-5;

/// Inflation applied to the body radius inside the avoidance math so that
/// grazing passes keep real clearance.
const SAFETY_MARGIN: f64 = 0.05;

/// Fixed clockwise bias (radians) applied to preferred velocities.
const TIE_BREAK_ANGLE: f64 = -0.01;

/// Directed half-plane constraint: feasible velocities lie to the left of
/// the line through `point` along `direction`.
#[derive(Debug, Clone, Copy)]
struct Line {
    point: Vec2,
    direction: Vec2,
}

#[derive(Debug, Clone)]
struct Agent {
    position: Vec2,
    velocity: Vec2,
    pref_velocity: Vec2,
}

pub struct OrcaSimulator {
    time_step: f64,
    neighbor_dist: f64,
    max_neighbors: usize,
    time_horizon: f64,
    time_horizon_obst: f64,
    radius: f64,
    max_speed: f64,
    agents: Vec<Agent>,
    segments: Vec<(Vec2, Vec2)>,
    obstacle_count: usize,
    finalized: bool,
}

impl OrcaSimulator {
    pub fn new(time_step: f64, params: &AvoidanceParams, radius: f64) -> Self {
        Self {
            time_step,
            neighbor_dist: params.neighbor_dist,
            max_neighbors: params.max_neighbors,
            time_horizon: params.time_horizon,
            time_horizon_obst: params.time_horizon_obst,
            radius,
            max_speed: params.max_speed,
            agents: Vec::new(),
            segments: Vec::new(),
            obstacle_count: 0,
            finalized: false,
        }
    }

    fn avoidance_radius(&self) -> f64 {
        self.radius + SAFETY_MARGIN
    }

    /// One conservative half-plane per obstacle segment in range: the
    /// velocity component toward the segment is capped so the agent cannot
    /// close the remaining gap within `time_horizon_obst`; once penetrating,
    /// the constraint demands separation within a single time step.
    fn obstacle_lines(&self, agent: &Agent) -> Vec<Line> {
        let mut lines = Vec::new();
        let radius = self.avoidance_radius();
        let range = self.time_horizon_obst * self.max_speed + radius;

        for &(a, b) in &self.segments {
            let closest = closest_point_on_segment(a, b, agent.position);
            let diff = agent.position - closest;
            let dist = diff.length();
            if dist > range {
                continue;
            }

            let normal = if dist > EPSILON {
                diff * (1.0 / dist)
            } else {
                // sitting on the segment: push along its normal
                let dir = (b - a).normalized();
                Vec2::new(-dir.y, dir.x)
            };
            let limit = if dist > radius {
                -(dist - radius) / self.time_horizon_obst
            } else {
                (radius - dist) / self.time_step
            };
            lines.push(Line {
                point: normal * limit,
                direction: Vec2::new(normal.y, -normal.x),
            });
        }
        lines
    }

    /// Nearest agents within sensing range, capped at `max_neighbors`.
    fn neighbors(&self, index: usize) -> Vec<usize> {
        let position = self.agents[index].position;
        let range_sq = self.neighbor_dist * self.neighbor_dist;
        let mut in_range: Vec<(f64, usize)> = self
            .agents
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != index)
            .filter_map(|(j, other)| {
                let dist_sq = (other.position - position).length_sq();
                (dist_sq < range_sq).then_some((dist_sq, j))
            })
            .collect();
        in_range.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        in_range.truncate(self.max_neighbors);
        in_range.into_iter().map(|(_, j)| j).collect()
    }

    /// Reciprocal half-plane per neighbor, following the RVO2 construction:
    /// project the relative velocity out of the truncated velocity obstacle
    /// (cut-off circle or nearer leg), each agent taking half the correction.
    fn agent_lines(&self, index: usize, lines: &mut Vec<Line>) {
        let agent = &self.agents[index];
        let inv_time_horizon = 1.0 / self.time_horizon;
        let combined_radius = 2.0 * self.avoidance_radius();
        let combined_radius_sq = combined_radius * combined_radius;

        for j in self.neighbors(index) {
            let other = &self.agents[j];
            let relative_position = other.position - agent.position;
            let relative_velocity = agent.velocity - other.velocity;
            let dist_sq = relative_position.length_sq();

            let direction;
            let u;
            if dist_sq > combined_radius_sq {
                let w = relative_velocity - relative_position * inv_time_horizon;
                let w_length_sq = w.length_sq();
                let dot1 = w.dot(relative_position);

                if dot1 < 0.0 && dot1 * dot1 > combined_radius_sq * w_length_sq {
                    // project on the cut-off circle
                    let w_length = w_length_sq.sqrt();
                    let unit_w = w * (1.0 / w_length);
                    direction = Vec2::new(unit_w.y, -unit_w.x);
                    u = unit_w * (combined_radius * inv_time_horizon - w_length);
                } else {
                    // project on the nearer leg
                    let leg = (dist_sq - combined_radius_sq).sqrt();
                    if relative_position.det(w) > 0.0 {
                        direction = Vec2::new(
                            relative_position.x * leg - relative_position.y * combined_radius,
                            relative_position.x * combined_radius + relative_position.y * leg,
                        ) * (1.0 / dist_sq);
                    } else {
                        direction = Vec2::new(
                            relative_position.x * leg + relative_position.y * combined_radius,
                            -relative_position.x * combined_radius + relative_position.y * leg,
                        ) * (-1.0 / dist_sq);
                    }
                    let dot2 = relative_velocity.dot(direction);
                    u = direction * dot2 - relative_velocity;
                }
            } else {
                // already overlapping: separate within one time step
                let inv_time_step = 1.0 / self.time_step;
                let w = relative_velocity - relative_position * inv_time_step;
                let w_length = w.length();
                let unit_w = if w_length > EPSILON {
                    w * (1.0 / w_length)
                } else if dist_sq > 0.0 {
                    -relative_position.normalized()
                } else {
                    Vec2::new(1.0, 0.0)
                };
                direction = Vec2::new(unit_w.y, -unit_w.x);
                u = unit_w * (combined_radius * inv_time_step - w_length);
            }

            lines.push(Line {
                point: agent.velocity + u * 0.5,
                direction,
            });
        }
    }

    fn compute_new_velocity(&self, index: usize) -> Vec2 {
        let mut lines = self.obstacle_lines(&self.agents[index]);
        let num_obstacle_lines = lines.len();
        self.agent_lines(index, &mut lines);

        let pref = self.agents[index].pref_velocity.rotated(TIE_BREAK_ANGLE);
        let mut new_velocity = Vec2::ZERO;
        let line_fail = linear_program2(&lines, self.max_speed, pref, false, &mut new_velocity);
        if line_fail < lines.len() {
            linear_program3(
                &lines,
                num_obstacle_lines,
                line_fail,
                self.max_speed,
                &mut new_velocity,
            );
        }
        new_velocity
    }
}

impl Simulator for OrcaSimulator {
    fn add_agent(&mut self, position: Vec2) -> AgentHandle {
        self.agents.push(Agent {
            position,
            velocity: Vec2::ZERO,
            pref_velocity: Vec2::ZERO,
        });
        AgentHandle(self.agents.len() - 1)
    }

    fn add_obstacle(&mut self, vertices: &[Vec2]) -> ObstacleHandle {
        assert!(
            !self.finalized,
            "obstacles cannot be added after finalize_obstacles"
        );
        assert!(vertices.len() >= 2, "an obstacle needs at least two vertices");

        if vertices.len() == 2 {
            self.segments.push((vertices[0], vertices[1]));
        } else {
            for i in 0..vertices.len() {
                self.segments
                    .push((vertices[i], vertices[(i + 1) % vertices.len()]));
            }
        }
        let handle = ObstacleHandle(self.obstacle_count);
        self.obstacle_count += 1;
        handle
    }

    fn finalize_obstacles(&mut self) {
        assert!(!self.finalized, "finalize_obstacles must be called once");
        self.finalized = true;
    }

    fn set_preferred_velocity(&mut self, agent: AgentHandle, velocity: Vec2) {
        self.agents[agent.0].pref_velocity = velocity;
    }

    fn step(&mut self) {
        assert!(
            self.finalized || self.segments.is_empty(),
            "finalize_obstacles must be called before stepping"
        );
        let new_velocities: Vec<Vec2> = (0..self.agents.len())
            .map(|i| self.compute_new_velocity(i))
            .collect();
        for (agent, velocity) in self.agents.iter_mut().zip(new_velocities) {
            agent.velocity = velocity;
            agent.position += velocity * self.time_step;
        }
    }

    fn agent_position(&self, agent: AgentHandle) -> Vec2 {
        self.agents[agent.0].position
    }
}

fn closest_point_on_segment(a: Vec2, b: Vec2, point: Vec2) -> Vec2 {
    let ab = b - a;
    let length_sq = ab.length_sq();
    if length_sq <= EPSILON * EPSILON {
        return a;
    }
    let t = ((point - a).dot(ab) / length_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Solves a 1D program on constraint line `line_no`, subject to the circle
/// of the given radius and all lines before `line_no`.
fn linear_program1(
    lines: &[Line],
    line_no: usize,
    radius: f64,
    opt_velocity: Vec2,
    direction_opt: bool,
    result: &mut Vec2,
) -> bool {
    let dot_product = lines[line_no].point.dot(lines[line_no].direction);
    let discriminant =
        dot_product * dot_product + radius * radius - lines[line_no].point.length_sq();
    if discriminant < 0.0 {
        // the maximum speed circle invalidates this line entirely
        return false;
    }

    let sqrt_discriminant = discriminant.sqrt();
    let mut t_left = -dot_product - sqrt_discriminant;
    let mut t_right = -dot_product + sqrt_discriminant;

    for i in 0..line_no {
        let denominator = lines[line_no].direction.det(lines[i].direction);
        let numerator = lines[i]
            .direction
            .det(lines[line_no].point - lines[i].point);

        if denominator.abs() <= EPSILON {
            // lines are (almost) parallel
            if numerator < 0.0 {
                return false;
            }
            continue;
        }

        let t = numerator / denominator;
        if denominator >= 0.0 {
            t_right = t_right.min(t);
        } else {
            t_left = t_left.max(t);
        }
        if t_left > t_right {
            return false;
        }
    }

    if direction_opt {
        if opt_velocity.dot(lines[line_no].direction) > 0.0 {
            *result = lines[line_no].point + lines[line_no].direction * t_right;
        } else {
            *result = lines[line_no].point + lines[line_no].direction * t_left;
        }
    } else {
        let t = lines[line_no]
            .direction
            .dot(opt_velocity - lines[line_no].point);
        *result = lines[line_no].point + lines[line_no].direction * t.clamp(t_left, t_right);
    }
    true
}

/// Sequentially satisfies every half-plane within the maximum-speed circle.
/// Returns the number of lines processed, or the index of the first
/// infeasible line.
fn linear_program2(
    lines: &[Line],
    radius: f64,
    opt_velocity: Vec2,
    direction_opt: bool,
    result: &mut Vec2,
) -> usize {
    if direction_opt {
        // opt_velocity is a unit direction in this mode
        *result = opt_velocity * radius;
    } else if opt_velocity.length_sq() > radius * radius {
        *result = opt_velocity.normalized() * radius;
    } else {
        *result = opt_velocity;
    }

    for i in 0..lines.len() {
        if lines[i].direction.det(lines[i].point - *result) > 0.0 {
            let temp_result = *result;
            if !linear_program1(lines, i, radius, opt_velocity, direction_opt, result) {
                *result = temp_result;
                return i;
            }
        }
    }
    lines.len()
}

/// Infeasibility fallback: minimizes the worst violation over the agent
/// constraints while keeping the obstacle constraints hard.
fn linear_program3(
    lines: &[Line],
    num_obstacle_lines: usize,
    begin_line: usize,
    radius: f64,
    result: &mut Vec2,
) {
    let mut distance = 0.0;

    for i in begin_line..lines.len() {
        if lines[i].direction.det(lines[i].point - *result) > distance {
            let mut proj_lines: Vec<Line> = lines[..num_obstacle_lines].to_vec();

            for j in num_obstacle_lines..i {
                let denominator = lines[i].direction.det(lines[j].direction);
                let point;
                if denominator.abs() <= EPSILON {
                    if lines[i].direction.dot(lines[j].direction) > 0.0 {
                        continue;
                    }
                    point = (lines[i].point + lines[j].point) * 0.5;
                } else {
                    point = lines[i].point
                        + lines[i].direction
                            * (lines[j].direction.det(lines[i].point - lines[j].point)
                                / denominator);
                }
                let direction = (lines[j].direction - lines[i].direction).normalized();
                proj_lines.push(Line { point, direction });
            }

            let temp_result = *result;
            if linear_program2(
                &proj_lines,
                radius,
                Vec2::new(-lines[i].direction.y, lines[i].direction.x),
                true,
                result,
            ) < proj_lines.len()
            {
                *result = temp_result;
            }
            distance = lines[i].direction.det(lines[i].point - *result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(
        neighbor_dist: f64,
        max_neighbors: usize,
        time_horizon: f64,
        time_horizon_obst: f64,
        max_speed: f64,
    ) -> AvoidanceParams {
        AvoidanceParams {
            neighbor_dist,
            max_neighbors,
            time_horizon,
            time_horizon_obst,
            max_speed,
        }
    }

    fn steer(sim: &mut OrcaSimulator, agents: &[(AgentHandle, Vec2)]) {
        for &(handle, goal) in agents {
            let position = sim.agent_position(handle);
            sim.set_preferred_velocity(handle, goal - position);
        }
    }

    #[test]
    fn test_single_agent_reaches_goal() {
        let mut sim = OrcaSimulator::new(0.1, &params(5.0, 2, 2.0, 2.0, 1.0), 0.1);
        let agent = sim.add_agent(Vec2::ZERO);
        sim.finalize_obstacles();
        let goal = Vec2::new(3.0, 4.0);

        for _ in 0..100 {
            steer(&mut sim, &[(agent, goal)]);
            sim.step();
        }
        assert!(sim.agent_position(agent).distance(goal) < 0.05);
    }

    #[test]
    fn test_speed_is_clamped() {
        let mut sim = OrcaSimulator::new(0.1, &params(5.0, 2, 2.0, 2.0, 1.0), 0.1);
        let agent = sim.add_agent(Vec2::ZERO);
        sim.finalize_obstacles();
        sim.set_preferred_velocity(agent, Vec2::new(100.0, 0.0));
        sim.step();

        // one step at most max_speed * time_step away from the start
        assert!(sim.agent_position(agent).length() <= 1.0 * 0.1 + 1e-9);
        assert!(sim.agent_position(agent).length() >= 0.09);
    }

    #[test]
    fn test_head_on_pair_swaps_without_contact() {
        let mut sim = OrcaSimulator::new(0.1, &params(5.0, 2, 2.0, 2.0, 1.0), 0.1);
        let a = sim.add_agent(Vec2::new(0.0, 0.0));
        let b = sim.add_agent(Vec2::new(5.0, 0.0));
        sim.finalize_obstacles();
        let goal_a = Vec2::new(5.0, 0.0);
        let goal_b = Vec2::new(0.0, 0.0);

        let mut min_distance = f64::INFINITY;
        for _ in 0..200 {
            steer(&mut sim, &[(a, goal_a), (b, goal_b)]);
            sim.step();
            let d = sim.agent_position(a).distance(sim.agent_position(b));
            min_distance = min_distance.min(d);
        }

        assert!(
            sim.agent_position(a).distance(goal_a) < 0.2,
            "agent a stalled at {:?}",
            sim.agent_position(a)
        );
        assert!(
            sim.agent_position(b).distance(goal_b) < 0.2,
            "agent b stalled at {:?}",
            sim.agent_position(b)
        );
        assert!(
            min_distance > 0.21,
            "agents passed too close: {min_distance}"
        );
    }

    #[test]
    fn test_agent_held_off_obstacle() {
        let mut sim = OrcaSimulator::new(0.1, &params(5.0, 2, 2.0, 2.0, 1.0), 0.1);
        let agent = sim.add_agent(Vec2::ZERO);
        sim.add_obstacle(&[Vec2::new(-5.0, 1.0), Vec2::new(5.0, 1.0)]);
        sim.finalize_obstacles();

        let mut max_y: f64 = 0.0;
        for _ in 0..100 {
            sim.set_preferred_velocity(agent, Vec2::new(0.0, 1.0));
            sim.step();
            max_y = max_y.max(sim.agent_position(agent).y);
        }

        // stands off by the inflated radius, approaching asymptotically
        assert!(max_y < 0.86, "agent penetrated the wall standoff: {max_y}");
        assert!(max_y > 0.7, "agent never approached the wall: {max_y}");
        assert!(sim.agent_position(agent).x.abs() < 0.5);
    }

    #[test]
    fn test_step_is_deterministic() {
        let run = || {
            let mut sim = OrcaSimulator::new(0.1, &params(5.0, 3, 2.0, 2.0, 1.5), 0.1);
            let a = sim.add_agent(Vec2::new(0.0, 0.0));
            let b = sim.add_agent(Vec2::new(4.0, 0.0));
            let c = sim.add_agent(Vec2::new(2.0, 3.0));
            sim.finalize_obstacles();
            for _ in 0..120 {
                steer(
                    &mut sim,
                    &[
                        (a, Vec2::new(4.0, 0.0)),
                        (b, Vec2::new(0.0, 0.0)),
                        (c, Vec2::new(2.0, -3.0)),
                    ],
                );
                sim.step();
            }
            [
                sim.agent_position(a),
                sim.agent_position(b),
                sim.agent_position(c),
            ]
        };
        assert_eq!(run(), run());
    }

    #[test]
    #[should_panic(expected = "finalize_obstacles")]
    fn test_step_requires_finalized_obstacles() {
        let mut sim = OrcaSimulator::new(0.1, &params(5.0, 2, 2.0, 2.0, 1.0), 0.1);
        sim.add_agent(Vec2::ZERO);
        sim.add_obstacle(&[Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0)]);
        sim.step();
    }
}
